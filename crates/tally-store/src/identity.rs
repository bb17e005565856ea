//! Durable identity records: id → (display name, embedding).

use crate::StoreError;
use rusqlite::{params, OptionalExtension};
use tally_core::{Embedding, Identity};
use tokio_rusqlite::Connection;

/// SQLite-backed identity store. Cheap to clone; clones share the
/// underlying connection.
#[derive(Clone)]
pub struct IdentityStore {
    conn: Connection,
}

impl IdentityStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Replace-or-insert the whole record. Idempotent on id: registering
    /// the same identity again overwrites name and embedding wholesale.
    pub async fn upsert(&self, identity: &Identity) -> Result<(), StoreError> {
        let id = identity.id.clone();
        let display_name = identity.display_name.clone();
        let embedding = serde_json::to_string(&identity.embedding)
            .map_err(|e| StoreError::Corrupt(format!("embedding for {id}: {e}")))?;

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO identities (id, display_name, embedding)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(id) DO UPDATE SET
                         display_name = excluded.display_name,
                         embedding = excluded.embedding",
                    params![id, display_name, embedding],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// All identities in insertion (rowid) order.
    ///
    /// The order is stable within a call — the matcher's first-wins
    /// tie-break depends on that.
    pub async fn get_all(&self) -> Result<Vec<Identity>, StoreError> {
        let rows: Vec<(String, String, String)> = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, display_name, embedding FROM identities ORDER BY rowid",
                )?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter()
            .map(|(id, display_name, raw)| {
                let embedding: Embedding = serde_json::from_str(&raw)
                    .map_err(|e| StoreError::Corrupt(format!("embedding for {id}: {e}")))?;
                Ok(Identity { id, display_name, embedding })
            })
            .collect()
    }

    pub async fn get_name(&self, id: &str) -> Result<Option<String>, StoreError> {
        let id = id.to_string();
        let name = self
            .conn
            .call(move |conn| {
                let name = conn
                    .query_row(
                        "SELECT display_name FROM identities WHERE id = ?1",
                        params![id],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(name)
            })
            .await?;
        Ok(name)
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .call(|conn| {
                let count =
                    conn.query_row("SELECT COUNT(*) FROM identities", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn identity(id: &str, name: &str, values: Vec<f32>) -> Identity {
        Identity {
            id: id.to_string(),
            display_name: name.to_string(),
            embedding: Embedding::new(values),
        }
    }

    async fn store() -> IdentityStore {
        IdentityStore::new(db::open_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_upsert_and_get_all() {
        let store = store().await;
        store.upsert(&identity("e1", "Alice", vec![1.0, 0.0])).await.unwrap();
        store.upsert(&identity("e2", "Bob", vec![0.0, 1.0])).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "e1");
        assert_eq!(all[1].id, "e2");
        assert_eq!(all[0].embedding.values, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_upsert_idempotent() {
        let store = store().await;
        let rec = identity("e1", "Alice", vec![0.5, 0.5]);
        store.upsert(&rec).await.unwrap();
        store.upsert(&rec).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].display_name, "Alice");
        assert_eq!(all[0].embedding.values, vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn test_upsert_replaces_whole_record() {
        let store = store().await;
        store.upsert(&identity("e1", "Alice", vec![1.0, 0.0])).await.unwrap();
        store.upsert(&identity("e1", "Alice B.", vec![0.0, 1.0])).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].display_name, "Alice B.");
        assert_eq!(all[0].embedding.values, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_get_name() {
        let store = store().await;
        store.upsert(&identity("e1", "Alice", vec![1.0])).await.unwrap();
        assert_eq!(store.get_name("e1").await.unwrap().as_deref(), Some("Alice"));
        assert_eq!(store.get_name("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_count() {
        let store = store().await;
        assert_eq!(store.count().await.unwrap(), 0);
        store.upsert(&identity("e1", "Alice", vec![1.0])).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
