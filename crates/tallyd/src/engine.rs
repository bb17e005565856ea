use tally_core::Embedding;
use tally_model::{aggregate, EmbedError, Embedder};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Embed(#[from] EmbedError),
    #[error("embedder thread exited")]
    ChannelClosed,
}

/// Messages sent from request handlers to the embedder thread.
enum EngineRequest {
    Embed {
        image: Vec<u8>,
        reply: oneshot::Sender<Result<Option<Embedding>, EmbedError>>,
    },
    Aggregate {
        images: Vec<Vec<u8>>,
        reply: oneshot::Sender<Option<Embedding>>,
    },
}

/// Clone-safe handle to the embedder thread.
#[derive(Clone)]
pub struct EmbedderHandle {
    tx: mpsc::Sender<EngineRequest>,
    dimension: usize,
}

impl EmbedderHandle {
    /// Output dimension of the model behind this handle.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Extract an embedding from a single frame. `Ok(None)` = no face.
    pub async fn embed(&self, image: Vec<u8>) -> Result<Option<Embedding>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Embed {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        let result = reply_rx.await.map_err(|_| EngineError::ChannelClosed)?;
        Ok(result?)
    }

    /// Extract one aggregated embedding from a frame sequence, discarding
    /// unusable frames. `None` when no frame yields a usable embedding.
    pub async fn embed_aggregate(
        &self,
        images: Vec<Vec<u8>>,
    ) -> Result<Option<Embedding>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Aggregate {
                images,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Spawn the embedder on a dedicated OS thread.
///
/// The thread owns the model session for its whole life; handlers talk to
/// it through the returned handle. Model state is read-only after load, so
/// the single consumer loop is the only synchronization needed.
pub fn spawn_embedder<E>(mut embedder: E) -> EmbedderHandle
where
    E: Embedder + Send + 'static,
{
    let dimension = embedder.dimension();
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("tally-embedder".into())
        .spawn(move || {
            tracing::info!("embedder thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Embed { image, reply } => {
                        let _ = reply.send(embedder.embed(&image));
                    }
                    EngineRequest::Aggregate { images, reply } => {
                        let _ = reply.send(aggregate(&mut embedder, &images));
                    }
                }
            }
            tracing::info!("embedder thread exiting");
        })
        .expect("failed to spawn embedder thread");

    EmbedderHandle { tx, dimension }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubEmbedder;

    impl Embedder for StubEmbedder {
        fn embed(&mut self, image: &[u8]) -> Result<Option<Embedding>, EmbedError> {
            match image.first() {
                Some(1) => Ok(Some(Embedding::new(vec![1.0, 0.0]))),
                Some(2) => Ok(Some(Embedding::new(vec![0.0, 1.0]))),
                Some(9) => Err(EmbedError::InvalidImage("stub".into())),
                _ => Ok(None),
            }
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn test_embed_through_handle() {
        let handle = spawn_embedder(StubEmbedder);
        assert_eq!(handle.dimension(), 2);

        let emb = handle.embed(vec![1u8]).await.unwrap().unwrap();
        assert_eq!(emb.values, vec![1.0, 0.0]);
        assert!(handle.embed(vec![0u8]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_embed_propagates_invalid_image() {
        let handle = spawn_embedder(StubEmbedder);
        let err = handle.embed(vec![9u8]).await.unwrap_err();
        assert!(matches!(err, EngineError::Embed(EmbedError::InvalidImage(_))));
    }

    #[tokio::test]
    async fn test_aggregate_through_handle() {
        let handle = spawn_embedder(StubEmbedder);
        let emb = handle
            .embed_aggregate(vec![vec![1u8], vec![0u8], vec![2u8]])
            .await
            .unwrap()
            .unwrap();
        let expected = Embedding::mean_normalized(&[
            Embedding::new(vec![1.0, 0.0]),
            Embedding::new(vec![0.0, 1.0]),
        ])
        .unwrap();
        assert_eq!(emb, expected);
    }
}
