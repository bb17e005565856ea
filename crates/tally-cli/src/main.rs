use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Thin D-Bus client for the tallyd attendance daemon.
#[zbus::proxy(
    interface = "org.tally.Attendance1",
    default_service = "org.tally.Attendance1",
    default_path = "/org/tally/Attendance1"
)]
trait Attendance {
    async fn register(
        &self,
        identity_id: &str,
        display_name: &str,
        frames: Vec<Vec<u8>>,
    ) -> zbus::Result<String>;
    async fn check(&self, frame: Vec<u8>) -> zbus::Result<String>;
    async fn list_identities(&self) -> zbus::Result<String>;
    async fn attendance_log(&self, limit: u32) -> zbus::Result<String>;
    async fn status(&self) -> zbus::Result<String>;
}

#[derive(Parser)]
#[command(name = "tally", about = "Tally attendance CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register an identity from one or more captured frames
    Register {
        /// Identity id (externally assigned, stable)
        id: String,
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Image files, in capture order
        #[arg(required = true)]
        frames: Vec<PathBuf>,
    },
    /// Recognize the face in a frame and toggle attendance
    Check {
        /// Image file
        frame: PathBuf,
    },
    /// List registered identities
    Identities,
    /// Show recent attendance events, newest first
    Log {
        /// Maximum number of events
        #[arg(short, long, default_value_t = 100)]
        limit: u32,
    },
    /// Show daemon status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let conn = zbus::Connection::session()
        .await
        .context("failed to connect to the session bus — is tallyd running?")?;
    let proxy = AttendanceProxy::new(&conn).await?;

    let reply = match cli.command {
        Commands::Register { id, name, frames } => {
            let mut blobs = Vec::with_capacity(frames.len());
            for path in &frames {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("failed to read frame {}", path.display()))?;
                blobs.push(bytes);
            }
            proxy.register(&id, &name, blobs).await?
        }
        Commands::Check { frame } => {
            let bytes = std::fs::read(&frame)
                .with_context(|| format!("failed to read frame {}", frame.display()))?;
            proxy.check(bytes).await?
        }
        Commands::Identities => proxy.list_identities().await?,
        Commands::Log { limit } => proxy.attendance_log(limit).await?,
        Commands::Status => proxy.status().await?,
    };

    println!("{}", pretty(&reply));
    Ok(())
}

/// Re-indent a JSON reply for the terminal; pass through anything else.
fn pretty(reply: &str) -> String {
    serde_json::from_str::<serde_json::Value>(reply)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or_else(|_| reply.to_string())
}
