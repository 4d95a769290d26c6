//! # App Server
//!
//! Process entry point for SnapChef. Loads configuration, opens the semantic
//! cache once, migrates any legacy layout, then answers status-panel
//! requests as line-delimited JSON on stdin/stdout.
//!
//! | Method            | Params                     | Result                     |
//! |-------------------|----------------------------|----------------------------|
//! | `cache/stats`     |                            | cache statistics           |
//! | `cache/clear`     |                            | `{"cleared": bool}`        |
//! | `cache/lookup`    | `{food_name, kind}`        | `{"document": doc\|null}`  |
//! | `cache/documents` |                            | `{"documents": [doc, ..]}` |

pub mod cache_handler;
pub mod config;
pub mod protocol;

pub use cache_handler::CacheHandler;
pub use config::AppConfig;
pub use protocol::{Request, Response};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

/// Answer requests from `reader` until it closes, one response line each.
pub async fn serve<R, W>(handler: &CacheHandler, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("reading request")? {
        if line.trim().is_empty() {
            continue;
        }

        let response = handler.handle_line(&line).await;
        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        writer
            .write_all(out.as_bytes())
            .await
            .context("writing response")?;
        writer.flush().await?;
    }

    info!("Input closed, shutting down");
    Ok(())
}
