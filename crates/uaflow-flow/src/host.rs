//! Newline-delimited JSON transport between the flow and a node.

use crate::node::FlowNode;
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};
use uaflow_core::FlowMessage;

/// Runs `node` on stdin and stdout until stdin closes.
pub async fn run_stdio<N: FlowNode>(node: &mut N) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    run(node, stdin, stdout).await
}

/// Feeds each input line to `node` and writes each outbound message as one
/// line. Malformed lines are skipped.
pub async fn run<N, R, W>(node: &mut N, reader: R, mut writer: W) -> Result<()>
where
    N: FlowNode,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let result = pump(node, reader, &mut writer).await;
    node.on_close().await;
    result
}

async fn pump<N, R, W>(node: &mut N, reader: R, writer: &mut W) -> Result<()>
where
    N: FlowNode,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match node.on_start().await {
        Ok(messages) => emit(writer, &messages).await?,
        Err(e) => warn!("Node start-up failed: {:#}", e),
    }

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let message: FlowMessage = match serde_json::from_str(&line) {
            Ok(m) => m,
            Err(e) => {
                warn!("Skipping malformed message: {}", e);
                continue;
            }
        };

        let outbound = node.on_input(message).await;
        emit(writer, &outbound).await?;
    }

    debug!("Input closed");
    Ok(())
}

async fn emit<W: AsyncWrite + Unpin>(writer: &mut W, messages: &[FlowMessage]) -> Result<()> {
    for message in messages {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
    }
    writer.flush().await?;
    Ok(())
}
