//! Terminal front-end for the confirmation gate.
//!
//! Polls the [`PromptGate`] for new requests and asks on stderr, reading
//! the answer from stdin. Anything other than `y`/`yes` dismisses, and so
//! does end of input.

use deskpilot_action::{PendingAction, PromptGate};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use uuid::Uuid;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Answer confirmation requests interactively until the task is aborted.
pub async fn serve_terminal_prompts(gate: Arc<PromptGate>) {
    let mut input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stderr();
    let mut asked: HashSet<Uuid> = HashSet::new();
    let mut ticker = tokio::time::interval(POLL_INTERVAL);

    loop {
        ticker.tick().await;
        for request in gate.pending() {
            if !asked.insert(request.id) {
                continue;
            }
            let approved = match ask(&mut input, &mut output, &question_for(&request)).await {
                Ok(approved) => approved,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read confirmation answer");
                    false
                }
            };

            let answered = if approved {
                gate.approve(request.id)
            } else {
                gate.dismiss(request.id)
            };
            if !answered {
                tracing::warn!(request_id = %request.id, "Confirmation answered after it expired");
            }
        }
    }
}

fn question_for(request: &PendingAction) -> String {
    format!(
        "[{}] {}\nAllow? [y/N] ",
        request.action_type, request.description
    )
}

async fn ask<R, W>(input: &mut R, output: &mut W, question: &str) -> std::io::Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output.write_all(question.as_bytes()).await?;
    output.flush().await?;

    let mut line = String::new();
    input.read_line(&mut line).await?;
    Ok(is_affirmative(&line))
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
