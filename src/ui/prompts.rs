//! Confirmation prompt with a non-interactive fallback

use super::context::UiContext;
use crate::error::{IhppError, IhppResult};

/// Ask a yes/no question
///
/// `--yes` approves; without a terminal the default is returned unasked.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> IhppResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(default);
    }

    let message = message.to_string();
    let answer = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message).initial_value(default).interact()
    })
    .await?;

    answer.map_err(|e| IhppError::User(format!("Prompt failed: {}", e)))
}
