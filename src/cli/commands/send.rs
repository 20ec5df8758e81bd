//! Send command - relay a request and cache its response

use super::{build_request, open_cache_lenient, show};
use crate::cli::args::{OutputFormat, SendArgs};
use crate::config::Config;
use crate::error::{IhppError, IhppResult};
use crate::response::ResponsePhase;
use crate::runner::{HttpExecutor, RequestRunner};
use crate::ui::{self, TaskSpinner, UiContext};
use std::sync::Arc;

/// Execute the send command
pub async fn execute(args: SendArgs, config: &Config) -> IhppResult<()> {
    let ctx = UiContext::detect();
    // A broken store must not keep the request from being sent
    let cache = open_cache_lenient(config).await;
    let executor = HttpExecutor::new(&config.server.api_url, config.server.request_timeout());
    let runner = RequestRunner::new(Arc::clone(&cache), Arc::new(executor));

    let mut request = build_request(&args.request);
    let mut spinner = TaskSpinner::new(&ctx);
    if args.format == OutputFormat::Table {
        spinner.start(&format!("Sending {} {}", request.method, request.url));
    }

    let key = runner.send(&mut request).await;
    // Make sure the outcome is durable before the process exits
    cache.flush().await;
    let state = cache.get_state(&key).await;

    if args.format == OutputFormat::Json {
        show::print_json(&key, &state)?;
    } else {
        match state.phase() {
            ResponsePhase::Complete(data) => {
                spinner.stop(&format!("{} {} ({} ms)", data.status, data.status_text, data.duration))
            }
            ResponsePhase::Failed(message) => spinner.stop_error(message),
            _ => spinner.stop_error("No response recorded"),
        }
        ui::key_value(&ctx, "Fingerprint", key.as_str());
        show::print_table(&ctx, &state);
    }

    match state.phase() {
        ResponsePhase::Failed(message) => Err(IhppError::Execute(message.to_string())),
        _ => Ok(()),
    }
}
