//! Show command - print a cached response state

use super::{open_cache, parse_fingerprint};
use crate::cli::args::{OutputFormat, ShowArgs};
use crate::config::Config;
use crate::error::{IhppError, IhppResult};
use crate::request::Fingerprint;
use crate::response::{ResponsePhase, ResponseState};
use crate::ui::{self, UiContext};

/// Execute the show command
pub async fn execute(args: ShowArgs, config: &Config) -> IhppResult<()> {
    let ctx = UiContext::detect();
    let key = parse_fingerprint(&args.fingerprint)?;
    let cache = open_cache(config).await?;

    let state = cache.get_state(&key).await;
    if state.is_empty() {
        return Err(IhppError::ResponseNotFound(key.to_string()));
    }

    match args.format {
        OutputFormat::Table => {
            ui::key_value(&ctx, "Fingerprint", key.as_str());
            print_table(&ctx, &state);
        }
        OutputFormat::Json => print_json(&key, &state)?,
    }
    Ok(())
}

pub(crate) fn print_json(key: &Fingerprint, state: &ResponseState) -> IhppResult<()> {
    #[derive(serde::Serialize)]
    struct StateJson<'a> {
        fingerprint: &'a Fingerprint,
        #[serde(flatten)]
        state: &'a ResponseState,
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&StateJson {
            fingerprint: key,
            state
        })?
    );
    Ok(())
}

pub(crate) fn print_table(ctx: &UiContext, state: &ResponseState) {
    if let Some(ref request) = state.request {
        ui::key_value(ctx, "Request", &format!("{} {}", request.method, request.url));
    }

    match state.phase() {
        ResponsePhase::Idle => ui::key_value(ctx, "State", "idle"),
        ResponsePhase::Loading => ui::key_value_status(ctx, "State", "loading", false),
        ResponsePhase::Failed(message) => ui::step_error_detail(ctx, "Request failed", message),
        ResponsePhase::Complete(data) => {
            let status = format!("{} {}", data.status, data.status_text);
            ui::key_value_status(ctx, "Status", &status, (200..400).contains(&data.status));
            ui::key_value(ctx, "Duration", &format!("{} ms", data.duration));

            if !data.headers.is_empty() {
                ui::section(ctx, "Headers");
                for (name, values) in &data.headers {
                    ui::key_value(ctx, name, &values.join(", "));
                }
            }
            if !data.body.is_empty() {
                ui::section(ctx, "Body");
                println!("{}", data.body);
            }
        }
    }
}
