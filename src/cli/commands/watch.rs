//! Watch command - follow a live topic until Ctrl-C

use crate::cli::args::WatchArgs;
use crate::config::Config;
use crate::error::{IhppError, IhppResult};
use crate::live::{
    typed, Multiplexer, MultiplexerOptions, ReadyState, SessionEvent, Subscription, WsTransport,
    SESSIONS_TOPIC,
};
use crate::ui::{self, UiContext};
use console::style;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Execute the watch command
pub async fn execute(args: WatchArgs, config: &Config) -> IhppResult<()> {
    let ctx = UiContext::detect();
    let url = WsTransport::url_for(&config.server.api_url, &config.server.ws_path)?;
    let options = MultiplexerOptions {
        reconnect_delay: config.live.reconnect_delay(),
        ping_interval: config.live.ping_interval(),
    };

    let mux = Multiplexer::connect(Arc::new(WsTransport::new(url.as_str())), options);
    let _subscription = if args.topic == SESSIONS_TOPIC && !args.raw {
        Subscription::new(&mux, &args.topic, typed(print_session_event))
    } else {
        let topic = args.topic.clone();
        Subscription::new(&mux, &args.topic, move |payload: &Value| {
            print_raw(&topic, payload)
        })
    };

    ui::step_info(&ctx, &format!("Watching '{}' on {}", args.topic, url));
    ui::remark(&ctx, "Press Ctrl-C to stop");

    let mut ready = mux.watch_ready();
    let mut last = *ready.borrow_and_update();
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|e| IhppError::io("waiting for Ctrl-C", e))?;
                debug!("Interrupted, stopping watch");
                break;
            }
            changed = ready.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *ready.borrow_and_update();
                report_transition(&ctx, last, state);
                last = state;
            }
        }
    }

    Ok(())
}

fn report_transition(ctx: &UiContext, previous: ReadyState, current: ReadyState) {
    match (previous, current) {
        (_, ReadyState::Open) => ui::step_ok(ctx, "Connected"),
        (ReadyState::Open, ReadyState::Closed) => ui::step_warn(ctx, "Connection lost, reconnecting"),
        _ => debug!("Live connection {} -> {}", previous, current),
    }
}

fn print_session_event(event: SessionEvent) {
    match event {
        SessionEvent::NewSession { session } => println!(
            "{} {} {} {} {} ({} ms)",
            style("+").green(),
            session.timestamp.format("%H:%M:%S"),
            session.request_method,
            session.request_path,
            session.response_status_code,
            session.duration_ms
        ),
        SessionEvent::DeleteSession { ids } => {
            println!("{} {} session(s) removed", style("-").red(), ids.len())
        }
    }
}

fn print_raw(topic: &str, payload: &Value) {
    println!("{} {}", style(format!("[{}]", topic)).dim(), payload);
}
