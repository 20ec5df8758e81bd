//! Cache command - manage stored responses

use super::{open_cache, parse_fingerprint};
use crate::cache::MAX_STORED_RESPONSES;
use crate::cli::args::{CacheAction, CacheArgs};
use crate::config::Config;
use crate::error::IhppResult;
use crate::ui::{self, UiContext};

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> IhppResult<()> {
    let cache = open_cache(config).await?;

    match args.action {
        CacheAction::Count => {
            let count = cache.durable_count().await?;
            println!("{} / {}", count, MAX_STORED_RESPONSES);
        }
        CacheAction::Delete { fingerprint } => {
            let ctx = UiContext::detect();
            let key = parse_fingerprint(&fingerprint)?;
            cache.delete_state(&key).await;
            ui::step_ok(&ctx, &format!("Removed {}", key.short()));
        }
        CacheAction::Clear { yes } => {
            let ctx = UiContext::detect().with_auto_yes(yes);
            let count = cache.durable_count().await?;
            if count == 0 {
                ui::step_info(&ctx, "Response cache is already empty");
                return Ok(());
            }

            let prompt = format!("Remove all {} stored responses?", count);
            if !ui::confirm(&ctx, &prompt, false).await? {
                ui::step_warn_hint(&ctx, "Nothing removed", "Use --yes to skip the prompt");
                return Ok(());
            }

            cache.clear_all().await;
            ui::step_ok_detail(&ctx, "Response cache cleared", &format!("{} removed", count));
        }
    }

    Ok(())
}
