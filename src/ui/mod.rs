//! Terminal output for the ihpp CLI
//!
//! Uses `cliclack` for spinners and prompts in an interactive terminal and
//! falls back to plain, prefix-tagged lines when piped or running in CI.
//!
//! # Example
//!
//! ```rust,ignore
//! use ihpp::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Sending GET https://example.com");
//! spinner.stop("200 OK (31 ms)");
//!
//! ui::key_value(&ctx, "Fingerprint", &key.to_string());
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    key_value, key_value_status, remark, section, step_error_detail, step_info, step_ok,
    step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::TaskSpinner;
pub use prompts::confirm;
pub use theme::{init_theme, IhppTheme};
