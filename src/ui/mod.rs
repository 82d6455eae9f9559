//! UI helpers for consistent CLI output
//!
//! Uses `indicatif` spinners and `console` symbols in interactive terminals,
//! with automatic fallback to plain tagged lines in CI/non-interactive
//! environments.
//!
//! # Example
//!
//! ```rust,ignore
//! use shellcache::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Installing worker...");
//! // ... do work ...
//! spinner.stop("Staged 3 core resources");
//!
//! ui::step_warn_hint(&ctx, "No bundle configured", "Run: shellcache config set worker.bundle <path>");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, outro_success, outro_warn, remark, section,
    step_error_detail, step_info, step_ok, step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::TaskSpinner;
