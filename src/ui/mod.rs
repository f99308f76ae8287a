//! Console interaction for the launcher
//!
//! Uses `cliclack` for the package browser and phase messages, with plain
//! line output when stdout is not a terminal or a CI runner is detected.

mod browser;
mod context;
mod output;
mod progress;

pub use browser::{browse, BrowseChoice, BrowseEntry, BrowseStep, Browser};
pub use context::UiContext;
pub use output::{
    intro, outro_success, outro_warn, remark, step_error_detail, step_info, step_ok,
    step_ok_detail, step_warn,
};
pub use progress::TaskSpinner;
