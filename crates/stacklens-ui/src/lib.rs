//! # stacklens-ui
//!
//! Terminal panel for the stacklens frames view, built on `ratatui`.
//!
//! Shows the thread list with its filter field next to the frames of the
//! selected thread, and drives the debuggee with a few keys.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use stacklens_core::provider::Debuggee;
//! use stacklens_core::sim::{SimConfig, SimDebuggee};
//!
//! # async fn example() -> std::io::Result<()> {
//! let debuggee = Arc::new(SimDebuggee::new(SimConfig::default()));
//! debuggee.pause();
//! stacklens_ui::run_tui(debuggee, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod event;
pub mod tui;
pub mod ui;
pub mod widgets;

use std::sync::Arc;

pub use app::App;
use stacklens_core::provider::Debuggee;
pub use tui::Tui;

/// Run the TUI for `debuggee` until the user quits
///
/// # Errors
///
/// Returns an error if the terminal cannot be set up, drawn to or restored.
pub async fn run_tui<D: Debuggee + 'static>(debuggee: Arc<D>, filter: Option<String>) -> std::io::Result<()>
{
    let mut tui = Tui::new()?;
    tui.run(debuggee, filter).await
}
