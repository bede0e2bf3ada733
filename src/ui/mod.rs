//! Terminal front end
//!
//! Renders the shell with ratatui and maps crossterm key events to view
//! actions. Store calls run on a tokio runtime owned by [`run`]; the draw
//! loop itself stays synchronous.

mod app;
mod form;
mod view;

pub use app::{run, AppState, UiOptions};
pub use form::{FormAction, FormEditor, FormField};
