//! Terminal presentation: screens, dialogs and the event loop.

mod app;
mod events;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::{App, AppOptions, Screen};
pub use terminal::run_app;
