//! Core library for the copyright-desk terminal application.
//!
//! The binary only parses configuration and wires these pieces together, so
//! integration tests can drive the lookup client, the table store and the
//! spreadsheet codec directly.
pub mod config;
pub mod copyright;
pub mod error;
pub mod logging;
pub mod lookup;
pub mod models;
pub mod session;
pub mod spreadsheet;
pub mod store;
pub mod ui;

pub use config::Config;
pub use copyright::{determine_copyright_status, extract_leading_year, parse_four_digit_year};
pub use error::{ErrorKind, LookupError, SpreadsheetError};
pub use lookup::{LookupClient, LookupConfig, SearchReport};
pub use models::{Publication, PublicationKind};
pub use session::SessionCredentials;
pub use store::PublicationTable;

/// The interactive application entry point and state container.
pub use ui::{run_app, App, AppOptions};
