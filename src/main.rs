//! Binary entry point: parse configuration, set up logging and the lookup
//! runtime, then hand the terminal to the UI loop until the user exits.
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use copyright_desk::logging;
use copyright_desk::session::{MemoryStorage, RuntimeDirStorage, SessionStorage};
use copyright_desk::{run_app, App, AppOptions, Config, LookupClient, SessionCredentials};

fn main() -> Result<()> {
    let config = Config::parse();
    let log_path = logging::init(&config.log_filter, config.log_file.as_deref())?;

    let storage: Arc<dyn SessionStorage> = match RuntimeDirStorage::for_current_user() {
        Some(storage) => {
            tracing::info!(dir = %storage.dir().display(), "session credentials in runtime directory");
            Arc::new(storage)
        }
        None => {
            tracing::info!("no runtime directory; session credentials kept in memory");
            Arc::new(MemoryStorage::new())
        }
    };
    let credentials = SessionCredentials::new(storage);
    if let Some(key) = config.seed_api_key() {
        credentials.set_api_key(key);
    }

    let client = LookupClient::new(&config.lookup_config(), credentials.clone())
        .context("failed to set up the lookup client")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    tracing::info!(
        base_url = client.base_url(),
        strategy = ?config.search_strategy,
        log = %log_path.display(),
        "starting copyright-desk"
    );

    let mut app = App::new(
        credentials,
        client,
        runtime.handle().clone(),
        AppOptions {
            search_strategy: config.search_strategy,
            export_dir: config.export_dir.clone(),
        },
    );
    run_app(&mut app)
}
