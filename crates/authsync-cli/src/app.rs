//! Wiring between config, the HTTP client and the sync core.

use std::sync::Arc;

use authsync_api::HttpAuthApi;
use authsync_config::{Config, Paths};
use authsync_core::{AuthSyncCore, FileHintStore, InvalidationReason, Navigator, ReconcileOutcome};
use tracing::info;

/// Navigator for a terminal: there is no page to swap, so it just reports
/// where the user would have been sent.
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, path: &str) {
        info!(path, "Navigating");
        println!("-> {path}");
    }
}

/// Build the core against the configured API.
pub fn build(
    config: &Config,
    paths: &Paths,
) -> anyhow::Result<(Arc<AuthSyncCore>, Arc<TerminalNavigator>)> {
    let base_url = config.api_base_url()?;
    let api = Arc::new(HttpAuthApi::new(&base_url, config.request_timeout())?);
    let hints = Arc::new(FileHintStore::new(paths.hint_file()));
    let navigator = Arc::new(TerminalNavigator);

    info!(api = %base_url, "AuthSync core configured");
    let core = AuthSyncCore::new(api, navigator.clone(), hints, config);
    Ok((Arc::new(core), navigator))
}

/// Run one reconciliation and print where it settled.
pub async fn probe(core: &AuthSyncCore) {
    match core.reconcile(InvalidationReason::Startup).await {
        ReconcileOutcome::Settled(status) => println!("{status}"),
        ReconcileOutcome::Indeterminate(status) => {
            println!("indeterminate (last known: {status})");
        }
        ReconcileOutcome::Coalesced => println!("{}", core.get_status()),
    }
}
