//! Application state shared across all request handlers.

use loyalty_core::ledger::LedgerStore;
use loyalty_sdk::signature::SessionSigner;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Durable ledger, Postgres in production.
    pub ledger: Arc<dyn LedgerStore>,
    /// Issues and checks session cookies.
    pub signer: Arc<SessionSigner>,
}

impl AppState {
    pub fn new(ledger: Arc<dyn LedgerStore>, signer: SessionSigner) -> Self {
        Self {
            ledger,
            signer: Arc::new(signer),
        }
    }
}
