use std::sync::Arc;

use gauntlet_delivery::{HttpTransport, WebhookTransport};
use gauntlet_session::{GauntletConfig, RunScheduler, SessionOrchestrator};
use gauntlet_store::{InMemoryStore, VerificationStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VerificationStore>,
    pub transport: Arc<dyn WebhookTransport>,
    pub orchestrator: Arc<SessionOrchestrator>,
    pub scheduler: Arc<RunScheduler>,
    pub config: GauntletConfig,
}

impl AppState {
    pub fn new(config: GauntletConfig) -> Self {
        Self::with_parts(
            Arc::new(InMemoryStore::new()),
            Arc::new(HttpTransport::new()),
            config,
        )
    }

    /// Wire the state from explicit parts; tests inject scripted transports
    /// and pre-seeded stores here.
    pub fn with_parts(
        store: Arc<dyn VerificationStore>,
        transport: Arc<dyn WebhookTransport>,
        config: GauntletConfig,
    ) -> Self {
        let orchestrator = Arc::new(SessionOrchestrator::new(
            store.clone(),
            transport.clone(),
            config.clone(),
        ));
        let scheduler = Arc::new(RunScheduler::new(orchestrator.clone()));
        Self {
            store,
            transport,
            orchestrator,
            scheduler,
            config,
        }
    }
}
