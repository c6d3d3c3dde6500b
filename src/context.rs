use msgproc_db::MessageStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::ingest::MessageService;
use crate::kafka::EnvelopePublisher;
use crate::stats::StatisticsService;

/// Application context containing shared dependencies
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn MessageStore>,
    pub messages: MessageService,
    pub stats: StatisticsService,
    /// Fires when the HTTP drain window expires. Publishes still waiting are
    /// abandoned and later ones fail fast.
    pub request_cancel: CancellationToken,
}

impl AppContext {
    /// Creates a new application context
    pub fn new(
        store: Arc<dyn MessageStore>,
        publisher: Arc<dyn EnvelopePublisher>,
        request_cancel: CancellationToken,
    ) -> Self {
        Self {
            messages: MessageService::new(store.clone(), publisher),
            stats: StatisticsService::new(store.clone()),
            store,
            request_cancel,
        }
    }
}
