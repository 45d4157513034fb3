use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenMaker;
use crate::store::Store;
use crate::transfer::TransferCoordinator;

/// Shared state for all handlers
pub struct AppState<S: Store> {
    pub coordinator: Arc<TransferCoordinator<S>>,
    pub token_maker: Arc<dyn TokenMaker>,
    /// Deadline applied to each transfer request
    pub transfer_timeout: Duration,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S, token_maker: Arc<dyn TokenMaker>, transfer_timeout: Duration) -> Self {
        Self {
            coordinator: Arc::new(TransferCoordinator::new(store)),
            token_maker,
            transfer_timeout,
        }
    }

    pub fn store(&self) -> &S {
        self.coordinator.store()
    }
}
