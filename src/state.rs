use std::sync::Arc;

use crate::observability::metrics::Metrics;
use crate::queue::OrderQueue;
use crate::storage::Directory;

pub struct AppState {
    pub directory: Arc<dyn Directory>,
    pub queue: Arc<dyn OrderQueue>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(directory: Arc<dyn Directory>, queue: Arc<dyn OrderQueue>) -> Self {
        Self {
            directory,
            queue,
            metrics: Metrics::new(),
        }
    }
}
