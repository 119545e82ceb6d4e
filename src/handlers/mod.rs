use std::sync::Arc;

use crate::collector::SwitchCollector;

pub mod health;
pub mod metrics;

pub use health::health;
pub use metrics::metrics;

#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<SwitchCollector>,
}
