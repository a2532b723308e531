use std::sync::Arc;

use crate::config::Config;
use crate::fulfillment::FulfillmentService;
use crate::notify::Notifier;
use crate::shortener::Shortener;
use crate::store::Store;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub fulfillment: Arc<dyn FulfillmentService>,
    pub notifier: Arc<dyn Notifier>,
    pub shortener: Shortener,
}
