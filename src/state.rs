use std::sync::Arc;

use crate::provider::PaymentIntentProvider;
use crate::store::BookingStore;

pub struct AppState {
    pub store: Arc<dyn BookingStore>,
    pub intents: Arc<dyn PaymentIntentProvider>,
}

impl AppState {
    pub fn new(store: Arc<dyn BookingStore>, intents: Arc<dyn PaymentIntentProvider>) -> Self {
        Self { store, intents }
    }
}
