pub mod stripe;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider refused the request; the message is its own text.
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

/// Creates client-confirmable card charges.
#[async_trait]
pub trait PaymentIntentProvider: Send + Sync {
    /// `amount` is in minor currency units.
    async fn create_intent(&self, amount: u64) -> Result<PaymentIntent, ProviderError>;
}
