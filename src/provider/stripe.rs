//! Stripe PaymentIntents client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::info;

use crate::config::StripeConfig;
use crate::provider::{PaymentIntent, PaymentIntentProvider, ProviderError};

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Pulls the human-readable message out of a Stripe error reply.
fn rejection_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or_else(|| format!("payment intent request failed with status {status}: {body}"))
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    config: StripeConfig,
    http: Client,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl PaymentIntentProvider for StripeClient {
    async fn create_intent(&self, amount: u64) -> Result<PaymentIntent, ProviderError> {
        let url = format!("{}/v1/payment_intents", self.config.api_base);
        let form = [
            ("amount", amount.to_string()),
            ("currency", self.config.currency.clone()),
            ("payment_method_types[]", "card".to_string()),
        ];

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected(rejection_message(status, &text)));
        }

        let intent: IntentResponse = response.json().await?;
        info!(intent_id = %intent.id, amount, "payment intent created");

        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_message_is_surfaced_verbatim() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"Amount must be at least $0.50 usd"}}"#;
        assert_eq!(
            rejection_message(StatusCode::BAD_REQUEST, body),
            "Amount must be at least $0.50 usd"
        );
    }

    #[test]
    fn unparseable_body_falls_back_to_status() {
        let message = rejection_message(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(message.contains("502"));
        assert!(message.contains("upstream down"));
    }
}
