use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::BkashConfig;
use crate::database::repository::TokenCache;
use crate::payments::client::GatewayHttpClient;
use crate::payments::error::{GatewayError, GatewayResult};
use crate::payments::provider::CheckoutProvider;
use crate::payments::token::{TokenRefresher, TokenStore};
use crate::payments::types::{
    CheckoutSession, CreateCheckoutRequest, ExecuteOutcome, PaymentStatus, TokenGrant,
    CHECKOUT_MODE, CURRENCY, INTENT, SUCCESS_STATUS_CODE,
};

/// bKash tokenized checkout provider.
///
/// Auth tokens are cached in the shared single-row store; requests go out
/// with whatever token is available (possibly none, in which case the
/// provider's 401 comes back as an AuthError).
pub struct BkashProvider {
    config: BkashConfig,
    http: GatewayHttpClient,
    tokens: TokenStore,
}

impl BkashProvider {
    pub fn new(config: BkashConfig, cache: Arc<dyn TokenCache>) -> GatewayResult<Self> {
        let http =
            GatewayHttpClient::new(Duration::from_secs(config.timeout_secs), config.max_retries)?;
        Ok(Self {
            config,
            http,
            tokens: TokenStore::new(cache),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn checkout_headers(&self) -> (Option<String>, String) {
        let token = self.tokens.bearer_token(self).await;
        (token, self.config.app_key.clone())
    }
}

#[async_trait]
impl TokenRefresher for BkashProvider {
    async fn refresh(&self) -> GatewayResult<TokenGrant> {
        let payload = serde_json::json!({
            "app_key": self.config.app_key,
            "app_secret": self.config.app_secret,
        });

        let raw: BkashTokenData = self
            .http
            .post_json(
                &self.endpoint("/checkout/token/grant"),
                &payload,
                &[
                    ("username", self.config.username.as_str()),
                    ("password", self.config.password.as_str()),
                    ("Content-Type", "application/json"),
                ],
            )
            .await?;

        if raw.id_token.as_deref().unwrap_or("").is_empty() {
            return Err(GatewayError::ProviderError {
                provider: "bkash".to_string(),
                message: raw
                    .status_message
                    .unwrap_or_else(|| "token grant returned no token".to_string()),
                provider_code: raw.status_code,
                retryable: false,
            });
        }

        Ok(TokenGrant {
            token: raw.id_token.unwrap_or_default(),
            expires_in: raw.expires_in,
        })
    }
}

#[async_trait]
impl CheckoutProvider for BkashProvider {
    async fn create_payment(
        &self,
        request: CreateCheckoutRequest,
    ) -> GatewayResult<CheckoutSession> {
        if request.amount < 1 {
            return Err(GatewayError::ValidationError {
                message: "Amount required".to_string(),
                field: Some("amount".to_string()),
            });
        }
        if request.callback_url.trim().is_empty() {
            return Err(GatewayError::ValidationError {
                message: "Callback URL required".to_string(),
                field: Some("callback_url".to_string()),
            });
        }

        let (token, app_key) = self.checkout_headers().await;
        let payload = serde_json::json!({
            "mode": CHECKOUT_MODE,
            "payerReference": request.payer_reference,
            "callbackURL": request.callback_url,
            "amount": request.amount.to_string(),
            "currency": CURRENCY,
            "intent": INTENT,
            "merchantInvoiceNumber": request.merchant_invoice_number,
        });

        let raw: BkashCreateData = self
            .http
            .post_json(
                &self.endpoint("/checkout/create"),
                &payload,
                &[
                    ("Authorization", token.as_deref().unwrap_or("")),
                    ("X-App-Key", &app_key),
                    ("Content-Type", "application/json"),
                ],
            )
            .await?;

        if raw.status_code.as_deref() != Some(SUCCESS_STATUS_CODE) {
            return Err(GatewayError::ProviderError {
                provider: "bkash".to_string(),
                message: raw
                    .status_message
                    .unwrap_or_else(|| "checkout creation failed".to_string()),
                provider_code: raw.status_code,
                retryable: false,
            });
        }

        let payment_id = raw.payment_id.unwrap_or_default();
        info!(payment_id = %payment_id, "bKash checkout created");

        Ok(CheckoutSession {
            payment_id,
            redirect_url: raw.bkash_url.unwrap_or_default(),
            status_code: raw.status_code.unwrap_or_default(),
            status_message: raw.status_message.unwrap_or_default(),
        })
    }

    async fn execute_payment(&self, payment_id: &str) -> GatewayResult<ExecuteOutcome> {
        let (token, app_key) = self.checkout_headers().await;
        let payload = serde_json::json!({ "paymentID": payment_id });

        let raw: BkashPaymentData = self
            .http
            .post_json(
                &self.endpoint("/checkout/execute"),
                &payload,
                &[
                    ("Authorization", token.as_deref().unwrap_or("")),
                    ("X-App-Key", &app_key),
                    ("Content-Type", "application/json"),
                ],
            )
            .await?;

        Ok(ExecuteOutcome {
            status_code: raw.status_code.unwrap_or_default(),
            status_message: raw.status_message.unwrap_or_default(),
            trx_id: raw.trx_id,
            transaction_status: raw.transaction_status,
            amount: raw.amount,
        })
    }

    async fn query_payment(&self, payment_id: &str) -> GatewayResult<PaymentStatus> {
        let (token, app_key) = self.checkout_headers().await;
        let payload = serde_json::json!({ "paymentID": payment_id });

        let raw: BkashPaymentData = self
            .http
            .post_json(
                &self.endpoint("/checkout/payment/status"),
                &payload,
                &[
                    ("Authorization", token.as_deref().unwrap_or("")),
                    ("X-App-Key", &app_key),
                    ("Content-Type", "application/json"),
                ],
            )
            .await?;

        Ok(PaymentStatus {
            status_code: raw.status_code.unwrap_or_default(),
            status_message: raw.status_message.unwrap_or_default(),
            trx_id: raw.trx_id,
            transaction_status: raw.transaction_status,
            amount: raw.amount,
        })
    }

    fn name(&self) -> &'static str {
        "bkash"
    }
}

#[derive(Debug, Deserialize)]
struct BkashTokenData {
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default, rename = "statusCode")]
    status_code: Option<String>,
    #[serde(default, rename = "statusMessage")]
    status_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BkashCreateData {
    #[serde(default, rename = "paymentID")]
    payment_id: Option<String>,
    #[serde(default, rename = "bkashURL")]
    bkash_url: Option<String>,
    #[serde(default, rename = "statusCode")]
    status_code: Option<String>,
    #[serde(default, rename = "statusMessage")]
    status_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BkashPaymentData {
    #[serde(default, rename = "trxID")]
    trx_id: Option<String>,
    #[serde(default, rename = "transactionStatus")]
    transaction_status: Option<String>,
    #[serde(default)]
    amount: Option<String>,
    #[serde(default, rename = "statusCode")]
    status_code: Option<String>,
    #[serde(default, rename = "statusMessage")]
    status_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::error::DatabaseError;
    use crate::database::token_cache_repository::CachedToken;
    use chrono::{DateTime, Utc};

    struct NoopCache;

    #[async_trait]
    impl TokenCache for NoopCache {
        async fn get(&self) -> Result<Option<CachedToken>, DatabaseError> {
            Ok(None)
        }

        async fn replace(
            &self,
            _token: &str,
            _expires_at: DateTime<Utc>,
        ) -> Result<(), DatabaseError> {
            Ok(())
        }
    }

    fn provider() -> BkashProvider {
        BkashProvider::new(
            BkashConfig {
                base_url: "https://tokenized.sandbox.bka.sh/v1.2.0-beta/tokenized".to_string(),
                username: "merchant".to_string(),
                password: "secret".to_string(),
                app_key: "key".to_string(),
                app_secret: "app_secret".to_string(),
                timeout_secs: 5,
                max_retries: 1,
            },
            Arc::new(NoopCache),
        )
        .expect("provider init should succeed")
    }

    #[tokio::test]
    async fn zero_amount_rejected_before_any_http_call() {
        let provider = provider();
        let err = provider
            .create_payment(CreateCheckoutRequest {
                amount: 0,
                callback_url: "https://x/cb".to_string(),
                payer_reference: "user_1".to_string(),
                merchant_invoice_number: "INV-1".to_string(),
            })
            .await
            .expect_err("zero amount must fail validation");

        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.user_message(), "Amount required");
    }

    #[tokio::test]
    async fn missing_callback_rejected_before_any_http_call() {
        let provider = provider();
        let err = provider
            .create_payment(CreateCheckoutRequest {
                amount: 100,
                callback_url: "  ".to_string(),
                payer_reference: "user_1".to_string(),
                merchant_invoice_number: "INV-1".to_string(),
            })
            .await
            .expect_err("missing callback must fail validation");

        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.user_message(), "Callback URL required");
    }

    #[test]
    fn wire_structs_tolerate_partial_responses() {
        let data: BkashPaymentData = serde_json::from_str(
            r#"{"statusCode":"0000","statusMessage":"Successful","trxID":"TRX1","transactionStatus":"Completed"}"#,
        )
        .expect("payment data should parse");
        assert_eq!(data.trx_id.as_deref(), Some("TRX1"));
        assert_eq!(data.amount, None);

        let data: BkashPaymentData =
            serde_json::from_str(r#"{"statusCode":"2062"}"#).expect("sparse data should parse");
        assert_eq!(data.status_code.as_deref(), Some("2062"));
        assert_eq!(data.transaction_status, None);
    }
}
