//! Payment callback reconciliation
//!
//! The gateway redirects the payer back with a payment ID and an optional
//! terminal status. This is the single place a reservation becomes a
//! permanent application: explicit cancel/failure discards the reservation,
//! a verified completed payment promotes it, and anything inconclusive
//! (execute or query not reporting success) leaves the reservation intact
//! for a retry or the cleanup sweep.

use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::database::application_repository::PaymentRecord;
use crate::database::repository::{ApplicationLedger, ReservationStore};
use crate::payments::provider::CheckoutProvider;
use crate::storage::ImageStore;

/// Raw query parameters on the gateway redirect.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackParams {
    #[serde(rename = "paymentID")]
    pub payment_id: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "applicationId")]
    pub application_id: Option<String>,
}

/// The callback parsed into a closed set of outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Cancelled { application_id: String },
    Failed { application_id: String },
    AwaitingVerification {
        payment_id: String,
        application_id: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallbackParseError {
    #[error("Missing applicationId parameter")]
    MissingApplicationId,
    #[error("Missing paymentID parameter")]
    MissingPaymentId,
    #[error("Unknown callback status: {0}")]
    UnknownStatus(String),
}

impl CallbackOutcome {
    pub fn parse(params: &CallbackParams) -> Result<Self, CallbackParseError> {
        let application_id = params
            .application_id
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(CallbackParseError::MissingApplicationId)?
            .to_string();

        match params.status.as_deref() {
            Some("cancel") => Ok(CallbackOutcome::Cancelled { application_id }),
            Some("failure") => Ok(CallbackOutcome::Failed { application_id }),
            Some(other) if other != "success" => {
                Err(CallbackParseError::UnknownStatus(other.to_string()))
            }
            _ => {
                let payment_id = params
                    .payment_id
                    .as_deref()
                    .filter(|v| !v.trim().is_empty())
                    .ok_or(CallbackParseError::MissingPaymentId)?
                    .to_string();
                Ok(CallbackOutcome::AwaitingVerification {
                    payment_id,
                    application_id,
                })
            }
        }
    }
}

/// Where the payer's browser is sent after reconciliation. Every outcome,
/// including internal failures, resolves to one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRedirect {
    Success { trx_id: String },
    Failure { message: String },
    Cancelled,
}

impl PaymentRedirect {
    /// Build the absolute redirect URL under `{site}/payment`.
    pub fn to_url(&self, site_url: &str) -> String {
        let base = format!("{}/payment", site_url.trim_end_matches('/'));
        let params: Vec<(&str, &str)> = match self {
            PaymentRedirect::Success { trx_id } => {
                vec![("status", "success"), ("trxID", trx_id)]
            }
            PaymentRedirect::Failure { message } => {
                vec![("status", "failure"), ("message", message)]
            }
            PaymentRedirect::Cancelled => vec![("status", "cancel")],
        };

        match reqwest::Url::parse_with_params(&base, &params) {
            Ok(url) => url.to_string(),
            // site_url is validated at startup; this only fires on a
            // malformed override and still lands on the status page.
            Err(_) => format!("{}?status=failure", base),
        }
    }
}

/// Reconciles gateway callbacks against the reservation store.
pub struct CallbackReconciler {
    gateway: Arc<dyn CheckoutProvider>,
    reservations: Arc<dyn ReservationStore>,
    ledger: Arc<dyn ApplicationLedger>,
    images: Arc<dyn ImageStore>,
    application_fee: i64,
}

impl CallbackReconciler {
    pub fn new(
        gateway: Arc<dyn CheckoutProvider>,
        reservations: Arc<dyn ReservationStore>,
        ledger: Arc<dyn ApplicationLedger>,
        images: Arc<dyn ImageStore>,
        application_fee: i64,
    ) -> Self {
        Self {
            gateway,
            reservations,
            ledger,
            images,
            application_fee,
        }
    }

    /// Handle one callback invocation. Never errors: every path, including
    /// unexpected internal failures, resolves to a redirect target.
    pub async fn handle_callback(&self, params: CallbackParams) -> PaymentRedirect {
        let outcome = match CallbackOutcome::parse(&params) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Unparseable payment callback");
                return PaymentRedirect::Failure {
                    message: e.to_string(),
                };
            }
        };

        match outcome {
            CallbackOutcome::Cancelled { application_id } => {
                info!(application_id = %application_id, "Payment cancelled by payer");
                self.discard(&application_id).await;
                PaymentRedirect::Cancelled
            }
            CallbackOutcome::Failed { application_id } => {
                info!(application_id = %application_id, "Payment failed at gateway");
                self.discard(&application_id).await;
                PaymentRedirect::Failure {
                    message: "Payment failed".to_string(),
                }
            }
            CallbackOutcome::AwaitingVerification {
                payment_id,
                application_id,
            } => self.verify_and_finalize(&payment_id, &application_id).await,
        }
    }

    /// Discard a reservation: best-effort image delete, then row delete.
    /// Idempotent: a reservation that is already gone is a no-op.
    async fn discard(&self, application_id: &str) {
        let pending = match self.reservations.find_by_id(application_id).await {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                info!(application_id = %application_id, "Reservation already gone, discard is a no-op");
                return;
            }
            Err(e) => {
                error!(application_id = %application_id, error = %e, "Reservation lookup failed during discard");
                return;
            }
        };

        if let Some(image_id) = &pending.image_id {
            if let Err(e) = self.images.delete_image(image_id).await {
                warn!(image_id = %image_id, error = %e, "Best-effort image delete failed");
            }
        }

        match self.reservations.delete_by_id(application_id).await {
            Ok(true) => info!(application_id = %application_id, "Reservation discarded"),
            Ok(false) => {
                info!(application_id = %application_id, "Reservation vanished before discard")
            }
            Err(e) => {
                error!(application_id = %application_id, error = %e, "Reservation delete failed during discard")
            }
        }
    }

    /// Execute then query the payment; promote only on a verified
    /// "Completed" status. Verification failures leave the reservation in
    /// place so it can be retried or swept.
    async fn verify_and_finalize(
        &self,
        payment_id: &str,
        application_id: &str,
    ) -> PaymentRedirect {
        let execute = match self.gateway.execute_payment(payment_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(payment_id = %payment_id, error = %e, "Payment execute call failed");
                return PaymentRedirect::Failure {
                    message: e.user_message(),
                };
            }
        };

        if !execute.is_success() {
            warn!(
                payment_id = %payment_id,
                status_code = %execute.status_code,
                "Payment execute did not report success, reservation left intact"
            );
            return PaymentRedirect::Failure {
                message: execute.status_message,
            };
        }

        let status = match self.gateway.query_payment(payment_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(payment_id = %payment_id, error = %e, "Payment status query failed");
                return PaymentRedirect::Failure {
                    message: e.user_message(),
                };
            }
        };

        if !status.is_completed() {
            warn!(
                payment_id = %payment_id,
                transaction_status = ?status.transaction_status,
                "Payment not completed, reservation left intact"
            );
            return PaymentRedirect::Failure {
                message: status.status_message,
            };
        }

        let trx_id = status
            .trx_id
            .or(execute.trx_id)
            .unwrap_or_else(|| payment_id.to_string());

        let record = PaymentRecord {
            amount: self.application_fee,
            method: self.gateway.name().to_string(),
            trx_id: trx_id.clone(),
            payment_id: payment_id.to_string(),
        };

        match self.ledger.promote(application_id, record).await {
            Ok(application) => {
                info!(
                    application_id = %application.id,
                    roll = application.roll,
                    trx_id = %trx_id,
                    "Payment finalized"
                );
                PaymentRedirect::Success { trx_id }
            }
            Err(e) if e.is_not_found() => {
                warn!(application_id = %application_id, "Reservation missing at finalize");
                PaymentRedirect::Failure {
                    message: "Application not found".to_string(),
                }
            }
            Err(e) => {
                error!(application_id = %application_id, error = %e, "Promotion failed");
                PaymentRedirect::Failure {
                    message: "Something went wrong".to_string(),
                }
            }
        }
    }
}
