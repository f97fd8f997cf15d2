//! Request/response types for the tokenized checkout flow

/// Status code bKash reports on a successful API call.
pub const SUCCESS_STATUS_CODE: &str = "0000";

/// Transaction status reported once the payer has completed the charge.
pub const COMPLETED_STATUS: &str = "Completed";

/// Payment mode for tokenized checkout (URL-based).
pub const CHECKOUT_MODE: &str = "0011";

pub const CURRENCY: &str = "BDT";
pub const INTENT: &str = "sale";

/// Inputs to checkout creation. The callback URL receives the gateway
/// redirect once the payer finishes or abandons the charge.
#[derive(Debug, Clone)]
pub struct CreateCheckoutRequest {
    pub amount: i64,
    pub callback_url: String,
    pub payer_reference: String,
    pub merchant_invoice_number: String,
}

/// A created checkout: where to send the payer, and the identifier the
/// gateway will hand back on the callback.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub payment_id: String,
    pub redirect_url: String,
    pub status_code: String,
    pub status_message: String,
}

/// Result of confirming a created payment.
#[derive(Debug, Clone)]
pub struct ExecuteOutcome {
    pub status_code: String,
    pub status_message: String,
    pub trx_id: Option<String>,
    pub transaction_status: Option<String>,
    pub amount: Option<String>,
}

impl ExecuteOutcome {
    pub fn is_success(&self) -> bool {
        self.status_code == SUCCESS_STATUS_CODE
    }
}

/// Current state of a payment as reported by the status query.
#[derive(Debug, Clone)]
pub struct PaymentStatus {
    pub status_code: String,
    pub status_message: String,
    pub trx_id: Option<String>,
    pub transaction_status: Option<String>,
    pub amount: Option<String>,
}

impl PaymentStatus {
    pub fn is_completed(&self) -> bool {
        self.status_code == SUCCESS_STATUS_CODE
            && self.transaction_status.as_deref() == Some(COMPLETED_STATUS)
    }
}

/// A freshly granted bearer token.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub token: String,
    /// Provider-reported TTL in seconds; absent on some responses.
    pub expires_in: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_outcome_success_requires_status_code() {
        let ok = ExecuteOutcome {
            status_code: SUCCESS_STATUS_CODE.to_string(),
            status_message: "Successful".to_string(),
            trx_id: Some("TRX1".to_string()),
            transaction_status: Some(COMPLETED_STATUS.to_string()),
            amount: Some("1000".to_string()),
        };
        assert!(ok.is_success());

        let declined = ExecuteOutcome {
            status_code: "2023".to_string(),
            status_message: "Insufficient balance".to_string(),
            trx_id: None,
            transaction_status: None,
            amount: None,
        };
        assert!(!declined.is_success());
    }

    #[test]
    fn payment_status_completed_requires_both_fields() {
        let completed = PaymentStatus {
            status_code: SUCCESS_STATUS_CODE.to_string(),
            status_message: "Successful".to_string(),
            trx_id: Some("TRX1".to_string()),
            transaction_status: Some(COMPLETED_STATUS.to_string()),
            amount: Some("1000".to_string()),
        };
        assert!(completed.is_completed());

        let initiated = PaymentStatus {
            transaction_status: Some("Initiated".to_string()),
            ..completed.clone()
        };
        assert!(!initiated.is_completed());

        let failed_code = PaymentStatus {
            status_code: "2062".to_string(),
            ..completed
        };
        assert!(!failed_code.is_completed());
    }
}
