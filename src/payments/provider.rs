use async_trait::async_trait;

use crate::payments::error::GatewayResult;
use crate::payments::types::{
    CheckoutSession, CreateCheckoutRequest, ExecuteOutcome, PaymentStatus,
};

/// A tokenized-checkout payment gateway.
///
/// `create_payment` opens a checkout and returns the payer redirect;
/// `execute_payment` confirms a charge after the payer returns;
/// `query_payment` reports the charge's current transaction status.
/// Execute and query return the provider's outcome even on non-success
/// status codes; only transport, auth and validation failures are errors.
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    async fn create_payment(
        &self,
        request: CreateCheckoutRequest,
    ) -> GatewayResult<CheckoutSession>;

    async fn execute_payment(&self, payment_id: &str) -> GatewayResult<ExecuteOutcome>;

    async fn query_payment(&self, payment_id: &str) -> GatewayResult<PaymentStatus>;

    fn name(&self) -> &'static str;
}
