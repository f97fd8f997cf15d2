use axum::{
    extract::{Query, State},
    response::Redirect,
};
use tracing::info;

use crate::api::AppState;
use crate::services::reconciler::CallbackParams;

/// GET /payments/callback
///
/// The gateway redirects the payer's browser here after checkout. All
/// outcomes, including verification failures, resolve to a redirect back to
/// the site's payment status page.
pub async fn payment_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    info!(
        payment_id = ?params.payment_id,
        status = ?params.status,
        application_id = ?params.application_id,
        "Received payment callback"
    );

    let redirect = state.reconciler.handle_callback(params).await;
    Redirect::to(&redirect.to_url(&state.site_url))
}
