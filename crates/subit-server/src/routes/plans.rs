//! Plan catalog and the current user's entitlement.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Serialize;
use subit_core::plan::{self, PlanSummary};
use subit_core::usage::UserEntitlement;

use crate::error::ApiError;
use crate::identity::Session;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub success: bool,
    pub plans: Vec<PlanSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementResponse {
    pub success: bool,
    pub user_id: String,
    #[serde(flatten)]
    pub entitlement: UserEntitlement,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/me/entitlements", get(my_entitlements))
}

/// `GET /api/plans`
async fn list_plans() -> Json<PlansResponse> {
    Json(PlansResponse {
        success: true,
        plans: plan::catalog(),
    })
}

/// `GET /api/me/entitlements`
///
/// Needs a verified session; the gate attaches one when the request carries
/// a valid token even though `/api` is public.
async fn my_entitlements(
    State(state): State<Arc<AppState>>,
    session: Option<Extension<Session>>,
) -> Result<Json<EntitlementResponse>, ApiError> {
    let Some(Extension(session)) = session else {
        return Err(ApiError::Unauthorized);
    };

    let entitlement = state
        .resolver
        .user_entitlement(&session.user_id)
        .await
        .map_err(|e| ApiError::entitlement(&e, state.config.environment, "Failed to fetch subscription"))?;

    Ok(Json(EntitlementResponse {
        success: true,
        user_id: session.user_id,
        entitlement,
    }))
}
