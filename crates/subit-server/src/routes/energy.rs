//! Project energy usage.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Number;

use crate::error::ApiError;
use crate::state::AppState;

/// Response for the energy endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyResponse {
    pub success: bool,
    /// Whole totals render as integers (`5`), fractional ones as is (`3.7`).
    pub energy_cost: Number,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/project-energy/{id}", get(project_energy))
}

/// `GET /api/project-energy/{id}`
///
/// Total energy spent on a project: only positive charges count.
async fn project_energy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EnergyResponse>, ApiError> {
    if !state.resolver.is_configured() {
        tracing::error!("project energy requested but billing store is not configured");
        return Err(ApiError::NotConfigured);
    }

    let project_id = id.trim();
    if project_id.is_empty() {
        return Err(ApiError::BadRequest("Invalid project ID"));
    }

    let total = state
        .resolver
        .project_energy(project_id)
        .await
        .map_err(|e| ApiError::entitlement(&e, state.config.environment, "Failed to fetch energy usage"))?;

    Ok(Json(EnergyResponse {
        success: true,
        energy_cost: energy_number(total),
    }))
}

/// JSON number for an energy total: integral values without a fraction.
#[allow(
    clippy::float_cmp,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn energy_number(total: f64) -> Number {
    if total.fract() == 0.0 && (0.0..=u64::MAX as f64).contains(&total) {
        return Number::from(total as u64);
    }
    Number::from_f64(total).unwrap_or_else(|| Number::from(0u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_totals_render_as_integers() {
        assert_eq!(energy_number(5.0).to_string(), "5");
        assert_eq!(energy_number(0.0).to_string(), "0");
    }

    #[test]
    fn fractional_totals_keep_their_fraction() {
        assert_eq!(energy_number(3.75).to_string(), "3.75");
    }
}
