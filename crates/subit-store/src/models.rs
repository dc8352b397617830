//! Row types read from the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A subscription row as stored by the billing subsystem.
///
/// `plan` is kept as the raw stored string; `subit-core` maps it onto a plan
/// tier and treats unknown values as `free`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

impl SubscriptionRecord {
    /// Build a record for the given plan with no end date.
    #[must_use]
    pub fn new(plan: impl Into<String>) -> Self {
        Self {
            plan: Some(plan.into()),
            ends_at: None,
        }
    }
}

/// One metered operation charged against a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    #[serde(default)]
    pub project_id: String,
    /// Energy charged. Negative values are credits or corrections.
    #[serde(default, deserialize_with = "deserialize_energy")]
    pub energy_cost: f64,
}

impl UsageRecord {
    #[must_use]
    pub fn new(project_id: impl Into<String>, energy_cost: impl Into<f64>) -> Self {
        Self {
            project_id: project_id.into(),
            energy_cost: energy_cost.into(),
        }
    }
}

/// Accept integer, fractional or `null` energy columns.
///
/// PostgREST renders `numeric` columns as JSON numbers with or without a
/// fraction; the value is kept as is and `null` reads as zero.
fn deserialize_energy<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.unwrap_or(0.0))
}
