//! Plan tiers and the entitlements shown for them.
//!
//! The table is static and display-only. Quota enforcement happens where
//! energy is spent, not here.

use serde::Serialize;

/// Subscription plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
    Premium,
}

/// User-facing entitlement facts for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub display_name: &'static str,
    pub price: &'static str,
    pub daily_allowance: &'static str,
}

/// One row of the public plan catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub id: PlanTier,
    #[serde(flatten)]
    pub entitlement: Entitlement,
    pub price_cents: u32,
    /// `None` means unlimited.
    pub daily_energy: Option<u32>,
}

impl PlanTier {
    pub const ALL: [Self; 3] = [Self::Free, Self::Pro, Self::Premium];

    /// Map a stored plan value onto a tier.
    ///
    /// Absent and unrecognised values resolve to [`PlanTier::Free`]. Matching
    /// is exact: `"Pro"` is not `"pro"`.
    #[must_use]
    pub fn parse(plan: Option<&str>) -> Self {
        match plan {
            Some("pro") => Self::Pro,
            Some("premium") => Self::Premium,
            _ => Self::Free,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Premium => "premium",
        }
    }

    #[must_use]
    pub const fn entitlement(self) -> Entitlement {
        match self {
            Self::Free => Entitlement {
                display_name: "Free",
                price: "Free",
                daily_allowance: "30 energy/day",
            },
            Self::Pro => Entitlement {
                display_name: "Pro",
                price: "$10/month",
                daily_allowance: "300 energy/day",
            },
            Self::Premium => Entitlement {
                display_name: "Premium",
                price: "$50/month",
                daily_allowance: "Unlimited energy",
            },
        }
    }

    /// Daily energy allowance, `None` for unlimited.
    #[must_use]
    pub const fn daily_energy_limit(self) -> Option<u32> {
        match self {
            Self::Free => Some(30),
            Self::Pro => Some(300),
            Self::Premium => None,
        }
    }

    #[must_use]
    pub const fn monthly_price_cents(self) -> u32 {
        match self {
            Self::Free => 0,
            Self::Pro => 1_000,
            Self::Premium => 5_000,
        }
    }

    #[must_use]
    pub const fn summary(self) -> PlanSummary {
        PlanSummary {
            id: self,
            entitlement: self.entitlement(),
            price_cents: self.monthly_price_cents(),
            daily_energy: self.daily_energy_limit(),
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entitlement for a stored plan value; unknown or absent means free.
#[must_use]
pub fn resolve_plan(plan: Option<&str>) -> Entitlement {
    PlanTier::parse(plan).entitlement()
}

/// The full plan catalog, cheapest first.
#[must_use]
pub fn catalog() -> Vec<PlanSummary> {
    PlanTier::ALL.iter().map(|t| t.summary()).collect()
}
