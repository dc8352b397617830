//! Core logic for the `SubIt` edge service.
//!
//! Two request-facing pieces live here, both free of HTTP framework types so
//! they can be tested directly:
//!
//! - [`gate`], the admission decision: legacy-host canonicalization, public
//!   route classification via [`routes`], and whether a session is required.
//! - [`plan`] and [`usage`], the entitlement resolver: static plan table and
//!   per-project energy aggregation over a [`subit_store::BillingStore`].

pub mod error;
pub mod gate;
pub mod plan;
pub mod routes;
pub mod usage;
