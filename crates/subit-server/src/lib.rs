//! `SubIt` edge server.
//!
//! Sits in front of the exported web app: redirects the legacy host to the
//! canonical one, requires a Clerk session on protected pages, and serves the
//! energy, plan and entitlement JSON API under `/api`.

pub mod app;
pub mod config;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod routes;
pub mod state;
