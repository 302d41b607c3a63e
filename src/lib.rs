//! Guarantee lifecycle engine for a rental-guarantee brokerage: request
//! intake, guarded status transitions with an append-only audit trail,
//! credit-score pricing, tenant identity resolution, and outbound webhook
//! notifications to the contract system.

pub mod config;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod notify;
pub mod pricing;
pub mod telemetry;
