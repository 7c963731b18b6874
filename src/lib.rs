//! smsgw - multi-provider SMS dispatch gateway.
//!
//! Messages go out through a [`gateway::Gateway`] that tries registered
//! [`provider::Provider`]s in failover order. Sender numbers come from a
//! [`pool::NumberPool`] that hands each target one number under a daily
//! quota.

pub mod bootstrap;
pub mod config;
pub mod gateway;
pub mod pool;
pub mod provider;
pub mod telemetry;
