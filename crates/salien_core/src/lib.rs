//! Coordinated multi-account automation for the territory-control minigame.
//!
//! One [`coordinator::Coordinator`] scans the contested planets and publishes
//! a single shared [`select::Target`]; one [`worker::Worker`] per account
//! joins that target, runs engagement rounds and reports scores, asking the
//! coordinator to revalidate whenever the service says the target no longer
//! matches reality.

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod outcome;
pub mod select;
pub mod session;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{ApiResponse, GameClient, HttpGameClient};
pub use config::SwarmConfig;
pub use coordinator::{Coordinator, CoordinatorHandle, CoordinatorSnapshot, Revalidation};
pub use error::SwarmError;
pub use select::{SelectPolicy, Target, TargetKey};
pub use session::{AccessToken, Session};
pub use worker::{RoundOutcome, Worker};
