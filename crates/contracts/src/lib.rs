//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend only on this crate, never on each other's internals.
//!
//! ## Seams
//! - [`TrackingEvent`]: what applications hand to the collector
//! - [`HubProvider`] / [`HubClient`] / [`EventBatch`]: the capability a hub
//!   transport must satisfy; the dispatcher never names a concrete client
//! - [`HubConfig`]: construction configuration

mod config;
mod error;
mod event;
mod hub;

pub use config::*;
pub use error::*;
pub use event::*;
pub use hub::*;
