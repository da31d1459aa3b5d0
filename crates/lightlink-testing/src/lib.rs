//! Test fixtures for lightlink
//!
//! Provides [`TestHub`], an in-memory [`HostApi`](lightlink_host::HostApi)
//! implementation with scriptable entity states and captured service calls,
//! plus builders for state-change notifications with explicit timestamps.

pub mod events;
mod hub;

pub use hub::{RecordedServiceCall, TestHub};
