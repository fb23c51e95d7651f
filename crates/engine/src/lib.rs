//! Spot/futures divergence engine.
//!
//! This crate holds the shared price board and the divergence monitor:
//! threshold comparison, WARN/EMERGENCY classification, cooldowns with the
//! escalation override, and alert message rendering. Delivery is behind the
//! [`Notifier`] trait.

pub mod alert;
pub mod board;
pub mod cooldown;
pub mod divergence;
pub mod monitor;
pub mod sink;
pub mod threshold;

pub use alert::*;
pub use board::*;
pub use cooldown::*;
pub use divergence::*;
pub use monitor::*;
pub use sink::*;
pub use threshold::*;
