//! Real-time ticker feeds from exchanges.
//!
//! This crate provides WebSocket connections to Gate.io and Bybit for
//! collecting last-traded prices.
//!
//! ## Architecture
//!
//! - `adapter/` - Exchange-specific URLs, subscribe frames and ticker parsing
//! - `websocket` - Connection loop with keep-alive and reconnect
//! - `runner/` - Turns raw frames into `FeedMessage`
//! - `manager` - Spawns one client and runner per (exchange, market)

pub mod adapter;
pub mod error;
pub mod manager;
pub mod message;
pub mod retry;
pub mod runner;
pub mod symbol_mapping;
pub mod websocket;

pub use adapter::{adapter_for, BybitAdapter, ExchangeAdapter, GateIOAdapter, WireTicker};
pub use error::*;
pub use manager::*;
pub use message::{ConnectionEvent, FeedId, FeedMessage};
pub use retry::*;
pub use runner::*;
pub use symbol_mapping::*;
pub use websocket::*;
