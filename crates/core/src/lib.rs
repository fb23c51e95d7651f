//! Core data types for the spot/futures spread monitor.

pub mod alert;
pub mod error;
pub mod exchange;
pub mod price;
pub mod time;

pub use alert::*;
pub use error::*;
pub use exchange::*;
pub use price::*;
pub use time::*;
