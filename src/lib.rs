//! Marginal abatement cost curves and hourly dispatch welfare models.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod mac;
pub mod telemetry;

pub use error::{DispatchError, MacError};
