//! HTTP and WebSocket handlers, one module per resource.

pub mod health;
pub mod kitchen;
pub mod live;
pub mod metrics;
pub mod orders;
pub mod payments;
pub mod stock;
pub mod tables;
pub mod ws;

use std::fmt::Display;

use crate::error::ApiError;

/// Parses a path segment, naming the parameter in the 400 message.
pub(crate) fn parse_param<T, E: Display>(
    raw: &str,
    name: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, ApiError> {
    parse(raw).map_err(|e| ApiError::BadRequest(format!("Invalid {name} '{raw}': {e}")))
}

pub(crate) fn parse_index(raw: &str) -> Result<usize, ApiError> {
    parse_param(raw, "item index", str::parse::<usize>)
}
