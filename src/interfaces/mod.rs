//! Outer surfaces: the request/response API and the CSV batch adapters.

pub mod api;
pub mod csv;
