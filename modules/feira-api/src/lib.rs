//! HTTP surface for the marketplace search: intelligent and structured product
//! search, the admin request log, bearer-token identity, and the Postgres stores
//! behind them.

pub mod app;
pub mod auth;
pub mod db;
pub mod error;
pub mod jwt;
pub mod request_log;
pub mod rest;

pub use app::{build_router, AppState};
pub use error::ApiError;
