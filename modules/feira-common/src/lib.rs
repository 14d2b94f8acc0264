pub mod catalog;
pub mod config;
pub mod types;

pub use catalog::{CategoryCatalog, DEFAULT_CATEGORIES};
pub use config::Config;
pub use types::*;
