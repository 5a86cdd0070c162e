pub mod catalog;
pub mod classify;
pub mod common;
pub mod config;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod ingest;
pub mod map;
pub mod output;
pub mod registry;
pub mod session;
pub mod toggle;
pub mod viz;

pub use config::AppConfig;
pub use session::{DemoReport, DemoSession};
