pub mod config;
pub mod database;
pub mod error;
pub mod path;
pub mod stats;
pub mod types;
pub mod value;
