pub mod aggregate;
pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod distribution;
pub mod error;
pub mod sheets;
pub mod types;
