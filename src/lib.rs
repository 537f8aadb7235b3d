pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod state;
pub mod store;
