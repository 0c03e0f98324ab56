#![doc = "The `teamforge` library crate."]
#![doc = ""]
#![doc = "Domain models, authentication, routing configuration and error handling for the"]
#![doc = "TeamForge project tracker. The binary (`main.rs`) builds the HTTP server from these parts."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;

pub use crate::config::Config;
pub use crate::error::AppError;
