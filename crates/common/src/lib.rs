//! Configuration, logging and shared models for the redash-query crates.
//!
//! - **Configuration**: file + environment layered `AppConfig` (`config`).
//! - **Logging**: `tracing` subscriber setup (`logging`).
//! - **Models**: types shared by the engine and its front ends (`models`).
pub mod config;
pub mod logging;
pub mod models;
