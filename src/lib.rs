//! # ERP Bridge Library
//!
//! Connects Nuvemshop/Tiendanube stores to an external ERP: completes the
//! OAuth app installation, stores ERP settings, records product sync
//! requests and answers the platform's privacy webhooks.

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod handshake;
pub mod models;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub use migration;
