//! # API Handlers
//!
//! HTTP endpoint handlers for the bridge: the installation callback, the app
//! entry page, store-scoped JSON endpoints and the privacy webhooks.

pub mod app;
pub mod callback;
pub mod erp_config;
pub mod health;
pub mod sync;
pub mod types;
pub mod webhooks;
