//! # Data Models
//!
//! SeaORM entities for the bridge's tables.

pub mod erp_config;
pub mod installation;
pub mod sync_operation;

pub use erp_config::Entity as ErpConfig;
pub use installation::Entity as Installation;
pub use sync_operation::Entity as SyncOperation;
