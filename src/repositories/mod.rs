//! # Repository Layer
//!
//! Repository implementations that encapsulate SeaORM operations for the
//! bridge's tables. Every table is keyed or filtered by `store_id`.

pub mod erp_config;
pub mod installation;
pub mod store_data;
pub mod sync_operation;

pub use erp_config::ErpConfigRepository;
pub use installation::{InstallationRepository, InstallationStore, StoreError};
pub use store_data::{RedactedRows, StoreDataRepository};
pub use sync_operation::SyncOperationRepository;
