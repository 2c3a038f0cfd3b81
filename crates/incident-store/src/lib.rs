pub mod config;
pub mod database;
pub mod error;
pub mod records;
pub mod row_mapper;
pub mod schema;

pub use config::StoreConfig;
pub use database::Database;
pub use error::StoreError;
pub use records::{RecordCursor, RecordStore};
