//! Storage Mapper: schema definition -> concrete storage model.

pub mod column;
pub mod ddl;
pub mod mapper;
pub mod validators;

pub use column::{ColumnSpec, ColumnType, IndexSpec, StorageModel, UniqueConstraint};
pub use ddl::{apply_storage, create_index_sql, create_table_sql};
pub use mapper::StorageMapper;
pub use validators::{Check, FieldValidator};
