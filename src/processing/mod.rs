//! Packing pipeline over in-memory datasets.
//!
//! The processing layer takes a [`crate::types::DataSet`] produced by ingestion and turns it into
//! upload-ready batches:
//!
//! - [`transform()`]: apply each column's declared packer ([`ColumnDeclaration`])
//! - [`assemble()`]: turn packed columns into per-row [`Record`]s keyed by field ID
//! - [`batch()`]: split records into request-sized batches
//!
//! ## Example: transform → assemble → batch
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use qbase_loader::processing::{assemble, batch, transform, ColumnDeclaration, DEFAULT_BATCH_SIZE};
//! use qbase_loader::types::{DataSet, Value};
//! use serde_json::json;
//!
//! let ds = DataSet::from_columns(vec![
//!     ("nums".to_string(), vec![Value::Int64(1), Value::Null]),
//!     ("durr".to_string(), vec![Value::Int64(5), Value::Int64(10)]),
//! ]);
//! let declarations = HashMap::from([
//!     ("nums".to_string(), ColumnDeclaration::new("numeric")),
//!     ("durr".to_string(), "duration:seconds".parse().unwrap()),
//! ]);
//! let field_ids = HashMap::from([
//!     ("nums".to_string(), "6".to_string()),
//!     ("durr".to_string(), "9".to_string()),
//! ]);
//!
//! let packed = transform(&ds, &declarations).unwrap();
//! let records = assemble(&packed, &field_ids).unwrap();
//! let batches = batch(records, DEFAULT_BATCH_SIZE).unwrap();
//!
//! assert_eq!(batches.len(), 1);
//! assert_eq!(batches[0][0].to_plain_json(), json!({"6": 1, "9": 5000}));
//! assert_eq!(batches[0][1].to_plain_json(), json!({"9": 10000}));
//! ```

pub mod assemble;
pub mod batch;
pub mod declaration;
pub mod transform;

pub use assemble::{assemble, FieldIdMap, Record};
pub use batch::{batch, DEFAULT_BATCH_SIZE};
pub use declaration::{ColumnDeclaration, Declarations};
pub use transform::{
    plan_columns, transform, transform_with, ColumnPlan, PackedColumn, PackedDataSet,
};
