//! # gridquery
//!
//! A server-side tabular query engine for grid-rendering clients: given a
//! declarative request (search keyword, per-column filters, sort order,
//! page window) and a data source, it returns a filtered, ordered,
//! paginated page of rows plus total/filtered counts in a stable JSON
//! envelope.
//!
//! Three source kinds share one engine contract: an in-memory record
//! sequence, a flat SQL select, and a relation-aware SQL select that
//! synthesizes joins from dotted column names.
//!
//! ## Quick Start
//!
//! ```rust
//! use gridquery::prelude::*;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct City {
//!     id: u32,
//!     name: &'static str,
//! }
//!
//! # fn main() -> gridquery::Result<()> {
//! let cities = vec![
//!     City { id: 1, name: "São Paulo" },
//!     City { id: 2, name: "Rio" },
//! ];
//!
//! let request: RequestDescriptor = serde_json::from_value(serde_json::json!({
//!     "draw": 1,
//!     "start": 0,
//!     "length": 10,
//!     "search": { "value": "rio" },
//!     "columns": [ { "data": "id" }, { "data": "name" } ],
//! }))?;
//!
//! let mut engine = MemoryEngine::from_records(cities, request, EngineConfig::default())?;
//! let envelope = make(&mut engine, true)?;
//!
//! assert_eq!(envelope.records_total, 2);
//! assert_eq!(envelope.records_filtered, 1);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod column;
pub mod config;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod helpers;
pub mod relation;
pub mod request;
pub mod response;
pub mod search;
pub mod sql;
pub mod template;
pub mod transform;

pub use builder::SelectQuery;
pub use column::{ColumnContent, ColumnRegistry};
pub use config::{EngineConfig, ErrorPolicy};
pub use dialect::Dialect;
pub use engine::{Engine, MemoryEngine, QueryEngine, QueryExecutor, RelationalEngine, make};
pub use error::{GridError, Result};
pub use helpers::RowMap;
pub use relation::{RelationDef, RelationGraph};
pub use request::RequestDescriptor;
pub use response::ResponseEnvelope;
pub use search::SearchSpec;
pub use sql::Sql;

/// Everything a typical caller needs in scope.
pub mod prelude {
    pub use crate::builder::SelectQuery;
    pub use crate::column::{ColumnContent, ColumnRegistry, RowTemplates};
    pub use crate::config::{EngineConfig, ErrorPolicy, SearchConfig};
    pub use crate::dialect::Dialect;
    pub use crate::engine::{
        Engine, MemoryEngine, QueryEngine, QueryExecutor, RelationalEngine, make,
    };
    pub use crate::error::{GridError, Result};
    pub use crate::helpers::RowMap;
    pub use crate::relation::{JoinSpec, JoinType, RelationDef, RelationGraph, ThroughHop};
    pub use crate::request::{RequestDescriptor, SortDirection};
    pub use crate::response::ResponseEnvelope;
    pub use crate::search::SearchSpec;
    pub use crate::sql::Sql;
    pub use crate::template::{SimpleRenderer, TemplateRenderer};
}
