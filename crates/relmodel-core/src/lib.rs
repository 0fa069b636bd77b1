//! Core types for RelModel.
//!
//! This crate provides the foundational abstractions the relation engine is
//! built on:
//!
//! - `Value`, `Row` and `Record` for dynamic data
//! - `RelationDescriptor` and `RelationRegistry` for declared relations
//! - `EntityInfo` / `Entity` for entity metadata and relation hooks
//! - `Connection` trait for the query contract
//! - `Outcome` re-export from asupersync for cancel-correct operations
//! - `Cx` context for structured concurrency

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Budget, Cx, Outcome};

pub mod connection;
pub mod descriptor;
pub mod entity;
pub mod error;
pub mod key;
pub mod naming;
pub mod record;
pub mod registry;
pub mod row;
pub mod value;

pub use connection::{Connection, Dialect};
pub use descriptor::{KeySpec, RelationDescriptor, RelationKeys, RelationKind};
pub use entity::{Entity, EntityInfo, RelationAccessor, RelationMutator};
pub use error::{
    ConfigError, EagerLoadError, Error, QueryError, QueryErrorKind, RelationError,
    RelationErrorKind, Result, TypeError,
};
pub use key::RelationKey;
pub use record::{Record, RelationValue};
pub use registry::{RegistryBuilder, RelationRegistry, global, install_global};
pub use row::{ColumnInfo, Row};
pub use value::Value;
