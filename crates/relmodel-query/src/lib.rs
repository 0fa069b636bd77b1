//! Relation query construction for RelModel.
//!
//! `relmodel-query` is the **query construction layer** of the relation
//! engine. It renders the follow-up queries relation variants issue and
//! describes which relations an eager load should fetch.
//!
//! - **`RelationQuery`**: SELECT over a foreign table with optional pivot
//!   join, equality / `IN` constraints, ordering and limit.
//! - **`EagerLoader`**: the set of (possibly nested) relations to load.
//!
//! Queries execute through the `Connection` trait from `relmodel-core`.

pub mod eager;
pub mod query;

pub use eager::{EagerLoader, IncludePath};
pub use query::{ColumnRef, OrderDirection, RelationQuery};
pub use relmodel_core::Dialect;
