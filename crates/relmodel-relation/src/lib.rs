//! Relation resolution and eager loading for RelModel.
//!
//! `relmodel-relation` turns registered [`RelationDescriptor`]s into
//! executable relations:
//!
//! - [`Relation`] / [`RelationVariant`]: HasOne, HasMany, BelongsTo and
//!   BelongsToMany, each able to constrain its query for one parent or a batch
//! - [`eager_load`]: one query per requested relation per nesting level,
//!   matched back onto the parents
//! - [`RelationContext`]: lazy, memoized single-record access and the
//!   conventional mutator/accessor hooks
//! - [`N1QueryTracker`]: warns when lazy access looks like an N+1 pattern
//!
//! [`RelationDescriptor`]: relmodel_core::RelationDescriptor

pub mod accessor;
pub mod args;
pub mod belongs_to;
pub mod belongs_to_many;
pub mod config;
pub mod eager;
pub mod has_one_or_many;
pub mod keys;
pub mod n1_detection;
pub mod variant;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use accessor::{Property, RelationContext};
pub use args::RelationArgs;
pub use belongs_to::BelongsTo;
pub use belongs_to_many::{BelongsToMany, PIVOT_PREFIX};
pub use config::RelationConfig;
pub use eager::eager_load;
pub use has_one_or_many::HasOneOrMany;
pub use n1_detection::{N1DetectionScope, N1QueryTracker, N1Stats};
pub use variant::{Relation, RelationVariant};
