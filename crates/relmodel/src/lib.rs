//! RelModel - declarative entity relations with batched eager loading.
//!
//! RelModel resolves relations between entity records stored in SQL tables:
//!
//! - Relations are declared once per entity and frozen into a registry
//! - HasOne, HasMany, BelongsTo and BelongsToMany (through a pivot table)
//! - Eager loading issues one query per relation, however many parents
//! - Lazy access is memoized on the record
//! - Lazy access patterns that look like N+1 queries are reported
//!
//! # Quick Start
//!
//! ```ignore
//! use relmodel::prelude::*;
//!
//! struct User;
//!
//! impl Entity for User {
//!     const NAME: &'static str = "User";
//!     const TABLE_NAME: &'static str = "users";
//!
//!     fn relations() -> Result<Vec<RelationDescriptor>> {
//!         Ok(vec![RelationDescriptor::has_many("User", "posts", "Post", KeySpec::new())?])
//!     }
//! }
//!
//! struct Post;
//!
//! impl Entity for Post {
//!     const NAME: &'static str = "Post";
//!     const TABLE_NAME: &'static str = "posts";
//! }
//!
//! async fn example(cx: &Cx, conn: impl Connection, users: Vec<Record>) {
//!     let mut builder = RelationRegistry::builder();
//!     builder.entity::<User>().unwrap().entity::<Post>().unwrap();
//!     let ctx = RelationContext::new(builder.freeze(), conn);
//!
//!     // One query for all users' posts
//!     let users = ctx
//!         .load(cx, users, &EagerLoader::new().include("posts"))
//!         .await
//!         .unwrap();
//!     for user in &users {
//!         println!("{} posts", user.related_many("posts").unwrap().len());
//!     }
//!
//!     // Lazy access, memoized on the record
//!     let mut user = users.into_iter().next().unwrap();
//!     let posts = ctx
//!         .get_relationship_from_method(cx, &mut user, "posts")
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! # Features
//!
//! - **Build-then-freeze registry**: lookups are lock-free and never mutate
//! - **Structured concurrency**: built on asupersync for cancel-correct operations
//! - **Dialect-aware SQL**: identifiers quoted and values bound per dialect

// Re-export all public types from sub-crates
pub use relmodel_core::{
    // asupersync re-exports
    Budget,
    ColumnInfo,
    // Core types
    Connection,
    Cx,
    Dialect,
    EagerLoadError,
    Entity,
    EntityInfo,
    Error,
    KeySpec,
    Outcome,
    QueryError,
    QueryErrorKind,
    Record,
    RegistryBuilder,
    RelationAccessor,
    RelationDescriptor,
    RelationError,
    RelationErrorKind,
    RelationKey,
    RelationKeys,
    RelationKind,
    RelationMutator,
    RelationRegistry,
    RelationValue,
    Result,
    Row,
    Value,
    global,
    install_global,
    naming,
};

pub use relmodel_query::{ColumnRef, EagerLoader, IncludePath, OrderDirection, RelationQuery};

pub use relmodel_relation::{
    BelongsTo, BelongsToMany, HasOneOrMany, N1DetectionScope, N1QueryTracker, N1Stats, Property,
    Relation, RelationArgs, RelationConfig, RelationContext, RelationVariant, eager_load,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        // asupersync
        Budget,
        // Core traits and types
        Connection,
        Cx,
        EagerLoader,
        Entity,
        EntityInfo,
        Error,
        KeySpec,
        Outcome,
        Property,
        Record,
        RelationConfig,
        RelationContext,
        RelationDescriptor,
        RelationKind,
        RelationRegistry,
        RelationValue,
        Result,
        Row,
        Value,
        eager_load,
    };
}
