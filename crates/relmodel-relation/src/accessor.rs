//! Single-record relation access.
//!
//! [`RelationContext`] ties a frozen [`RelationRegistry`] to a connection and
//! resolves relations for one record at a time: uncached, memoized in the
//! record's relation cache, or handed to the entity's conventional mutator.
//! Batches go through [`RelationContext::load`].

use std::sync::{Mutex, MutexGuard, PoisonError};

use asupersync::{Cx, Outcome};
use relmodel_core::naming::{accessor_name, mutator_name};
use relmodel_core::{
    Connection, Error, Record, RelationError, RelationErrorKind, RelationRegistry, RelationValue,
    Result, Value,
};
use relmodel_query::EagerLoader;

use crate::args::RelationArgs;
use crate::config::RelationConfig;
use crate::eager::eager_load;
use crate::n1_detection::{N1QueryTracker, N1Stats};
use crate::variant::Relation;

/// What a property name resolved to on a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Property<'r> {
    /// A stored attribute
    Attribute(&'r Value),
    /// A declared relation, loaded if it was not already
    Relation(&'r RelationValue),
}

impl<'r> Property<'r> {
    pub fn as_attribute(&self) -> Option<&'r Value> {
        match self {
            Property::Attribute(value) => Some(value),
            Property::Relation(_) => None,
        }
    }

    pub fn as_relation(&self) -> Option<&'r RelationValue> {
        match self {
            Property::Relation(value) => Some(value),
            Property::Attribute(_) => None,
        }
    }
}

/// Resolves relations against a registry and a connection.
///
/// # Example
///
/// ```ignore
/// let ctx = RelationContext::new(registry, conn);
/// let posts = ctx.get_relationship_from_method(&cx, &mut user, "posts").await;
/// ```
pub struct RelationContext<C: Connection> {
    registry: RelationRegistry,
    connection: C,
    config: RelationConfig,
    n1_tracker: Mutex<Option<N1QueryTracker>>,
}

impl<C: Connection> RelationContext<C> {
    pub fn new(registry: RelationRegistry, connection: C) -> Self {
        Self::with_config(registry, connection, RelationConfig::default())
    }

    pub fn with_config(registry: RelationRegistry, connection: C, config: RelationConfig) -> Self {
        let tracker = config
            .n1_threshold
            .map(|threshold| N1QueryTracker::new().with_threshold(threshold));
        Self {
            registry,
            connection,
            config,
            n1_tracker: Mutex::new(tracker),
        }
    }

    pub fn registry(&self) -> &RelationRegistry {
        &self.registry
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn config(&self) -> &RelationConfig {
        &self.config
    }

    // ========================================================================
    // N+1 Detection
    // ========================================================================

    /// Warn once a relation has been lazily loaded `threshold` times.
    pub fn enable_n1_detection(&mut self, threshold: usize) {
        self.config.n1_threshold = Some(threshold);
        *self
            .n1_tracker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) =
            Some(N1QueryTracker::new().with_threshold(threshold));
    }

    pub fn disable_n1_detection(&mut self) {
        self.config.n1_threshold = None;
        *self
            .n1_tracker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn n1_detection_enabled(&self) -> bool {
        self.tracker().is_some()
    }

    /// Lazy-load statistics, when detection is enabled.
    pub fn n1_stats(&self) -> Option<N1Stats> {
        self.tracker().as_ref().map(N1QueryTracker::stats)
    }

    pub fn reset_n1_tracking(&self) {
        if let Some(tracker) = self.tracker().as_mut() {
            tracker.reset();
        }
    }

    fn record_lazy_load(&self, entity: &str, relation: &str) {
        if let Some(tracker) = self.tracker().as_mut() {
            tracker.record_load(entity, relation);
        }
    }

    // Poisoning must not switch detection off.
    fn tracker(&self) -> MutexGuard<'_, Option<N1QueryTracker>> {
        self.n1_tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Relation Resolution
    // ========================================================================

    /// Build the relation declared as `key` on `record`'s entity, without
    /// constraints.
    pub fn get_attribute_relation_method(&self, record: &Record, key: &str) -> Result<Relation> {
        let owner = record.entity();
        let descriptor = self
            .registry
            .get(owner, key)
            .ok_or_else(|| Error::undeclared_relation(owner, key))?;
        let owner_info = self.registry.require_entity(owner, owner, key)?;
        let args = RelationArgs::from_descriptor(descriptor)?;
        Relation::build(args, owner_info, &self.registry, key)
    }

    /// Resolve `key` for `record` with a fresh query. Nothing is cached.
    pub async fn get_relation_results(
        &self,
        cx: &Cx,
        record: &Record,
        key: &str,
    ) -> Outcome<RelationValue, Error> {
        match self.fetch_relation(cx, record, key).await {
            Outcome::Ok((value, _)) => Outcome::Ok(value),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Resolve `key` for `record`, reporting whether a query was issued.
    #[tracing::instrument(level = "debug", skip(self, cx, record), fields(entity = record.entity()))]
    async fn fetch_relation(
        &self,
        cx: &Cx,
        record: &Record,
        key: &str,
    ) -> Outcome<(RelationValue, bool), Error> {
        let mut relation = match self.get_attribute_relation_method(record, key) {
            Ok(relation) => relation,
            Err(e) => return Outcome::Err(e),
        };
        if !relation.add_constraints(record) {
            tracing::debug!(relation = key, "Parent has no relation key; skipping query");
            return Outcome::Ok((relation.default_value(), false));
        }
        if self.config.log_sql {
            let (sql, params) = relation.query().build(self.connection.dialect());
            tracing::debug!(relation = key, sql = %sql, params = params.len(), "Lazy relation query");
        }
        match relation.get_constrained(cx, &self.connection).await {
            Outcome::Ok(value) => Outcome::Ok((value, true)),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Resolve `key` for `record`, caching the result on the record.
    ///
    /// A relation already present in the cache is returned without a query,
    /// even when it holds the empty value.
    pub async fn get_relationship_from_method<'r>(
        &self,
        cx: &Cx,
        record: &'r mut Record,
        key: &str,
    ) -> Outcome<&'r RelationValue, Error> {
        if !record.relation_loaded(key) {
            let (value, queried) = match self.fetch_relation(cx, record, key).await {
                Outcome::Ok(fetched) => fetched,
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            };
            if queried {
                self.record_lazy_load(record.entity(), key);
            }
            record.set_relation(key, value);
        }

        match record.get_relation(key) {
            Some(value) => Outcome::Ok(value),
            None => Outcome::Err(Error::Custom(format!(
                "relation {}::{key} missing from cache after load",
                record.entity()
            ))),
        }
    }

    /// Resolve `key` and hand the value to the entity's `set_<key>` mutator.
    ///
    /// The mutator is checked before any query runs.
    #[tracing::instrument(level = "debug", skip(self, cx, record), fields(entity = record.entity()))]
    pub async fn set_relation_results(
        &self,
        cx: &Cx,
        record: &mut Record,
        key: &str,
    ) -> Outcome<(), Error> {
        let owner = record.entity().to_string();
        if !self.registry.has(&owner, Some(key)) {
            return Outcome::Err(Error::undeclared_relation(owner, key));
        }

        let method = mutator_name(key);
        let Some(mutator) = self
            .registry
            .entity(&owner)
            .and_then(|info| info.mutator(&method))
        else {
            return Outcome::Err(undefined_hook(
                RelationErrorKind::UndefinedRelationMutator,
                &owner,
                key,
                &method,
            ));
        };

        let value = match self.get_relation_results(cx, record, key).await {
            Outcome::Ok(value) => value,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        match mutator(record, value) {
            Ok(()) => Outcome::Ok(()),
            Err(e) => Outcome::Err(e),
        }
    }

    /// Read `key` through the entity's `get_<key>` accessor.
    pub fn get_relation_value<'r>(
        &self,
        record: &'r Record,
        key: &str,
    ) -> Result<Option<&'r RelationValue>> {
        let owner = record.entity();
        if !self.registry.has(owner, Some(key)) {
            return Err(Error::undeclared_relation(owner, key));
        }

        let method = accessor_name(key);
        let accessor = self
            .registry
            .entity(owner)
            .and_then(|info| info.accessor(&method))
            .ok_or_else(|| {
                undefined_hook(
                    RelationErrorKind::UndefinedRelationAccessor,
                    owner,
                    key,
                    &method,
                )
            })?;
        Ok(accessor(record))
    }

    /// Resolve a declared relation through the memoized lazy path.
    pub async fn resolve_relation<'r>(
        &self,
        cx: &Cx,
        record: &'r mut Record,
        key: &str,
    ) -> Outcome<&'r RelationValue, Error> {
        if !self.registry.has(record.entity(), Some(key)) {
            return Outcome::Err(Error::undeclared_relation(record.entity(), key));
        }
        self.get_relationship_from_method(cx, record, key).await
    }

    /// Read a property: a stored attribute wins, otherwise a declared relation
    /// is resolved lazily.
    pub async fn get_attribute_able<'r>(
        &self,
        cx: &Cx,
        record: &'r mut Record,
        key: &str,
    ) -> Outcome<Property<'r>, Error> {
        if record.has_attribute(key) {
            return match record.get_attribute(key) {
                Some(value) => Outcome::Ok(Property::Attribute(value)),
                None => Outcome::Err(Error::Custom(format!("attribute {key} vanished"))),
            };
        }
        match self.resolve_relation(cx, record, key).await {
            Outcome::Ok(value) => Outcome::Ok(Property::Relation(value)),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    // ========================================================================
    // Eager Loading
    // ========================================================================

    /// Eager-load `loader`'s relations onto `records`.
    pub async fn load(
        &self,
        cx: &Cx,
        records: Vec<Record>,
        loader: &EagerLoader,
    ) -> Outcome<Vec<Record>, Error> {
        eager_load(
            cx,
            &self.registry,
            &self.connection,
            &self.config,
            records,
            loader,
        )
        .await
    }
}

fn undefined_hook(kind: RelationErrorKind, owner: &str, key: &str, method: &str) -> Error {
    let what = match kind {
        RelationErrorKind::UndefinedRelationMutator => "mutator",
        _ => "accessor",
    };
    Error::Relation(RelationError::new(
        kind,
        owner,
        Some(key),
        format!("{owner} has no relation {what} '{method}' for '{key}'"),
    ))
}
