//! The relation variant contract and its closed dispatch enum.

use asupersync::{Cx, Outcome};
use relmodel_core::{
    Connection, EntityInfo, Error, Record, RelationKind, RelationRegistry, RelationValue, Result,
    Row, naming,
};
use relmodel_query::RelationQuery;

use crate::args::RelationArgs;
use crate::belongs_to::BelongsTo;
use crate::belongs_to_many::BelongsToMany;
use crate::has_one_or_many::HasOneOrMany;

/// Behavior shared by every relation kind.
///
/// A variant owns the query over the foreign table. Constraints are added
/// explicitly, either for one parent (lazy access) or for a batch of parents
/// (eager loading), never both.
pub trait RelationVariant {
    fn kind(&self) -> RelationKind;

    /// Metadata of the foreign entity.
    fn related(&self) -> &EntityInfo;

    fn query(&self) -> &RelationQuery;

    fn query_mut(&mut self) -> &mut RelationQuery;

    /// Constrain the query to records related to `parent`.
    ///
    /// Returns `false`, leaving the query untouched, when the parent has no
    /// usable key; such a relation must not be queried.
    fn add_constraints(&mut self, parent: &Record) -> bool;

    /// Constrain the query to records related to any of `parents`.
    ///
    /// Returns `false` when none of the parents has a usable key.
    fn add_eager_constraints(&mut self, parents: &[Record]) -> bool;

    /// Give every parent the empty value for this relation.
    fn init_relation(&self, parents: &mut [Record], relation: &str) {
        for parent in parents.iter_mut() {
            parent.set_relation(relation, self.default_value());
        }
    }

    /// Attach `results` to the parents they belong to.
    fn match_eager(&self, parents: &mut [Record], results: Vec<Record>, relation: &str);

    /// Turn result rows into foreign records.
    fn hydrate(&self, rows: Vec<Row>) -> Vec<Record> {
        rows.into_iter().map(|row| self.related().hydrate(row)).collect()
    }

    /// Value of the relation when nothing is related.
    fn default_value(&self) -> RelationValue {
        if self.kind().is_to_many() {
            RelationValue::empty_many()
        } else {
            RelationValue::none()
        }
    }

    /// Shape the results of a single-parent query.
    fn shape(&self, results: Vec<Record>) -> RelationValue {
        if self.kind().is_to_many() {
            RelationValue::Many(results)
        } else {
            RelationValue::One(results.into_iter().next().map(Box::new))
        }
    }
}

/// A resolved relation, ready to be constrained and executed.
#[derive(Debug, Clone)]
pub enum Relation {
    HasOne(HasOneOrMany),
    HasMany(HasOneOrMany),
    BelongsTo(BelongsTo),
    BelongsToMany(BelongsToMany),
}

impl Relation {
    /// Build the variant for `args`, filling unset keys with conventional
    /// defaults.
    ///
    /// Fails with `InvalidRelationConfig` when the foreign or pivot entity
    /// is not registered.
    pub fn build(
        args: RelationArgs,
        owner: &EntityInfo,
        registry: &RelationRegistry,
        property: &str,
    ) -> Result<Self> {
        let related = registry
            .require_entity(args.foreign_entity(), owner.name(), property)?
            .clone();

        let relation = match args {
            RelationArgs::HasOne {
                foreign_key,
                owner_key,
                ..
            } => Relation::HasOne(HasOneOrMany::has_one(
                related,
                foreign_key
                    .unwrap_or_else(|| naming::foreign_key_for(owner.name(), owner.primary_key())),
                owner_key.unwrap_or_else(|| owner.primary_key().to_string()),
            )),
            RelationArgs::HasMany {
                foreign_key,
                owner_key,
                ..
            } => Relation::HasMany(HasOneOrMany::has_many(
                related,
                foreign_key
                    .unwrap_or_else(|| naming::foreign_key_for(owner.name(), owner.primary_key())),
                owner_key.unwrap_or_else(|| owner.primary_key().to_string()),
            )),
            RelationArgs::BelongsTo {
                relation_alias,
                foreign_key,
                owner_key,
                ..
            } => {
                let foreign_key = foreign_key.unwrap_or_else(|| {
                    naming::foreign_key_for(&relation_alias, related.primary_key())
                });
                let owner_key = owner_key.unwrap_or_else(|| related.primary_key().to_string());
                Relation::BelongsTo(BelongsTo::new(
                    related,
                    foreign_key,
                    owner_key,
                    relation_alias,
                ))
            }
            RelationArgs::BelongsToMany {
                pivot_entity,
                relation_alias,
                foreign_pivot_key,
                owner_pivot_key,
                foreign_key,
                owner_key,
                pivot_columns,
                ..
            } => {
                let pivot = registry
                    .require_entity(&pivot_entity, owner.name(), property)?
                    .clone();
                let foreign_pivot_key = foreign_pivot_key
                    .unwrap_or_else(|| naming::foreign_key_for(owner.name(), owner.primary_key()));
                let owner_pivot_key = owner_pivot_key.unwrap_or_else(|| {
                    naming::foreign_key_for(related.name(), related.primary_key())
                });
                let foreign_key = foreign_key.unwrap_or_else(|| owner.primary_key().to_string());
                let owner_key = owner_key.unwrap_or_else(|| related.primary_key().to_string());
                Relation::BelongsToMany(BelongsToMany::new(
                    related,
                    pivot,
                    relation_alias,
                    foreign_pivot_key,
                    owner_pivot_key,
                    foreign_key,
                    owner_key,
                    pivot_columns,
                ))
            }
        };

        tracing::trace!(
            owner = owner.name(),
            relation = property,
            kind = relation.kind().as_str(),
            related = relation.related().name(),
            "Built relation"
        );
        Ok(relation)
    }

    pub fn as_variant(&self) -> &dyn RelationVariant {
        match self {
            Relation::HasOne(r) | Relation::HasMany(r) => r,
            Relation::BelongsTo(r) => r,
            Relation::BelongsToMany(r) => r,
        }
    }

    pub fn as_variant_mut(&mut self) -> &mut dyn RelationVariant {
        match self {
            Relation::HasOne(r) | Relation::HasMany(r) => r,
            Relation::BelongsTo(r) => r,
            Relation::BelongsToMany(r) => r,
        }
    }

    pub fn kind(&self) -> RelationKind {
        self.as_variant().kind()
    }

    pub fn related(&self) -> &EntityInfo {
        self.as_variant().related()
    }

    pub fn query(&self) -> &RelationQuery {
        self.as_variant().query()
    }

    pub fn query_mut(&mut self) -> &mut RelationQuery {
        self.as_variant_mut().query_mut()
    }

    pub fn add_constraints(&mut self, parent: &Record) -> bool {
        self.as_variant_mut().add_constraints(parent)
    }

    pub fn add_eager_constraints(&mut self, parents: &[Record]) -> bool {
        self.as_variant_mut().add_eager_constraints(parents)
    }

    pub fn init_relation(&self, parents: &mut [Record], relation: &str) {
        self.as_variant().init_relation(parents, relation);
    }

    pub fn match_eager(&self, parents: &mut [Record], results: Vec<Record>, relation: &str) {
        self.as_variant().match_eager(parents, results, relation);
    }

    pub fn default_value(&self) -> RelationValue {
        self.as_variant().default_value()
    }

    /// Resolve the relation for a single parent.
    ///
    /// A parent without a usable key resolves to the empty value without
    /// touching the connection. To-one relations are limited to one row.
    pub async fn get_results<C: Connection>(
        mut self,
        cx: &Cx,
        conn: &C,
        parent: &Record,
    ) -> Outcome<RelationValue, Error> {
        if !self.add_constraints(parent) {
            tracing::debug!(
                entity = parent.entity(),
                kind = self.kind().as_str(),
                "Parent has no relation key; skipping query"
            );
            return Outcome::Ok(self.default_value());
        }
        self.get_constrained(cx, conn).await
    }

    /// Execute a query already constrained to one parent and shape the
    /// result by cardinality.
    pub async fn get_constrained<C: Connection>(
        mut self,
        cx: &Cx,
        conn: &C,
    ) -> Outcome<RelationValue, Error> {
        if !self.kind().is_to_many() {
            self.query_mut().limit(1);
        }

        let rows = match self.query().get(cx, conn).await {
            Outcome::Ok(rows) => rows,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        let variant = self.as_variant();
        Outcome::Ok(variant.shape(variant.hydrate(rows)))
    }

    /// Execute the eager query as constrained so far and hydrate the results.
    pub async fn get_eager<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
    ) -> Outcome<Vec<Record>, Error> {
        match self.query().get(cx, conn).await {
            Outcome::Ok(rows) => Outcome::Ok(self.as_variant().hydrate(rows)),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }
}
