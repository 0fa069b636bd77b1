//! Eager loading of relations for a batch of parent records.
//!
//! Each requested relation is resolved with a single query covering every
//! parent, then partitioned back onto the parents. Nested include paths
//! repeat this one level down, over all children of all parents.

use std::future::Future;
use std::pin::Pin;

use asupersync::{Cx, Outcome};
use relmodel_core::{
    Connection, EagerLoadError, Error, Record, RelationRegistry, RelationValue,
};
use relmodel_query::{EagerLoader, IncludePath};

use crate::args::RelationArgs;
use crate::config::RelationConfig;
use crate::variant::Relation;

type LoadFuture<'a> = Pin<Box<dyn Future<Output = Outcome<(), Error>> + Send + 'a>>;

/// Load every relation in `loader` onto `parents`.
///
/// Returns the same parents in the same order. Every requested relation is
/// present in each parent's cache afterwards, set to the empty value when
/// nothing matched. The first failure aborts the whole call.
#[tracing::instrument(level = "debug", skip_all, fields(parents = parents.len()))]
pub async fn eager_load<C: Connection>(
    cx: &Cx,
    registry: &RelationRegistry,
    conn: &C,
    config: &RelationConfig,
    mut parents: Vec<Record>,
    loader: &EagerLoader,
) -> Outcome<Vec<Record>, Error> {
    if parents.is_empty() || !loader.has_includes() {
        tracing::trace!("Nothing to eager load");
        return Outcome::Ok(parents);
    }

    match load_paths(cx, registry, conn, config, &mut parents, loader.includes()).await {
        Outcome::Ok(()) => Outcome::Ok(parents),
        Outcome::Err(e) => Outcome::Err(e),
        Outcome::Cancelled(r) => Outcome::Cancelled(r),
        Outcome::Panicked(p) => Outcome::Panicked(p),
    }
}

fn load_paths<'a, C: Connection>(
    cx: &'a Cx,
    registry: &'a RelationRegistry,
    conn: &'a C,
    config: &'a RelationConfig,
    parents: &'a mut [Record],
    paths: &'a [IncludePath],
) -> LoadFuture<'a> {
    Box::pin(async move {
        for path in paths {
            if parents.is_empty() {
                return Outcome::Ok(());
            }
            let owner = parents[0].entity().to_string();

            match load_relation(cx, registry, conn, config, parents, &path.relationship).await {
                Outcome::Ok(()) => {}
                Outcome::Err(e) => {
                    return Outcome::Err(wrap_error(&owner, &path.relationship, e));
                }
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }

            if path.nested.is_empty() {
                continue;
            }

            let (mut children, spans) = take_children(parents, &path.relationship);
            let outcome =
                load_paths(cx, registry, conn, config, &mut children, &path.nested).await;
            // Children go back before any error is reported.
            restore_children(parents, &path.relationship, children, spans);
            match outcome {
                Outcome::Ok(()) => {}
                other => return other,
            }
        }
        Outcome::Ok(())
    })
}

async fn load_relation<C: Connection>(
    cx: &Cx,
    registry: &RelationRegistry,
    conn: &C,
    config: &RelationConfig,
    parents: &mut [Record],
    name: &str,
) -> Outcome<(), Error> {
    let owner = parents[0].entity().to_string();

    let mut relation = match resolve(registry, &owner, name) {
        Ok(relation) => relation,
        Err(e) => return Outcome::Err(e),
    };

    relation.init_relation(parents, name);
    if !relation.add_eager_constraints(parents) {
        tracing::debug!(
            entity = %owner,
            relation = name,
            query_count = 0,
            "No parent has a relation key; skipping query"
        );
        return Outcome::Ok(());
    }

    if config.log_sql {
        let (sql, params) = relation.query().build(conn.dialect());
        tracing::debug!(entity = %owner, relation = name, sql = %sql, params = params.len(), "Eager relation query");
    }

    let results = match relation.get_eager(cx, conn).await {
        Outcome::Ok(results) => results,
        Outcome::Err(e) => return Outcome::Err(e),
        Outcome::Cancelled(r) => return Outcome::Cancelled(r),
        Outcome::Panicked(p) => return Outcome::Panicked(p),
    };

    tracing::debug!(
        entity = %owner,
        relation = name,
        parents = parents.len(),
        related = results.len(),
        query_count = 1,
        "Eager loaded relation"
    );
    relation.match_eager(parents, results, name);
    Outcome::Ok(())
}

fn resolve(registry: &RelationRegistry, owner: &str, name: &str) -> relmodel_core::Result<Relation> {
    let descriptor = registry
        .get(owner, name)
        .ok_or_else(|| Error::undeclared_relation(owner, name))?;
    let owner_info = registry.require_entity(owner, owner, name)?;
    let args = RelationArgs::from_descriptor(descriptor)?;
    Relation::build(args, owner_info, registry, name)
}

/// Wrap a failure with the relation it happened in. Failures already wrapped
/// by a nested level keep their innermost context.
fn wrap_error(owner: &str, relation: &str, error: Error) -> Error {
    match error {
        Error::EagerLoad(_) => error,
        other => {
            tracing::warn!(entity = owner, relation, error = %other, "Eager load failed");
            Error::EagerLoad(EagerLoadError {
                owner: owner.to_string(),
                relation: relation.to_string(),
                source: Box::new(other),
            })
        }
    }
}

/// Where one parent's children sit in the flattened child list.
struct ChildSpan {
    to_many: bool,
    len: usize,
}

/// Move the loaded children of `relation` out of every parent into one list.
fn take_children(parents: &mut [Record], relation: &str) -> (Vec<Record>, Vec<ChildSpan>) {
    let mut children = Vec::new();
    let mut spans = Vec::with_capacity(parents.len());
    for parent in parents.iter_mut() {
        let value = parent.unset_relation(relation);
        let to_many = value.as_ref().is_none_or(RelationValue::is_many);
        let records = value.map(RelationValue::into_records).unwrap_or_default();
        spans.push(ChildSpan {
            to_many,
            len: records.len(),
        });
        children.extend(records);
    }
    (children, spans)
}

fn restore_children(
    parents: &mut [Record],
    relation: &str,
    children: Vec<Record>,
    spans: Vec<ChildSpan>,
) {
    let mut children = children.into_iter();
    for (parent, span) in parents.iter_mut().zip(spans) {
        let records: Vec<Record> = children.by_ref().take(span.len).collect();
        let value = if span.to_many {
            RelationValue::Many(records)
        } else {
            RelationValue::One(records.into_iter().next().map(Box::new))
        };
        parent.set_relation(relation, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        MockConnection, block_on, blog_registry, expect_err, row, unwrap_outcome, user,
    };
    use relmodel_core::{RelationErrorKind, Value};

    fn load(conn: &MockConnection, parents: Vec<Record>, loader: &EagerLoader) -> Outcome<Vec<Record>, Error> {
        let registry = blog_registry();
        let config = RelationConfig::default();
        let cx = Cx::for_testing();
        block_on(async { eager_load(&cx, &registry, conn, &config, parents, loader).await })
    }

    fn ids(records: &[Record]) -> Vec<Value> {
        records.iter().filter_map(|r| r.get_key().cloned()).collect()
    }

    #[test]
    fn has_many_is_loaded_with_one_query() {
        let conn = MockConnection::new();
        conn.on(
            "FROM \"posts\"",
            vec![
                row(&[("id", Value::BigInt(100)), ("user_id", Value::BigInt(5))]),
                row(&[("id", Value::BigInt(101)), ("user_id", Value::BigInt(5))]),
                row(&[("id", Value::BigInt(102)), ("user_id", Value::BigInt(6))]),
            ],
        );

        let users = unwrap_outcome(load(
            &conn,
            vec![user(5), user(6), user(7)],
            &EagerLoader::new().include("posts"),
        ));

        assert_eq!(conn.query_count(), 1);
        assert_eq!(ids(&users), vec![Value::BigInt(5), Value::BigInt(6), Value::BigInt(7)]);
        assert_eq!(
            ids(users[0].related_many("posts").unwrap()),
            vec![Value::BigInt(100), Value::BigInt(101)]
        );
        assert_eq!(ids(users[1].related_many("posts").unwrap()), vec![Value::BigInt(102)]);
        assert!(users[2].related_many("posts").unwrap().is_empty());
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn nested_eager_load_future_is_send() {
        let conn = MockConnection::new();
        let registry = blog_registry();
        let config = RelationConfig::default();
        let cx = Cx::for_testing();
        let loader = EagerLoader::new().include("posts.comments").include("roles");

        let future = eager_load(&cx, &registry, &conn, &config, vec![user(1)], &loader);
        assert_send(&future);
        let users = unwrap_outcome(block_on(future));
        assert!(users[0].relation_loaded("roles"));
    }

    #[test]
    fn empty_parents_issue_no_queries() {
        let conn = MockConnection::new();
        let users = unwrap_outcome(load(&conn, Vec::new(), &EagerLoader::new().include("posts")));
        assert!(users.is_empty());
        assert_eq!(conn.query_count(), 0);
    }

    #[test]
    fn parents_without_keys_skip_the_query() {
        let conn = MockConnection::new();
        let posts = vec![Record::new("Post", "id").with("id", 1i64)];
        let posts = unwrap_outcome(load(&conn, posts, &EagerLoader::new().include("author")));
        assert_eq!(conn.query_count(), 0);
        assert_eq!(posts[0].get_relation("author"), Some(&RelationValue::none()));
    }

    #[test]
    fn undeclared_relation_is_wrapped() {
        let conn = MockConnection::new();
        let err = expect_err(load(&conn, vec![user(1)], &EagerLoader::new().include("friends")));
        match &err {
            Error::EagerLoad(e) => {
                assert_eq!(e.owner, "User");
                assert_eq!(e.relation, "friends");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.relation_kind(), Some(RelationErrorKind::UndeclaredRelation));
    }

    #[test]
    fn first_failure_aborts_remaining_relations() {
        let conn = MockConnection::new();
        conn.fail_on("FROM \"posts\"", "connection reset");
        let loader = EagerLoader::new().include("posts").include("profile");
        let err = expect_err(load(&conn, vec![user(1)], &loader));

        assert_eq!(conn.query_count(), 1);
        match err {
            Error::EagerLoad(e) => {
                assert_eq!(e.relation, "posts");
                assert!(matches!(*e.source, Error::Query(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn nested_paths_load_one_query_per_level() {
        let conn = MockConnection::new();
        conn.on(
            "FROM \"posts\"",
            vec![
                row(&[("id", Value::BigInt(10)), ("user_id", Value::BigInt(1))]),
                row(&[("id", Value::BigInt(11)), ("user_id", Value::BigInt(2))]),
            ],
        );
        conn.on(
            "FROM \"comments\"",
            vec![
                row(&[("id", Value::BigInt(900)), ("post_id", Value::BigInt(11))]),
                row(&[("id", Value::BigInt(901)), ("post_id", Value::BigInt(11))]),
            ],
        );

        let users = unwrap_outcome(load(
            &conn,
            vec![user(1), user(2)],
            &EagerLoader::new().include("posts.comments"),
        ));

        assert_eq!(conn.query_count(), 2);
        let (sql, params) = &conn.executed()[1];
        assert!(sql.ends_with("WHERE \"comments\".\"post_id\" IN ($1, $2)"));
        assert_eq!(params, &vec![Value::BigInt(10), Value::BigInt(11)]);

        let first = &users[0].related_many("posts").unwrap()[0];
        assert!(first.related_many("comments").unwrap().is_empty());
        let second = &users[1].related_many("posts").unwrap()[0];
        assert_eq!(
            ids(second.related_many("comments").unwrap()),
            vec![Value::BigInt(900), Value::BigInt(901)]
        );
    }

    #[test]
    fn children_round_trip_through_flattening() {
        let mut users = vec![
            Record::new("User", "id").with("id", 1i64),
            Record::new("User", "id").with("id", 2i64),
            Record::new("User", "id").with("id", 3i64),
        ];
        users[0].set_relation(
            "posts",
            RelationValue::Many(vec![
                Record::new("Post", "id").with("id", 10i64),
                Record::new("Post", "id").with("id", 11i64),
            ]),
        );
        users[1].set_relation("posts", RelationValue::empty_many());
        users[2].set_relation(
            "posts",
            RelationValue::Many(vec![Record::new("Post", "id").with("id", 12i64)]),
        );

        let (mut children, spans) = take_children(&mut users, "posts");
        assert_eq!(children.len(), 3);
        assert!(!users[0].relation_loaded("posts"));
        for child in &mut children {
            child.set_relation("comments", RelationValue::empty_many());
        }

        restore_children(&mut users, "posts", children, spans);
        assert_eq!(users[0].related_many("posts").unwrap().len(), 2);
        assert!(users[1].related_many("posts").unwrap().is_empty());
        let post = &users[2].related_many("posts").unwrap()[0];
        assert_eq!(post.get_key(), Some(&relmodel_core::Value::BigInt(12)));
        assert!(post.relation_loaded("comments"));
    }

    #[test]
    fn to_one_children_keep_their_shape() {
        let mut posts = vec![
            Record::new("Post", "id").with("id", 1i64),
            Record::new("Post", "id").with("id", 2i64),
        ];
        posts[0].set_relation("author", RelationValue::one(Record::new("User", "id").with("id", 5i64)));
        posts[1].set_relation("author", RelationValue::none());

        let (children, spans) = take_children(&mut posts, "author");
        assert_eq!(children.len(), 1);
        restore_children(&mut posts, "author", children, spans);
        assert!(posts[0].related_one("author").unwrap().is_some());
        assert_eq!(posts[1].get_relation("author"), Some(&RelationValue::none()));
    }

    #[test]
    fn nested_failures_are_not_wrapped_twice() {
        let inner = wrap_error("Post", "comments", Error::Custom("boom".into()));
        let outer = wrap_error("User", "posts", inner);
        match outer {
            Error::EagerLoad(e) => {
                assert_eq!(e.owner, "Post");
                assert_eq!(e.relation, "comments");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
