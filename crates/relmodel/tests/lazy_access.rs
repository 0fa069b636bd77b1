mod common;

use common::{MockConnection, block_on, blog_registry, expect_err, keys, row, unwrap_outcome, user};
use relmodel::prelude::*;
use relmodel::RelationErrorKind;

fn context(conn: &MockConnection) -> RelationContext<MockConnection> {
    RelationContext::new(blog_registry(), conn.clone())
}

fn seed_posts(conn: &MockConnection) {
    conn.on(
        "FROM \"posts\"",
        vec![
            row(&[("id", Value::BigInt(100)), ("user_id", Value::BigInt(5))]),
            row(&[("id", Value::BigInt(101)), ("user_id", Value::BigInt(5))]),
        ],
    );
}

#[test]
fn lazy_access_twice_queries_once() {
    let conn = MockConnection::new();
    seed_posts(&conn);
    let ctx = context(&conn);
    let cx = Cx::for_testing();
    let mut record = user(5);

    block_on(async {
        let posts = unwrap_outcome(ctx.get_relationship_from_method(&cx, &mut record, "posts").await);
        assert_eq!(keys(posts.as_slice()), vec![Value::BigInt(100), Value::BigInt(101)]);
        unwrap_outcome(ctx.get_relationship_from_method(&cx, &mut record, "posts").await);
    });

    assert_eq!(conn.query_count(), 1);
    assert!(record.relation_loaded("posts"));
}

#[test]
fn eager_loaded_relation_is_not_reloaded_lazily() {
    let conn = MockConnection::new();
    seed_posts(&conn);
    let ctx = context(&conn);
    let cx = Cx::for_testing();

    block_on(async {
        let mut users = unwrap_outcome(
            ctx.load(&cx, vec![user(5)], &EagerLoader::new().include("posts"))
                .await,
        );
        let posts =
            unwrap_outcome(ctx.get_relationship_from_method(&cx, &mut users[0], "posts").await);
        assert_eq!(posts.len(), 2);
    });
    assert_eq!(conn.query_count(), 1);
}

#[test]
fn belongs_to_lazy_access() {
    let conn = MockConnection::new();
    conn.on("FROM \"users\"", vec![row(&[("id", Value::BigInt(5))])]);
    let ctx = context(&conn);
    let cx = Cx::for_testing();
    let mut post = Record::new("Post", "id").with("id", 100i64).with("user_id", 5i64);
    let mut orphan = Record::new("Post", "id").with("id", 101i64);

    block_on(async {
        let author = unwrap_outcome(ctx.resolve_relation(&cx, &mut post, "author").await);
        assert!(matches!(author, RelationValue::One(Some(_))));
        let author = unwrap_outcome(ctx.resolve_relation(&cx, &mut orphan, "author").await);
        assert_eq!(author, &RelationValue::none());
    });

    assert_eq!(conn.query_count(), 1);
    let (sql, params) = &conn.executed()[0];
    assert_eq!(
        sql,
        "SELECT \"users\".* FROM \"users\" WHERE \"users\".\"id\" = $1 LIMIT 1"
    );
    assert_eq!(params, &vec![Value::BigInt(5)]);
}

#[test]
fn property_dispatch_prefers_attributes() {
    let conn = MockConnection::new();
    seed_posts(&conn);
    let ctx = context(&conn);
    let cx = Cx::for_testing();
    let mut record = user(5).with("name", "Alice");

    block_on(async {
        let name = unwrap_outcome(ctx.get_attribute_able(&cx, &mut record, "name").await);
        assert_eq!(name, Property::Attribute(&Value::Text("Alice".into())));
        assert_eq!(conn.query_count(), 0);

        let posts = unwrap_outcome(ctx.get_attribute_able(&cx, &mut record, "posts").await);
        assert_eq!(posts.as_relation().map(RelationValue::len), Some(2));

        let err = expect_err(ctx.get_attribute_able(&cx, &mut record, "nickname").await);
        assert_eq!(err.relation_kind(), Some(RelationErrorKind::UndeclaredRelation));
    });
    assert_eq!(conn.query_count(), 1);
}

#[test]
fn mutator_hook_receives_value() {
    let conn = MockConnection::new();
    seed_posts(&conn);
    let ctx = context(&conn);
    let cx = Cx::for_testing();
    let mut record = user(5);

    block_on(async { unwrap_outcome(ctx.set_relation_results(&cx, &mut record, "posts").await) });

    assert_eq!(record.related_many("posts").unwrap().len(), 2);
    assert_eq!(
        ctx.get_relation_value(&record, "posts").unwrap().map(RelationValue::len),
        Some(2)
    );
}

#[test]
fn missing_hooks_are_reported() {
    let conn = MockConnection::new();
    let ctx = context(&conn);
    let cx = Cx::for_testing();
    let mut record = user(5);

    let err = block_on(async { expect_err(ctx.set_relation_results(&cx, &mut record, "profile").await) });
    assert_eq!(err.relation_kind(), Some(RelationErrorKind::UndefinedRelationMutator));
    assert_eq!(conn.query_count(), 0);

    let err = ctx.get_relation_value(&record, "roles").unwrap_err();
    assert_eq!(err.relation_kind(), Some(RelationErrorKind::UndefinedRelationAccessor));

    let err = ctx.get_relation_value(&record, "followers").unwrap_err();
    assert_eq!(err.relation_kind(), Some(RelationErrorKind::UndeclaredRelation));
}

#[test]
fn typed_accessors_reject_wrong_shape() {
    let mut record = user(5);
    record.set_relation("profile", RelationValue::none());
    record.set_relation("posts", RelationValue::empty_many());

    let err = record.related_many("profile").unwrap_err();
    assert_eq!(err.relation_kind(), Some(RelationErrorKind::RelationTypeMismatch));
    let err = record.related_one("posts").unwrap_err();
    assert_eq!(err.relation_kind(), Some(RelationErrorKind::RelationTypeMismatch));
}

#[test]
fn n1_pattern_is_counted() {
    let conn = MockConnection::new();
    let ctx = RelationContext::with_config(
        blog_registry(),
        conn.clone(),
        RelationConfig::new().n1_threshold(3).log_sql(true),
    );
    let cx = Cx::for_testing();
    let mut users: Vec<Record> = (1..=4).map(user).collect();

    block_on(async {
        for record in &mut users {
            unwrap_outcome(ctx.get_relationship_from_method(&cx, record, "posts").await);
        }
    });

    let stats = ctx.n1_stats().expect("detection enabled");
    assert_eq!(stats.total_loads, 4);
    assert_eq!(stats.relationships_loaded, 1);
    assert_eq!(stats.potential_n1, 1);
    assert_eq!(conn.query_count(), 4);
}

#[test]
fn loaded_graph_serializes_to_json() {
    let conn = MockConnection::new();
    seed_posts(&conn);
    let ctx = context(&conn);
    let cx = Cx::for_testing();

    let users = block_on(async {
        unwrap_outcome(
            ctx.load(&cx, vec![user(5)], &EagerLoader::new().include("posts"))
                .await,
        )
    });

    assert_eq!(
        users[0].to_json(),
        serde_json::json!({
            "id": 5,
            "posts": [
                {"id": 100, "user_id": 5},
                {"id": 101, "user_id": 5},
            ],
        })
    );
}
