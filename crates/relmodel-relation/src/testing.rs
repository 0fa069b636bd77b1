//! Test fixtures: a recording mock connection and a small blog schema.
//!
//! Compiled for this crate's unit tests and, behind the `testing` feature,
//! for downstream integration tests.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use asupersync::runtime::RuntimeBuilder;
use asupersync::{Cx, Outcome};
use relmodel_core::{
    Connection, Dialect, Entity, EntityInfo, Error, KeySpec, QueryError, QueryErrorKind, Record,
    RelationDescriptor, RelationRegistry, RelationValue, Result, Row, Value,
};

pub fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

pub fn expect_err<T>(outcome: Outcome<T, Error>) -> Error {
    match outcome {
        Outcome::Err(e) => e,
        Outcome::Ok(_) => panic!("expected an error, got a value"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

pub fn block_on<F: Future>(future: F) -> F::Output {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    rt.block_on(future)
}

enum Reply {
    Rows(Vec<Row>),
    Fail(String),
}

#[derive(Default)]
struct MockState {
    rules: Vec<(String, Reply)>,
    executed: Vec<(String, Vec<Value>)>,
}

/// Records every query and answers from canned rows keyed by a SQL fragment.
///
/// The first rule whose needle occurs in the SQL wins; unmatched queries
/// return no rows.
#[derive(Clone)]
pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
    dialect: Dialect,
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnection {
    pub fn new() -> Self {
        Self::with_dialect(Dialect::Postgres)
    }

    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            dialect,
        }
    }

    pub fn on(&self, needle: &str, rows: Vec<Row>) -> &Self {
        self.state()
            .rules
            .push((needle.to_string(), Reply::Rows(rows)));
        self
    }

    pub fn fail_on(&self, needle: &str, message: &str) -> &Self {
        self.state()
            .rules
            .push((needle.to_string(), Reply::Fail(message.to_string())));
        self
    }

    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.state().executed.clone()
    }

    pub fn query_count(&self) -> usize {
        self.state().executed.len()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connection for MockConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn query(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        let outcome = {
            let mut guard = self.state();
            guard.executed.push((sql.to_string(), params.to_vec()));
            match guard.rules.iter().find(|(needle, _)| sql.contains(needle.as_str())) {
                Some((_, Reply::Rows(rows))) => Outcome::Ok(rows.clone()),
                Some((_, Reply::Fail(message))) => Outcome::Err(Error::Query(QueryError {
                    kind: QueryErrorKind::Database,
                    sql: Some(sql.to_string()),
                    message: message.clone(),
                    source: None,
                })),
                None => Outcome::Ok(Vec::new()),
            }
        };
        async move { outcome }
    }
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    Row::new(
        pairs.iter().map(|(name, _)| (*name).to_string()).collect(),
        pairs.iter().map(|(_, value)| value.clone()).collect(),
    )
}

/// Primary keys of `records`, in order.
pub fn keys(records: &[Record]) -> Vec<Value> {
    records.iter().filter_map(|r| r.get_key().cloned()).collect()
}

pub fn user(id: i64) -> Record {
    Record::new("User", "id").with("id", id)
}

// ============================================================================
// A small blog schema
// ============================================================================

pub struct User;

impl Entity for User {
    const NAME: &'static str = "User";
    const TABLE_NAME: &'static str = "users";

    fn relations() -> Result<Vec<RelationDescriptor>> {
        Ok(vec![
            RelationDescriptor::has_many("User", "posts", "Post", KeySpec::new())?,
            RelationDescriptor::has_one("User", "profile", "Profile", KeySpec::new())?,
            RelationDescriptor::belongs_to_many(
                "User",
                "roles",
                "Role",
                KeySpec::new()
                    .pivot_entity("RoleUser")
                    .pivot_column("granted_at"),
            )?,
        ])
    }

    fn entity_info() -> EntityInfo {
        EntityInfo::new(Self::NAME, Self::TABLE_NAME)
            .with_mutator("posts", set_posts)
            .with_accessor("posts", get_posts)
    }
}

fn set_posts(record: &mut Record, value: RelationValue) -> Result<()> {
    record.set_relation("posts", value);
    Ok(())
}

fn get_posts(record: &Record) -> Option<&RelationValue> {
    record.get_relation("posts")
}

pub struct Post;

impl Entity for Post {
    const NAME: &'static str = "Post";
    const TABLE_NAME: &'static str = "posts";

    fn relations() -> Result<Vec<RelationDescriptor>> {
        Ok(vec![
            RelationDescriptor::belongs_to(
                "Post",
                "author",
                "User",
                KeySpec::new().foreign_key("user_id"),
            )?,
            RelationDescriptor::has_many("Post", "comments", "Comment", KeySpec::new())?,
        ])
    }
}

pub struct Comment;

impl Entity for Comment {
    const NAME: &'static str = "Comment";
    const TABLE_NAME: &'static str = "comments";
}

pub struct Profile;

impl Entity for Profile {
    const NAME: &'static str = "Profile";
    const TABLE_NAME: &'static str = "profiles";
}

pub struct Role;

impl Entity for Role {
    const NAME: &'static str = "Role";
    const TABLE_NAME: &'static str = "roles";
}

pub struct RoleUser;

impl Entity for RoleUser {
    const NAME: &'static str = "RoleUser";
    const TABLE_NAME: &'static str = "role_user";
}

/// Item belongs to an account through `foreign_id`.
pub struct Item;

impl Entity for Item {
    const NAME: &'static str = "Item";
    const TABLE_NAME: &'static str = "items";

    fn relations() -> Result<Vec<RelationDescriptor>> {
        Ok(vec![RelationDescriptor::belongs_to(
            "Item",
            "account",
            "Account",
            KeySpec::new().foreign_key("foreign_id"),
        )?])
    }
}

pub struct Account;

impl Entity for Account {
    const NAME: &'static str = "Account";
    const TABLE_NAME: &'static str = "accounts";
}

/// Team members through `memberships`, every key spelled out.
///
/// The pivot links `memberships.team_slug` to `teams.slug` and
/// `memberships.member_id` to `users.id`.
pub struct Team;

impl Entity for Team {
    const NAME: &'static str = "Team";
    const TABLE_NAME: &'static str = "teams";

    fn relations() -> Result<Vec<RelationDescriptor>> {
        Ok(vec![RelationDescriptor::belongs_to_many(
            "Team",
            "members",
            "User",
            KeySpec::new()
                .pivot_entity("Membership")
                .foreign_pivot_key("team_slug")
                .owner_pivot_key("member_id")
                .foreign_key("slug")
                .owner_key("id"),
        )?])
    }
}

pub struct Membership;

impl Entity for Membership {
    const NAME: &'static str = "Membership";
    const TABLE_NAME: &'static str = "memberships";
}

pub fn blog_registry() -> RelationRegistry {
    let mut builder = RelationRegistry::builder();
    builder
        .entity::<User>()
        .and_then(|b| b.entity::<Post>())
        .and_then(|b| b.entity::<Comment>())
        .and_then(|b| b.entity::<Profile>())
        .and_then(|b| b.entity::<Role>())
        .and_then(|b| b.entity::<RoleUser>())
        .and_then(|b| b.entity::<Item>())
        .and_then(|b| b.entity::<Account>())
        .and_then(|b| b.entity::<Team>())
        .and_then(|b| b.entity::<Membership>())
        .expect("valid entity declarations");
    builder.freeze()
}

pub fn team(id: i64, slug: &str) -> Record {
    Record::new("Team", "id").with("id", id).with("slug", slug)
}
