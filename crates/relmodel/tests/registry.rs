mod common;

use common::{Post, User, blog_registry};
use relmodel::prelude::*;
use relmodel::{RelationErrorKind, RelationKeys};

#[test]
fn entity_declarations_are_registered() {
    let registry = blog_registry();

    assert!(registry.has("User", None));
    assert!(registry.has("User", Some("roles")));
    assert!(!registry.has("User", Some("followers")));
    assert!(!registry.has("Comment", None));

    let posts = registry.get("User", "posts").expect("declared");
    assert_eq!(posts.kind(), RelationKind::HasMany);
    assert_eq!(posts.foreign_entity(), "Post");

    let names: Vec<&str> = registry
        .get_all("User")
        .expect("declared")
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(names, vec!["posts", "profile", "roles"]);
    assert!(registry.get_all("Comment").is_none());

    assert_eq!(registry.entity("RoleUser").map(EntityInfo::table), Some("role_user"));
    assert_eq!(registry.relation_count(), 7);
}

#[test]
fn later_registration_wins() {
    let mut builder = RelationRegistry::builder();
    builder.entity::<User>().expect("valid").entity::<Post>().expect("valid");

    let replacement = RelationDescriptor::has_many(
        "User",
        "posts",
        "Post",
        KeySpec::new().foreign_key("author_id"),
    )
    .unwrap();
    let replaced = builder.register(replacement);
    assert!(replaced.is_some());

    let registry = builder.freeze();
    match registry.get("User", "posts").unwrap().keys() {
        RelationKeys::HasOneOrMany { foreign_key, .. } => {
            assert_eq!(foreign_key.as_deref(), Some("author_id"));
        }
        other => panic!("unexpected keys: {other:?}"),
    }
}

#[test]
fn frozen_registry_is_shared_cheaply() {
    let registry = blog_registry();
    let clone = registry.clone();
    assert_eq!(clone.relation_count(), registry.relation_count());

    let handle = std::thread::spawn(move || clone.has("Post", Some("author")));
    assert!(handle.join().expect("thread finished"));
}

#[test]
fn malformed_declarations_are_rejected() {
    let err = RelationDescriptor::parse("User", "posts", "hasSeveral", "Post", KeySpec::new())
        .unwrap_err();
    assert_eq!(err.relation_kind(), Some(RelationErrorKind::InvalidRelationConfig));

    let err = RelationDescriptor::belongs_to_many("User", "roles", "Role", KeySpec::new())
        .unwrap_err();
    assert_eq!(err.relation_kind(), Some(RelationErrorKind::InvalidRelationConfig));

    let err = RelationDescriptor::has_many(
        "User",
        "posts",
        "Post",
        KeySpec::new().foreign_key("user id; DROP TABLE"),
    )
    .unwrap_err();
    assert_eq!(err.relation_kind(), Some(RelationErrorKind::InvalidRelationConfig));

    let err = RelationDescriptor::has_many("User", "posts", "", KeySpec::new()).unwrap_err();
    assert_eq!(err.relation_kind(), Some(RelationErrorKind::InvalidRelationConfig));
}

#[test]
fn global_registry_installs_once() {
    let first = relmodel::install_global(blog_registry());
    let second = relmodel::install_global(blog_registry());
    assert!(first.is_ok());
    assert!(second.is_err());
    assert!(relmodel::global().is_some_and(|r| r.has("User", Some("posts"))));
}
