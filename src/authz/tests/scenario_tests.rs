//! End-to-end scenario: a small publishing app wired through every layer

mod common;

use anyhow::Result;
use common::engine;
use permit_authz::{DecisionSource, PermitEngine};
use permit_core::{Resource, User};

async fn publishing_app() -> Result<PermitEngine> {
    let engine = engine();

    let report = engine
        .sync_json(
            r#"{
                "super-admin": {},
                "reader": {"permissions": ["posts.view", "comments.create"]},
                "author": {"inherits": "reader", "permissions": ["posts.create", "posts.update"]},
                "editor": {"inherits": "author", "permissions": ["posts.publish", "posts.delete"]}
            }"#,
        )
        .await?;
    anyhow::ensure!(report.is_success(), "sync failed: {:?}", report.failed);

    engine
        .gates()
        .before(|user: &User, ability: &str, _: Option<&Resource>| {
            (ability.starts_with("posts.") && user.attribute("suspended") == Some("true"))
                .then_some(false)
        })
        .define("posts.update", |user: &User, post: Option<&Resource>| {
            post.map(|p| p.is_owned_by(user))
        });

    Ok(engine)
}

#[tokio::test]
async fn test_publishing_workflow() -> Result<()> {
    let engine = publishing_app().await?;

    let author = User::new("ada");
    let editor = User::new("eli");
    let admin = User::new("root");
    engine.assign_role(&author.id, "author").await?;
    engine.assign_role(&editor.id, "editor").await?;
    engine.assign_role(&admin.id, "super-admin").await?;

    let own = Resource::new("post:1").with_attribute("owner_id", "ada");
    let other = Resource::new("post:2").with_attribute("owner_id", "eli");

    // Ownership gate decides updates with a resource
    assert!(engine.can(&author, "posts.update", Some(&own)).await?);
    assert!(!engine.can(&author, "posts.update", Some(&other)).await?);

    // Without a resource the gate defers to the author role
    let decision = engine.check(&author, "posts.update", None).await?;
    assert!(decision.allowed);
    assert_eq!(decision.source, DecisionSource::Role);

    assert!(engine.can(&author, "posts.view", None).await?);
    assert!(!engine.can(&author, "posts.publish", None).await?);
    assert!(engine.has_all_permissions(&editor, &["posts.publish", "posts.view"]).await?);
    assert!(engine.can(&admin, "settings.manage", None).await?);

    Ok(())
}

#[tokio::test]
async fn test_overrides_and_suspension() -> Result<()> {
    let engine = publishing_app().await?;
    let editor = User::new("eli");
    engine.assign_role(&editor.id, "editor").await?;

    // A direct deny outranks the inherited role permission
    engine.deny_permission_to(&editor.id, "posts.delete").await?;
    assert!(!engine.can(&editor, "posts.delete", None).await?);
    assert!(!engine
        .get_permission_names(&editor.id)
        .await?
        .contains(&"posts.delete".to_string()));

    // A direct grant adds an ability no role carries
    engine.permission().slug("stats.view").create().await?;
    engine.give_permission_to(&editor.id, "stats.view").await?;
    assert!(engine.can(&editor, "stats.view", None).await?);

    let suspended = User::new("eli").with_attribute("suspended", "true");
    assert!(!engine.can(&suspended, "posts.view", None).await?);
    assert!(engine.can(&suspended, "comments.create", None).await?);

    Ok(())
}

#[tokio::test]
async fn test_role_queries() -> Result<()> {
    let engine = publishing_app().await?;
    let editor = User::new("eli");
    engine.assign_role(&editor.id, "editor").await?;

    assert_eq!(engine.get_role_names(&editor.id).await?, vec!["editor"]);
    let held: Vec<String> = engine
        .get_user_roles(&editor.id)
        .await?
        .into_iter()
        .map(|role| role.slug)
        .collect();
    assert_eq!(held, vec!["editor", "author", "reader"]);
    assert!(engine.has_role(&editor.id, "reader").await?);
    assert!(engine.has_any_role(&editor.id, &["super-admin", "author"]).await?);
    assert!(!engine.has_all_roles(&editor.id, &["editor", "super-admin"]).await?);
    assert!(!engine.is_super_admin(&editor.id).await?);

    Ok(())
}
