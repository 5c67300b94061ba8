//! Authorization integration tests: authentication gates, role-hierarchy gates
//! and the ordering guarantee that authentication is checked before any
//! resource lookup can leak existence information.

use anyhow::Result;
use serde_json::{json, Value};

use fieldgate::error::AppError;
use fieldgate::server::{sel, Engine, Request};
use fieldgate::storage::MemoryStore;

fn engine() -> Engine {
    Engine::new(MemoryStore::shared()).expect("shipped schema must compile")
}

/// Create an account and return its session token.
async fn signup(engine: &Engine, username: &str, password: &str) -> Result<String> {
    let req = Request::mutation("new_user", json!({"username": username, "password": password}));
    let out = engine.execute_with_token(None, &req).await?;
    Ok(out.as_str().expect("new_user returns a token").to_string())
}

async fn create_snip(engine: &Engine, token: &str, name: &str, public: bool) -> Result<String> {
    let req = Request::mutation("new_snip", json!({"name": name, "public": public})).select(sel("id"));
    let out = engine.execute_with_token(Some(token), &req).await?;
    Ok(out.get("id").and_then(|v| v.as_str()).expect("snip id").to_string())
}

#[tokio::test]
async fn anonymous_caller_is_rejected_before_any_lookup() -> Result<()> {
    let engine = engine();
    // delete_snip requires authentication and OWNER; the snip does not even exist.
    // An anonymous caller must see the authentication failure, not not_found,
    // so resource existence never leaks through differing error types.
    let req = Request::mutation("delete_snip", json!({"snip_id": "no-such-snip"}));
    let err = engine.execute_with_token(None, &req).await.unwrap_err();
    assert_eq!(err.code_str(), "not_authenticated");
    Ok(())
}

#[tokio::test]
async fn signup_is_refused_for_identified_callers() -> Result<()> {
    let engine = engine();
    let token = signup(&engine, "alice", "pw-alice").await?;
    let req = Request::mutation("new_user", json!({"username": "second", "password": "pw"}));
    let err = engine.execute_with_token(Some(&token), &req).await.unwrap_err();
    assert_eq!(err.code_str(), "already_authenticated");
    Ok(())
}

#[tokio::test]
async fn unverifiable_token_degrades_to_anonymous() -> Result<()> {
    let engine = engine();
    let req = Request::mutation("new_snip", json!({"name": "x", "public": false}));
    let err = engine.execute_with_token(Some("not-a-real-token"), &req).await.unwrap_err();
    assert_eq!(err.code_str(), "not_authenticated", "bad token means anonymous, not a verification error");
    Ok(())
}

#[tokio::test]
async fn editor_satisfies_reader_gates_but_not_owner_gates() -> Result<()> {
    let engine = engine();
    let owner = signup(&engine, "owner-1", "pw").await?;
    let editor = signup(&engine, "editor-1", "pw").await?;
    let snip_id = create_snip(&engine, &owner, "shared-doc", false).await?;

    let grant = Request::mutation(
        "set_user_role",
        json!({"snip_id": snip_id, "username": "editor-1", "role": "EDITOR"}),
    ).select(sel("role"));
    let out = engine.execute_with_token(Some(&owner), &grant).await?;
    assert_eq!(out.get("role"), Some(&json!("EDITOR")));

    // READER-gated field succeeds for the editor (hierarchical policy).
    let read = Request::query("snip", json!({"id": snip_id})).select(sel("name"));
    let out = engine.execute_with_token(Some(&editor), &read).await?;
    assert_eq!(out.get("name"), Some(&json!("shared-doc")));

    // EDITOR-gated mutation succeeds.
    let update = Request::mutation(
        "update_snip",
        json!({"snip_id": snip_id, "query": {"content": "edited"}}),
    ).select(sel("content"));
    let out = engine.execute_with_token(Some(&editor), &update).await?;
    assert_eq!(out.get("content"), Some(&json!("edited")));

    // OWNER-gated mutation fails.
    let delete = Request::mutation("delete_snip", json!({"snip_id": snip_id}));
    let err = engine.execute_with_token(Some(&editor), &delete).await.unwrap_err();
    assert_eq!(err.code_str(), "insufficient_role");
    Ok(())
}

#[tokio::test]
async fn identified_caller_without_assignment_is_insufficient() -> Result<()> {
    let engine = engine();
    let owner = signup(&engine, "owner-2", "pw").await?;
    let stranger = signup(&engine, "stranger-2", "pw").await?;
    let snip_id = create_snip(&engine, &owner, "private-doc", false).await?;

    let update = Request::mutation(
        "update_snip",
        json!({"snip_id": snip_id, "query": {"content": "nope"}}),
    ).select(sel("content"));
    let err = engine.execute_with_token(Some(&stranger), &update).await.unwrap_err();
    assert_eq!(err.code_str(), "insufficient_role");

    // READER-gated fields are closed too on a private snip.
    let read = Request::query("snip", json!({"id": snip_id})).select(sel("name"));
    let err = engine.execute_with_token(Some(&stranger), &read).await.unwrap_err();
    assert_eq!(err.code_str(), "insufficient_role");
    Ok(())
}

#[tokio::test]
async fn owner_passes_every_gate_and_gets_base_values() -> Result<()> {
    let engine = engine();
    let owner = signup(&engine, "owner-3", "pw").await?;
    let snip_id = create_snip(&engine, &owner, "mine", false).await?;

    let read = Request::query("snip", json!({"id": snip_id}))
        .select(sel("name"))
        .select(sel("content"))
        .select(sel("owner").child(sel("username")));
    let out = engine.execute_with_token(Some(&owner), &read).await?;
    assert_eq!(out.get("name"), Some(&json!("mine")));
    assert_eq!(out.get("content"), Some(&json!("")));
    assert_eq!(out.pointer("/owner/username"), Some(&json!("owner-3")));

    let delete = Request::mutation("delete_snip", json!({"snip_id": snip_id}));
    let out = engine.execute_with_token(Some(&owner), &delete).await?;
    assert_eq!(out, Value::String(snip_id));
    Ok(())
}

#[tokio::test]
async fn public_snips_are_readable_by_anyone() -> Result<()> {
    let engine = engine();
    let owner = signup(&engine, "owner-4", "pw").await?;
    let snip_id = create_snip(&engine, &owner, "published", true).await?;

    let read = Request::query("snip", json!({"id": snip_id})).select(sel("name"));
    let out = engine.execute_with_token(None, &read).await?;
    assert_eq!(out.get("name"), Some(&json!("published")),
        "public grants READER even to anonymous callers");

    // READER does not unlock EDITOR-gated mutations, and the authentication
    // gate rejects the anonymous caller first anyway.
    let update = Request::mutation(
        "update_snip",
        json!({"snip_id": snip_id, "query": {"content": "defaced"}}),
    ).select(sel("content"));
    let err = engine.execute_with_token(None, &update).await.unwrap_err();
    assert_eq!(err.code_str(), "not_authenticated");
    Ok(())
}

#[tokio::test]
async fn validate_rejects_bad_credentials_without_leaking_which_part() -> Result<()> {
    let engine = engine();
    signup(&engine, "carol", "right-password").await?;

    let wrong_pw = Request::query("validate", json!({"username": "carol", "password": "wrong"}));
    let err = engine.execute_with_token(None, &wrong_pw).await.unwrap_err();
    assert_eq!(err.code_str(), "invalid_credentials");

    let wrong_user = Request::query("validate", json!({"username": "nobody", "password": "x"}));
    let err2 = engine.execute_with_token(None, &wrong_user).await.unwrap_err();
    assert_eq!(err2, AppError::invalid_credentials(), "unknown user and bad password look identical");
    Ok(())
}
