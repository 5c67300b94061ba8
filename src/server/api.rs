//! The snip-sharing schema: objects, per-field annotations and the root
//! fetch functions the directive compiler wraps. Entity fields carry their
//! behavior declaratively; nothing below reaches around the guard chain.

use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::identity::SessionManager;
use crate::model::{role_on, Role, Snip, User};
use crate::schema::{resolver, FieldDef, ObjectDef, ResolveRequest, SchemaDef, TypeShape};
use crate::security::{hash_password, verify_password};
use crate::storage::{compact_filter, EntityKind, SharedStore, Store};

fn entity(kind: EntityKind, required: bool) -> TypeShape {
    TypeShape::Entity { kind, required }
}

async fn find_user_by_username(store: &SharedStore, username: &str) -> AppResult<Option<Value>> {
    let mut filter = Map::new();
    filter.insert("username".into(), Value::String(username.to_string()));
    Ok(store.find(EntityKind::User, &filter).await?.into_iter().next())
}

async fn me(req: ResolveRequest) -> AppResult<Value> {
    match req.ctx.subject.as_deref() {
        Some(id) => Ok(req.store.find_by_id(EntityKind::User, id).await?.unwrap_or(Value::Null)),
        None => Ok(Value::Null),
    }
}

async fn user(req: ResolveRequest) -> AppResult<Value> {
    let username = req.arg_str("username")?;
    Ok(find_user_by_username(&req.store, &username).await?.unwrap_or(Value::Null))
}

async fn snip(req: ResolveRequest) -> AppResult<Value> {
    let id = req.arg_str("id")?;
    Ok(req.store.find_by_id(EntityKind::Snip, &id).await?.unwrap_or(Value::Null))
}

/// Equality filter on name/public, then a per-snip READER check and tag
/// overlap, evaluated concurrently. Content search is deliberately not
/// supported; it would be prohibitively expensive on this store.
async fn snips(req: ResolveRequest) -> AppResult<Value> {
    let query = req.arg_object("query")?;
    let mut filter = Map::new();
    for key in ["name", "public"] {
        if let Some(v) = query.get(key) {
            filter.insert(key.to_string(), v.clone());
        }
    }
    let filter = compact_filter(&filter);
    let wanted_tags: Option<Vec<String>> = match query.get("tags") {
        Some(Value::Array(ts)) => Some(
            ts.iter()
                .map(|t| t.as_str().map(|s| s.to_string())
                    .ok_or_else(|| AppError::input("tags must be strings")))
                .collect::<AppResult<Vec<_>>>()?,
        ),
        Some(Value::Null) | None => None,
        Some(_) => return Err(AppError::input("tags must be an array of strings")),
    };

    let docs = req.store.find(EntityKind::Snip, &filter).await?;
    let checks = docs.into_iter().map(|doc| {
        let store = req.store.clone();
        let subject = req.ctx.subject.clone();
        let wanted = wanted_tags.clone();
        async move {
            let parsed = Snip::from_doc(&doc)?;
            let readable = role_on(&store, &parsed, subject.as_deref()).await?
                .map(|r| r.satisfies(Role::Reader))
                .unwrap_or(false);
            let tagged = wanted
                .map(|ts| ts.iter().any(|t| parsed.tags.contains(t)))
                .unwrap_or(true);
            Ok::<Option<Value>, AppError>((readable && tagged).then_some(doc))
        }
    });
    let kept: Vec<Value> = join_all(checks).await
        .into_iter()
        .collect::<AppResult<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect();
    Ok(Value::Array(kept))
}

async fn new_snip(req: ResolveRequest) -> AppResult<Value> {
    let name = req.arg_str("name")?;
    let public = req.arg_bool("public")?;
    // The authentication gate has already run; this is the invariant restated.
    let owner_id = req.ctx.subject.clone().ok_or_else(AppError::not_authenticated)?;

    let mut fields = Map::new();
    fields.insert("name".into(), Value::String(name));
    fields.insert("public".into(), Value::Bool(public));
    fields.insert("content".into(), Value::String(String::new()));
    fields.insert("owner_id".into(), Value::String(owner_id.clone()));
    fields.insert("role_ids".into(), Value::Array(Vec::new()));
    fields.insert("tags".into(), Value::Array(Vec::new()));
    let doc = req.store.create(EntityKind::Snip, fields).await?;
    let snip_id = doc.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();

    if let Some(owner_doc) = req.store.find_by_id(EntityKind::User, &owner_id).await? {
        let mut owner = User::from_doc(&owner_doc)?;
        owner.snip_ids.push(snip_id.clone());
        let mut upd = Map::new();
        upd.insert("snip_ids".into(), serde_json::to_value(&owner.snip_ids).unwrap_or_default());
        req.store.update(EntityKind::User, &owner_id, upd).await?;
    }
    info!(target: "fieldgate", "snip.create id={} owner={}", snip_id, owner_id);
    Ok(doc)
}

/// Replace any existing assignment for (user, snip); at most one survives.
async fn set_user_role(req: ResolveRequest) -> AppResult<Value> {
    let snip_id = req.arg_str("snip_id")?;
    let username = req.arg_str("username")?;
    let role: Role = req.arg_str("role")?.parse()?;

    let target_doc = find_user_by_username(&req.store, &username).await?
        .ok_or_else(|| AppError::not_found(format!("user '{}' not found", username)))?;
    let target = User::from_doc(&target_doc)?;
    let snip_doc = req.store.find_by_id(EntityKind::Snip, &snip_id).await?
        .ok_or_else(|| AppError::not_found(format!("snip {} not found", snip_id)))?;
    let mut governed = Snip::from_doc(&snip_doc)?;

    let mut filter = Map::new();
    filter.insert("snip_id".into(), Value::String(snip_id.clone()));
    filter.insert("user_id".into(), Value::String(target.id.clone()));
    for stale in req.store.find(EntityKind::UserRole, &filter).await? {
        if let Some(stale_id) = stale.get("id").and_then(|v| v.as_str()) {
            governed.role_ids.retain(|r| r != stale_id);
            req.store.delete(EntityKind::UserRole, stale_id).await?;
        }
    }

    let mut fields = Map::new();
    fields.insert("user_id".into(), Value::String(target.id.clone()));
    fields.insert("snip_id".into(), Value::String(snip_id.clone()));
    fields.insert("role".into(), Value::String(role.as_str().to_string()));
    let assignment = req.store.create(EntityKind::UserRole, fields).await?;
    if let Some(aid) = assignment.get("id").and_then(|v| v.as_str()) {
        governed.role_ids.push(aid.to_string());
    }
    let mut upd = Map::new();
    upd.insert("role_ids".into(), serde_json::to_value(&governed.role_ids).unwrap_or_default());
    req.store.update(EntityKind::Snip, &snip_id, upd).await?;
    info!(target: "fieldgate", "role.set snip={} user={} role={}", snip_id, target.id, role);
    Ok(assignment)
}

async fn update_snip(req: ResolveRequest) -> AppResult<Value> {
    let snip_id = req.arg_str("snip_id")?;
    let query = req.arg_object("query")?;
    let mut fields = Map::new();
    for key in ["name", "content", "public", "tags"] {
        if let Some(v) = query.get(key) {
            fields.insert(key.to_string(), v.clone());
        }
    }
    let fields = compact_filter(&fields);
    req.store.update(EntityKind::Snip, &snip_id, fields).await
}

async fn delete_snip(req: ResolveRequest) -> AppResult<Value> {
    let snip_id = req.arg_str("snip_id")?;
    let snip_doc = req.store.find_by_id(EntityKind::Snip, &snip_id).await?
        .ok_or_else(|| AppError::not_found(format!("snip {} not found", snip_id)))?;
    let doomed = Snip::from_doc(&snip_doc)?;

    if let Some(owner_doc) = req.store.find_by_id(EntityKind::User, &doomed.owner_id).await? {
        let mut owner = User::from_doc(&owner_doc)?;
        owner.snip_ids.retain(|id| id != &snip_id);
        let mut upd = Map::new();
        upd.insert("snip_ids".into(), serde_json::to_value(&owner.snip_ids).unwrap_or_default());
        req.store.update(EntityKind::User, &doomed.owner_id, upd).await?;
    }
    let mut filter = Map::new();
    filter.insert("snip_id".into(), Value::String(snip_id.clone()));
    for assignment in req.store.find(EntityKind::UserRole, &filter).await? {
        if let Some(aid) = assignment.get("id").and_then(|v| v.as_str()) {
            req.store.delete(EntityKind::UserRole, aid).await?;
        }
    }
    req.store.delete(EntityKind::Snip, &snip_id).await?;
    info!(target: "fieldgate", "snip.delete id={}", snip_id);
    Ok(Value::String(snip_id))
}

/// Build the declared snip schema. Credential fields capture the session
/// manager so issued tokens come from the same collaborator that verifies them.
pub fn snip_schema(sessions: Arc<SessionManager>) -> SchemaDef {
    let validate = {
        let sessions = sessions.clone();
        resolver(move |req: ResolveRequest| {
            let sessions = sessions.clone();
            async move {
                let username = req.arg_str("username")?;
                let password = req.arg_str("password")?;
                let doc = find_user_by_username(&req.store, &username).await?
                    .ok_or_else(AppError::invalid_credentials)?;
                let account = User::from_doc(&doc)?;
                if !verify_password(&account.password_hash, &password) {
                    return Err(AppError::invalid_credentials());
                }
                Ok(Value::String(sessions.issue(&account.id)?.token))
            }
        })
    };

    let new_user = {
        let sessions = sessions.clone();
        resolver(move |req: ResolveRequest| {
            let sessions = sessions.clone();
            async move {
                let username = req.arg_str("username")?;
                let password = req.arg_str("password")?;
                if find_user_by_username(&req.store, &username).await?.is_some() {
                    return Err(AppError::input(format!("username '{}' is already taken", username)));
                }
                let mut fields = Map::new();
                fields.insert("username".into(), Value::String(username.clone()));
                fields.insert("password_hash".into(), Value::String(hash_password(&password)?));
                fields.insert("snip_ids".into(), Value::Array(Vec::new()));
                let doc = req.store.create(EntityKind::User, fields).await?;
                let account = User::from_doc(&doc)?;
                info!(target: "fieldgate", "user.create id={} username={}", account.id, username);
                Ok(Value::String(sessions.issue(&account.id)?.token))
            }
        })
    };

    SchemaDef::new()
        .object(
            ObjectDef::root("Query")
                .field(FieldDef::new("me", entity(EntityKind::User, false)).base(resolver(me)))
                .field(FieldDef::new("user", entity(EntityKind::User, false)).arg("username").base(resolver(user)))
                .field(FieldDef::new("validate", TypeShape::Scalar).arg("username").arg("password").base(validate))
                .field(FieldDef::new("snip", entity(EntityKind::Snip, false)).arg("id").base(resolver(snip)))
                .field(
                    FieldDef::new("snips", TypeShape::EntityList { kind: EntityKind::Snip, element_required: false })
                        .arg("query")
                        .base(resolver(snips)),
                ),
        )
        .object(
            ObjectDef::root("Mutation")
                .field(
                    FieldDef::new("new_user", TypeShape::Scalar)
                        .arg("username").arg("password")
                        .authenticated(false)
                        .base(new_user),
                )
                .field(
                    FieldDef::new("new_snip", entity(EntityKind::Snip, false))
                        .arg("name").arg("public")
                        .authenticated(true)
                        .base(resolver(new_snip)),
                )
                .field(
                    FieldDef::new("set_user_role", entity(EntityKind::UserRole, false))
                        .arg("snip_id").arg("username").arg("role")
                        .authenticated(true)
                        .minimum_role(Role::Owner)
                        .base(resolver(set_user_role)),
                )
                .field(
                    FieldDef::new("update_snip", entity(EntityKind::Snip, true))
                        .arg("snip_id").arg("query")
                        .authenticated(true)
                        .minimum_role(Role::Editor)
                        .base(resolver(update_snip)),
                )
                .field(
                    FieldDef::new("delete_snip", TypeShape::Scalar)
                        .arg("snip_id")
                        .authenticated(true)
                        .minimum_role(Role::Owner)
                        .base(resolver(delete_snip)),
                ),
        )
        .object(
            ObjectDef::entity("User", EntityKind::User)
                .field(FieldDef::new("username", TypeShape::Scalar))
                .field(
                    FieldDef::new("snips", TypeShape::EntityList { kind: EntityKind::Snip, element_required: false })
                        .reference_of("snip_ids", EntityKind::Snip, true),
                ),
        )
        .object(
            ObjectDef::entity("UserRole", EntityKind::UserRole)
                .field(
                    FieldDef::new("user", entity(EntityKind::User, true))
                        .reference_of("user_id", EntityKind::User, false),
                )
                .field(FieldDef::new("role", TypeShape::Scalar)),
        )
        .object(
            ObjectDef::entity("Snip", EntityKind::Snip)
                .field(FieldDef::new("id", TypeShape::Scalar))
                .field(FieldDef::new("name", TypeShape::Scalar).minimum_role(Role::Reader))
                .field(FieldDef::new("content", TypeShape::Scalar).minimum_role(Role::Reader))
                .field(
                    FieldDef::new("owner", entity(EntityKind::User, true))
                        .reference_of("owner_id", EntityKind::User, false)
                        .minimum_role(Role::Reader),
                )
                .field(FieldDef::new("public", TypeShape::Scalar))
                .field(
                    FieldDef::new("users", TypeShape::EntityList { kind: EntityKind::UserRole, element_required: true })
                        .reference_of("role_ids", EntityKind::UserRole, true)
                        .minimum_role(Role::Reader),
                )
                .field(FieldDef::new("tags", TypeShape::ScalarList)),
        )
}
