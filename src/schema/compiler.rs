use std::collections::HashMap;

use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::model::Role;
use crate::storage::EntityKind;

use super::field::{Annotation, FieldDef, ObjectDef, SchemaDef};
use super::gate::{authenticated_gate, role_gate, ResourceLocator};
use super::reference::reference_resolver;
use super::resolver::{property_fetch, Resolver};
use super::shape::TypeShape;

/// One field after compilation: its declared shape plus the composed resolver.
#[derive(Clone)]
pub struct CompiledField {
    pub shape: TypeShape,
    pub resolver: Resolver,
}

struct CompiledObject {
    fields: HashMap<String, CompiledField>,
}

/// The compiled schema: every field's resolver is final and immutable. Owned
/// by the request-serving runtime; resolution never mutates it.
pub struct CompiledSchema {
    objects: HashMap<String, CompiledObject>,
    by_kind: HashMap<EntityKind, String>,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("objects", &self.objects.keys().collect::<Vec<_>>())
            .field("by_kind", &self.by_kind)
            .finish()
    }
}

impl CompiledSchema {
    pub fn field(&self, object: &str, field: &str) -> Option<&CompiledField> {
        self.objects.get(object).and_then(|o| o.fields.get(field))
    }

    /// Object name serving a stored entity kind.
    pub fn object_for(&self, kind: EntityKind) -> Option<&str> {
        self.by_kind.get(&kind).map(|s| s.as_str())
    }
}

/// Normalized view of one field's annotation list. Duplicate directives of the
/// same kind have no single meaning, so they are rejected outright.
#[derive(Default)]
struct Directives {
    authenticated: Option<bool>,
    minimum_role: Option<Role>,
    reference: Option<(String, EntityKind, bool)>,
}

fn normalize(object: &str, field: &FieldDef) -> AppResult<Directives> {
    let mut d = Directives::default();
    for ann in &field.annotations {
        match ann {
            Annotation::Authenticated { required } => {
                if d.authenticated.replace(*required).is_some() {
                    return Err(AppError::config(format!("{}.{}: duplicate authenticated annotation", object, field.name)));
                }
            }
            Annotation::MinimumRole { minimum } => {
                if d.minimum_role.replace(*minimum).is_some() {
                    return Err(AppError::config(format!("{}.{}: duplicate role annotation", object, field.name)));
                }
            }
            Annotation::ReferenceOf { id_field, target, is_list } => {
                if d.reference.replace((id_field.clone(), *target, *is_list)).is_some() {
                    return Err(AppError::config(format!("{}.{}: duplicate reference annotation", object, field.name)));
                }
            }
        }
    }
    Ok(d)
}

fn compile_field(object: &ObjectDef, field: &FieldDef) -> AppResult<Resolver> {
    let d = normalize(&object.name, field)?;
    let label = format!("{}.{}", object.name, field.name);

    // Innermost: the base fetch, or identifier expansion in its place.
    let mut chain: Resolver = match &d.reference {
        Some((id_field, target, is_list)) => {
            let Some((declared_kind, declared_list)) = field.shape.reference_target() else {
                return Err(AppError::config(format!(
                    "{}: reference annotation on a non-entity shape; the declared return type must be an entity or entity list", label
                )));
            };
            if declared_kind != *target {
                return Err(AppError::config(format!(
                    "{}: reference targets {} but the field is declared as {}", label, target, declared_kind
                )));
            }
            if declared_list != *is_list {
                return Err(AppError::config(format!(
                    "{}: reference cardinality does not match the declared shape", label
                )));
            }
            reference_resolver(id_field.clone(), *target, *is_list)
        }
        None => field.base.clone().unwrap_or_else(|| property_fetch(&field.name)),
    };

    // Then the role gate, resolving its snip from the parent or a root argument.
    if let Some(minimum) = d.minimum_role {
        let locator = match object.entity {
            Some(EntityKind::Snip) => ResourceLocator::Parent,
            Some(other) => {
                return Err(AppError::config(format!(
                    "{}: role annotation on {} fields; roles exist only for snips", label, other
                )));
            }
            None => {
                let Some(first_arg) = field.args.first() else {
                    return Err(AppError::config(format!(
                        "{}: role annotation on a root field with no arguments to locate the snip by", label
                    )));
                };
                ResourceLocator::ByIdArg(first_arg.clone())
            }
        };
        chain = role_gate(minimum, locator, chain);
    }

    // Authentication outermost, before any resource lookup can run or leak.
    if let Some(required) = d.authenticated {
        chain = authenticated_gate(required, chain);
    }

    debug!(target: "fieldgate",
        "schema.compile field={} auth={:?} role={:?} reference={}",
        label, d.authenticated, d.minimum_role, d.reference.is_some());
    Ok(chain)
}

/// Compile the declared schema into final per-field resolvers. Runs once at
/// startup; any error here must prevent the process from serving traffic.
pub fn compile(def: &SchemaDef) -> AppResult<CompiledSchema> {
    let mut objects = HashMap::new();
    let mut by_kind = HashMap::new();
    for object in &def.objects {
        if let Some(kind) = object.entity {
            if by_kind.insert(kind, object.name.clone()).is_some() {
                return Err(AppError::config(format!("two objects declared for entity kind {}", kind)));
            }
        }
        let mut fields = HashMap::new();
        for field in &object.fields {
            let resolver = compile_field(object, field)?;
            if fields.insert(field.name.clone(), CompiledField { shape: field.shape, resolver }).is_some() {
                return Err(AppError::config(format!("{}.{}: duplicate field", object.name, field.name)));
            }
        }
        if objects.insert(object.name.clone(), CompiledObject { fields }).is_some() {
            return Err(AppError::config(format!("duplicate object {}", object.name)));
        }
    }
    // Every entity-shaped field must resolve to a declared object, so the
    // executor can project selections without reflection.
    for object in &def.objects {
        for field in &object.fields {
            if let Some(kind) = field.shape.entity_kind() {
                if !by_kind.contains_key(&kind) {
                    return Err(AppError::config(format!(
                        "{}.{}: returns {} but no object is declared for that kind", object.name, field.name, kind
                    )));
                }
            }
        }
    }
    Ok(CompiledSchema { objects, by_kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::RequestContext;
    use crate::schema::field::{FieldDef, ObjectDef, SchemaDef};
    use crate::schema::resolver::ResolveRequest;
    use crate::storage::MemoryStore;
    use serde_json::{json, Value};

    fn user_object() -> ObjectDef {
        ObjectDef::entity("User", EntityKind::User)
            .field(FieldDef::new("username", TypeShape::Scalar))
    }

    #[test]
    fn reference_on_scalar_shape_fails_at_compile_time() {
        let def = SchemaDef::new()
            .object(user_object())
            .object(
                ObjectDef::entity("Snip", EntityKind::Snip)
                    .field(FieldDef::new("name", TypeShape::Scalar)
                        .reference_of("owner_id", EntityKind::User, false)),
            );
        let err = compile(&def).unwrap_err();
        assert_eq!(err.code_str(), "config_error");
        assert!(err.message().contains("Snip.name"), "error should name the offending field");
    }

    #[test]
    fn reference_cardinality_must_match_declared_shape() {
        let def = SchemaDef::new()
            .object(user_object())
            .object(
                ObjectDef::entity("Snip", EntityKind::Snip)
                    .field(FieldDef::new("owner", TypeShape::Entity { kind: EntityKind::User, required: true })
                        .reference_of("owner_id", EntityKind::User, true)),
            );
        assert_eq!(compile(&def).unwrap_err().code_str(), "config_error");
    }

    #[test]
    fn role_on_non_snip_entity_fails_at_compile_time() {
        let def = SchemaDef::new().object(
            ObjectDef::entity("User", EntityKind::User)
                .field(FieldDef::new("username", TypeShape::Scalar).minimum_role(Role::Reader)),
        );
        assert_eq!(compile(&def).unwrap_err().code_str(), "config_error");
    }

    #[test]
    fn role_on_root_field_requires_an_argument() {
        let def = SchemaDef::new().object(
            ObjectDef::root("Mutation")
                .field(FieldDef::new("purge", TypeShape::Scalar).minimum_role(Role::Owner)),
        );
        assert_eq!(compile(&def).unwrap_err().code_str(), "config_error");
    }

    #[test]
    fn entity_shape_without_declared_object_fails() {
        let def = SchemaDef::new().object(
            ObjectDef::root("Query")
                .field(FieldDef::new("snip", TypeShape::Entity { kind: EntityKind::Snip, required: false })),
        );
        assert_eq!(compile(&def).unwrap_err().code_str(), "config_error");
    }

    #[tokio::test]
    async fn annotation_order_does_not_change_behavior() {
        // Same annotations, both declaration orders: authentication must win
        // over the role lookup either way for an anonymous caller.
        let shapes = |first_auth: bool| {
            let f = FieldDef::new("name", TypeShape::Scalar);
            let f = if first_auth {
                f.authenticated(true).minimum_role(Role::Reader)
            } else {
                f.minimum_role(Role::Reader).authenticated(true)
            };
            SchemaDef::new()
                .object(ObjectDef::entity("Snip", EntityKind::Snip).field(f))
        };
        for first_auth in [true, false] {
            let schema = compile(&shapes(first_auth)).unwrap();
            let field = schema.field("Snip", "name").unwrap();
            let req = ResolveRequest {
                parent: json!({"id": "s1", "name": "n", "public": true, "owner_id": "u", "content": "", "role_ids": [], "tags": []}),
                args: Value::Null,
                ctx: RequestContext::anonymous(),
                store: MemoryStore::shared(),
            };
            let err = (field.resolver)(req).await.unwrap_err();
            assert_eq!(err.code_str(), "not_authenticated",
                "auth gate must run outermost regardless of declaration order");
        }
    }

    #[tokio::test]
    async fn default_base_is_a_property_fetch() {
        let def = SchemaDef::new().object(user_object());
        let schema = compile(&def).unwrap();
        let field = schema.field("User", "username").unwrap();
        let req = ResolveRequest {
            parent: json!({"username": "alice"}),
            args: Value::Null,
            ctx: RequestContext::anonymous(),
            store: MemoryStore::shared(),
        };
        assert_eq!((field.resolver)(req).await.unwrap(), json!("alice"));
    }
}
