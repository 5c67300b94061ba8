use crate::model::Role;
use crate::storage::EntityKind;

use super::resolver::Resolver;
use super::shape::TypeShape;

/// Declarative behavior modifier attached to one schema field. Immutable once
/// the schema is compiled; the compiler folds these into the guard chain.
#[derive(Clone)]
pub enum Annotation {
    /// Caller must (or must not) hold an established identity.
    Authenticated { required: bool },
    /// Caller must hold at least `minimum` on the governing snip.
    MinimumRole { minimum: Role },
    /// Expand stored identifier(s) read from `id_field` into the target entity
    /// or ordered entity list, replacing the base fetch.
    ReferenceOf { id_field: String, target: EntityKind, is_list: bool },
}

/// One declared field: name, return shape, ordered argument names, ordered
/// annotations and an optional hand-written base fetch.
#[derive(Clone)]
pub struct FieldDef {
    pub name: String,
    pub shape: TypeShape,
    pub args: Vec<String>,
    pub annotations: Vec<Annotation>,
    pub base: Option<Resolver>,
}

impl FieldDef {
    pub fn new<S: Into<String>>(name: S, shape: TypeShape) -> Self {
        Self { name: name.into(), shape, args: Vec::new(), annotations: Vec::new(), base: None }
    }

    pub fn arg<S: Into<String>>(mut self, name: S) -> Self {
        self.args.push(name.into());
        self
    }

    pub fn authenticated(mut self, required: bool) -> Self {
        self.annotations.push(Annotation::Authenticated { required });
        self
    }

    pub fn minimum_role(mut self, minimum: Role) -> Self {
        self.annotations.push(Annotation::MinimumRole { minimum });
        self
    }

    pub fn reference_of<S: Into<String>>(mut self, id_field: S, target: EntityKind, is_list: bool) -> Self {
        self.annotations.push(Annotation::ReferenceOf { id_field: id_field.into(), target, is_list });
        self
    }

    pub fn base(mut self, r: Resolver) -> Self {
        self.base = Some(r);
        self
    }
}

/// A declared output object: either an operation root (Query/Mutation, no
/// backing entity) or the schema surface of one stored entity kind.
#[derive(Clone)]
pub struct ObjectDef {
    pub name: String,
    pub entity: Option<EntityKind>,
    pub fields: Vec<FieldDef>,
}

impl ObjectDef {
    pub fn root<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), entity: None, fields: Vec::new() }
    }

    pub fn entity<S: Into<String>>(name: S, kind: EntityKind) -> Self {
        Self { name: name.into(), entity: Some(kind), fields: Vec::new() }
    }

    pub fn field(mut self, f: FieldDef) -> Self {
        self.fields.push(f);
        self
    }
}

/// The whole declared schema, an explicit enumerable structure built before
/// the server starts. No runtime reflection anywhere downstream.
#[derive(Clone, Default)]
pub struct SchemaDef {
    pub objects: Vec<ObjectDef>,
}

impl SchemaDef {
    pub fn new() -> Self { Self::default() }

    pub fn object(mut self, o: ObjectDef) -> Self {
        self.objects.push(o);
        self
    }
}
