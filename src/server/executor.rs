use futures_util::future::{join_all, BoxFuture};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::identity::RequestContext;
use crate::schema::{CompiledSchema, ResolveRequest, TypeShape};
use crate::storage::SharedStore;

/// Which operation root a request addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Query,
    Mutation,
}

impl OpKind {
    pub fn object_name(&self) -> &'static str {
        match self {
            OpKind::Query => "Query",
            OpKind::Mutation => "Mutation",
        }
    }
}

/// One requested output field, with nested selections for entity shapes.
#[derive(Debug, Clone)]
pub struct Selection {
    pub name: String,
    pub children: Vec<Selection>,
}

impl Selection {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), children: Vec::new() }
    }

    pub fn child(mut self, c: Selection) -> Self {
        self.children.push(c);
        self
    }
}

/// Shorthand for building selections in embedders and tests.
pub fn sel<S: Into<String>>(name: S) -> Selection { Selection::new(name) }

/// One call at the request boundary: a root field with caller arguments and
/// the selection to project from the result.
#[derive(Debug, Clone)]
pub struct Request {
    pub operation: OpKind,
    pub field: String,
    pub args: Value,
    pub selection: Vec<Selection>,
}

impl Request {
    pub fn query<S: Into<String>>(field: S, args: Value) -> Self {
        Self { operation: OpKind::Query, field: field.into(), args, selection: Vec::new() }
    }

    pub fn mutation<S: Into<String>>(field: S, args: Value) -> Self {
        Self { operation: OpKind::Mutation, field: field.into(), args, selection: Vec::new() }
    }

    pub fn select(mut self, s: Selection) -> Self {
        self.selection.push(s);
        self
    }
}

/// Resolve one root field and project the selection through the compiled
/// per-field resolvers. Guard failures surface unchanged.
pub async fn execute(
    schema: &CompiledSchema,
    store: &SharedStore,
    ctx: &RequestContext,
    request: &Request,
) -> AppResult<Value> {
    let root = request.operation.object_name();
    let field = schema.field(root, &request.field)
        .ok_or_else(|| AppError::input(format!("unknown {} field '{}'", root, request.field)))?;
    let value = (field.resolver)(ResolveRequest {
        parent: Value::Null,
        args: request.args.clone(),
        ctx: ctx.clone(),
        store: store.clone(),
    }).await?;
    project(schema, store, ctx, field.shape, value, &request.selection).await
}

/// Project a resolved value through the selection. Sibling fields of one
/// parent resolve concurrently; list elements project concurrently and are
/// reassembled in input order.
fn project<'a>(
    schema: &'a CompiledSchema,
    store: &'a SharedStore,
    ctx: &'a RequestContext,
    shape: TypeShape,
    value: Value,
    selection: &'a [Selection],
) -> BoxFuture<'a, AppResult<Value>> {
    Box::pin(async move {
        match shape {
            TypeShape::Scalar | TypeShape::ScalarList => Ok(value),
            TypeShape::Entity { kind, .. } => {
                if value.is_null() {
                    return Ok(Value::Null);
                }
                // Guaranteed by compile-time validation.
                let object = schema.object_for(kind)
                    .ok_or_else(|| AppError::config(format!("no object declared for {}", kind)))?;
                if selection.is_empty() {
                    return Err(AppError::input(format!("selection required for {} result", object)));
                }
                let resolutions = selection.iter().map(|s| {
                    let parent = value.clone();
                    async move {
                        let child = schema.field(object, &s.name)
                            .ok_or_else(|| AppError::input(format!("unknown field '{}.{}'", object, s.name)))?;
                        let out = (child.resolver)(ResolveRequest {
                            parent,
                            args: Value::Null,
                            ctx: ctx.clone(),
                            store: store.clone(),
                        }).await?;
                        let projected = project(schema, store, ctx, child.shape, out, &s.children).await?;
                        Ok::<(String, Value), AppError>((s.name.clone(), projected))
                    }
                });
                let mut out = Map::new();
                for pair in join_all(resolutions).await {
                    let (name, v) = pair?;
                    out.insert(name, v);
                }
                Ok(Value::Object(out))
            }
            TypeShape::EntityList { kind, element_required } => {
                let items = match value {
                    Value::Array(items) => items,
                    Value::Null => Vec::new(),
                    other => return Err(AppError::storage(format!("entity list resolved to a non-array: {}", other))),
                };
                let element_shape = TypeShape::Entity { kind, required: element_required };
                let projections = items.into_iter()
                    .map(|item| project(schema, store, ctx, element_shape, item, selection));
                let projected = join_all(projections).await.into_iter().collect::<AppResult<Vec<_>>>()?;
                Ok(Value::Array(projected))
            }
        }
    })
}
