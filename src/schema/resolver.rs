use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::identity::RequestContext;
use crate::storage::SharedStore;

/// Everything one field resolution sees: the parent document, the caller's
/// arguments, the per-request identity and the store handle. Owned values so
/// composed resolvers can move across await points freely.
#[derive(Clone)]
pub struct ResolveRequest {
    pub parent: Value,
    pub args: Value,
    pub ctx: RequestContext,
    pub store: SharedStore,
}

impl ResolveRequest {
    /// Required string argument.
    pub fn arg_str(&self, name: &str) -> AppResult<String> {
        match self.args.get(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(AppError::input(format!("argument '{}' must be a string", name))),
            None => Err(AppError::input(format!("missing argument '{}'", name))),
        }
    }

    /// Required boolean argument.
    pub fn arg_bool(&self, name: &str) -> AppResult<bool> {
        match self.args.get(name) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(AppError::input(format!("argument '{}' must be a boolean", name))),
            None => Err(AppError::input(format!("missing argument '{}'", name))),
        }
    }

    /// Required object argument, e.g. an input filter.
    pub fn arg_object(&self, name: &str) -> AppResult<Map<String, Value>> {
        match self.args.get(name) {
            Some(Value::Object(m)) => Ok(m.clone()),
            Some(_) => Err(AppError::input(format!("argument '{}' must be an object", name))),
            None => Err(AppError::input(format!("missing argument '{}'", name))),
        }
    }
}

/// A field resolver: pure function of the resolve request, suspended at I/O.
pub type Resolver = Arc<dyn Fn(ResolveRequest) -> BoxFuture<'static, AppResult<Value>> + Send + Sync>;

/// Wrap an async fn/closure into a boxed `Resolver`.
pub fn resolver<F, Fut>(f: F) -> Resolver
where
    F: Fn(ResolveRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<Value>> + Send + 'static,
{
    Arc::new(move |req| -> BoxFuture<'static, AppResult<Value>> { Box::pin(f(req)) })
}

/// Default base fetch: read the property with the field's own name off the
/// parent document. Absent properties resolve to null.
pub fn property_fetch(name: &str) -> Resolver {
    let name = name.to_string();
    resolver(move |req: ResolveRequest| {
        let v = req.parent.get(&name).cloned().unwrap_or(Value::Null);
        async move { Ok(v) }
    })
}
