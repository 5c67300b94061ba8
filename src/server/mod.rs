//! Request-serving runtime: the selection executor and the snip-sharing API
//! surface wired onto the directive compiler. Transports sit in front of
//! `Engine`; the engine itself only speaks requests and JSON values.

mod api;
mod executor;

pub use api::snip_schema;
pub use executor::{execute, sel, OpKind, Request, Selection};

use std::sync::Arc;

use serde_json::Value;

use crate::error::AppResult;
use crate::identity::{build_context, RequestContext, SessionManager};
use crate::schema::{compile, CompiledSchema};
use crate::storage::SharedStore;

/// Compiled schema plus its collaborators, ready to serve requests.
pub struct Engine {
    schema: CompiledSchema,
    store: SharedStore,
    sessions: Arc<SessionManager>,
}

impl Engine {
    /// Compile the snip schema against the given store. Fails fast on any
    /// annotation/shape mismatch; a process seeing that error must not serve.
    pub fn new(store: SharedStore) -> AppResult<Engine> {
        let sessions = Arc::new(SessionManager::default());
        let schema = compile(&snip_schema(sessions.clone()))?;
        Ok(Engine { schema, store, sessions })
    }

    pub fn store(&self) -> &SharedStore { &self.store }
    pub fn sessions(&self) -> &Arc<SessionManager> { &self.sessions }
    pub fn schema(&self) -> &CompiledSchema { &self.schema }

    /// Serve one request for an already-built context.
    pub async fn execute(&self, ctx: &RequestContext, request: &Request) -> AppResult<Value> {
        execute(&self.schema, &self.store, ctx, request).await
    }

    /// Build the per-request context from a raw bearer token, then serve.
    /// Token absence or verification failure degrades to anonymity.
    pub async fn execute_with_token(&self, token: Option<&str>, request: &Request) -> AppResult<Value> {
        let ctx = build_context(self.sessions.as_ref(), token).await;
        self.execute(&ctx, request).await
    }
}
