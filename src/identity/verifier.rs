use async_trait::async_trait;
use tracing::debug;

use super::request_context::RequestContext;
use super::session::SessionManager;

/// Token-verification collaborator: resolves a bearer token to a subject id.
/// Failure is None, not an error; the engine degrades to an anonymous context.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Option<String>;
}

#[async_trait]
impl TokenVerifier for SessionManager {
    async fn verify(&self, token: &str) -> Option<String> { self.validate(token) }
}

/// Build the per-request context from an optional raw token.
///
/// This is the only suspension point before field resolution begins. A missing
/// or unverifiable token MUST NOT fail the request; it yields anonymity.
pub async fn build_context(verifier: &dyn TokenVerifier, token: Option<&str>) -> RequestContext {
    let subject = match token {
        Some(t) => verifier.verify(t).await,
        None => None,
    };
    if let Some(s) = subject.as_deref() {
        debug!(target: "fieldgate", "context.build subject={}", s);
    }
    RequestContext { token: token.map(|t| t.to_string()), subject }
}
