//! Caller identity: opaque session tokens, the verification seam, and the
//! per-request context the guard chain reads.
//! Keep the public surface thin and split implementation across sub-modules.

mod request_context;
mod session;
mod verifier;

pub use request_context::RequestContext;
pub use session::{Session, SessionManager, SessionToken};
pub use verifier::{build_context, TokenVerifier};
