use crate::error::AppError;
use crate::model::{role_on, Role, Snip};
use crate::storage::{EntityKind, Store};

use super::resolver::{resolver, ResolveRequest, Resolver};

/// Authentication gate. Wraps `next`; rejects before it runs when the caller's
/// authentication state does not match `required`.
pub fn authenticated_gate(required: bool, next: Resolver) -> Resolver {
    resolver(move |req: ResolveRequest| {
        let next = next.clone();
        async move {
            if req.ctx.is_authenticated() != required {
                return Err(if required {
                    AppError::not_authenticated()
                } else {
                    AppError::already_authenticated()
                });
            }
            next(req).await
        }
    })
}

/// Where the role gate finds the snip that governs the field.
#[derive(Debug, Clone)]
pub enum ResourceLocator {
    /// The parent document is the snip (fields on the Snip object).
    Parent,
    /// Root fields: the snip is looked up by the id in this argument before
    /// the gate decides, so the wrapped fetch never runs for rejected callers.
    ByIdArg(String),
}

/// Role gate. Resolves the governing snip, re-fetches the caller's assignments
/// and requires a role satisfying `minimum` before delegating.
pub fn role_gate(minimum: Role, locator: ResourceLocator, next: Resolver) -> Resolver {
    resolver(move |req: ResolveRequest| {
        let next = next.clone();
        let locator = locator.clone();
        async move {
            let snip = match &locator {
                ResourceLocator::Parent => Snip::from_doc(&req.parent)
                    .map_err(|_| AppError::config("role gate requires a snip parent"))?,
                ResourceLocator::ByIdArg(arg) => {
                    let id = req.arg_str(arg)?;
                    let doc = req.store.find_by_id(EntityKind::Snip, &id).await?
                        .ok_or_else(|| AppError::not_found(format!("snip {} not found", id)))?;
                    Snip::from_doc(&doc)?
                }
            };
            match role_on(&req.store, &snip, req.ctx.subject.as_deref()).await? {
                Some(held) if held.satisfies(minimum) => next(req).await,
                _ => Err(AppError::insufficient_role(minimum)),
            }
        }
    })
}
