/// Per-request caller identity. Built once before field resolution begins,
/// never mutated, dropped at request end.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Raw bearer token as presented, kept for pass-through and audit.
    pub token: Option<String>,
    /// Verified subject id; None means the caller is anonymous.
    pub subject: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self { Self::default() }

    /// Known-subject context, used by embedders and tests that bypass tokens.
    pub fn for_subject<S: Into<String>>(subject: S) -> Self {
        Self { token: None, subject: Some(subject.into()) }
    }

    pub fn is_authenticated(&self) -> bool { self.subject.is_some() }
}
