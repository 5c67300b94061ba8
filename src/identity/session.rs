use std::collections::HashMap;
use std::time::{Duration, Instant};

use base64::Engine;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::{AppError, AppResult};
use crate::tprintln;

pub type SessionToken = String;

/// An issued bearer session for one subject.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub token: SessionToken,
    pub subject: String,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

static SESSIONS: Lazy<RwLock<HashMap<String, Session>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// 256-bit random id, base64url without padding. Fails rather than fall back
/// to predictable bytes when the OS entropy source is unavailable.
fn gen_id() -> AppResult<String> {
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf)
        .map_err(|e| AppError::storage(format!("token entropy unavailable: {}", e)))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Issues and validates the opaque tokens that stand in for the external
/// signing service. Validation failure is represented as None, never an error.
pub struct SessionManager {
    pub ttl: Duration,
}

impl Default for SessionManager {
    fn default() -> Self { Self { ttl: Duration::from_secs(60 * 60) } }
}

impl SessionManager {
    pub fn issue(&self, subject: &str) -> AppResult<Session> {
        let now = Instant::now();
        let sid = gen_id()?;
        let token = gen_id()?;
        let sess = Session {
            session_id: sid.clone(),
            token: token.clone(),
            subject: subject.to_string(),
            issued_at: now,
            expires_at: now + self.ttl,
        };
        SESSIONS.write().insert(token, sess.clone());
        tprintln!("session.issue subject={} sid={} ttl_secs={}", subject, sid, self.ttl.as_secs());
        Ok(sess)
    }

    /// Resolve a token to its subject id. Expired entries are dropped lazily.
    pub fn validate(&self, token: &str) -> Option<String> {
        let now = Instant::now();
        let mut drop_key: Option<String> = None;
        let out = {
            let map = SESSIONS.read();
            if let Some(sess) = map.get(token) {
                if sess.expires_at > now {
                    Some(sess.subject.clone())
                } else {
                    drop_key = Some(token.to_string());
                    None
                }
            } else { None }
        };
        if let Some(k) = drop_key {
            SESSIONS.write().remove(&k);
        }
        out
    }
}
