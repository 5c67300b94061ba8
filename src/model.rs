//! Domain records stored in the document store, plus the role-hierarchy model
//! the role gate is built on.
//!
//! Policy decisions documented here:
//! - Roles are hierarchical: OWNER covers EDITOR covers READER. `Role::satisfies`
//!   is the single primitive the gate depends on; it is total and does no I/O.
//! - A snip's owner holds OWNER implicitly, without a stored assignment.
//! - A public snip grants READER to every caller, including anonymous ones.
//! - At most one assignment per (user, snip) is enforced at write time; if stored
//!   data ever carries duplicates, reads take the maximum role.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::{AppError, AppResult};
use crate::storage::{EntityKind, SharedStore, Store};

/// Ordered role enumeration, highest privilege first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Editor,
    Reader,
}

impl Role {
    fn rank(&self) -> u8 {
        match self {
            Role::Owner => 3,
            Role::Editor => 2,
            Role::Reader => 1,
        }
    }

    /// Hierarchical check: does a held role cover the required minimum?
    pub fn satisfies(&self, minimum: Role) -> bool { self.rank() >= minimum.rank() }

    /// The higher-privileged of two roles.
    pub fn max(self, other: Role) -> Role {
        if self.rank() >= other.rank() { self } else { other }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Editor => "EDITOR",
            Role::Reader => "READER",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OWNER" => Ok(Role::Owner),
            "EDITOR" => Ok(Role::Editor),
            "READER" => Ok(Role::Reader),
            other => Err(AppError::input(format!("unknown role '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub password_hash: String,
    #[serde(default)]
    pub snip_ids: Vec<String>,
}

/// The shared resource this engine protects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snip {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
    pub public: bool,
    pub owner_id: String,
    #[serde(default)]
    pub role_ids: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Grant of a role to a user on one snip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleAssignment {
    pub id: String,
    pub user_id: String,
    pub snip_id: String,
    pub role: Role,
}

impl Snip {
    pub fn from_doc(doc: &Value) -> AppResult<Snip> {
        serde_json::from_value(doc.clone())
            .map_err(|e| AppError::storage(format!("corrupt snip document: {}", e)))
    }
}

impl User {
    pub fn from_doc(doc: &Value) -> AppResult<User> {
        serde_json::from_value(doc.clone())
            .map_err(|e| AppError::storage(format!("corrupt user document: {}", e)))
    }
}

impl RoleAssignment {
    pub fn from_doc(doc: &Value) -> AppResult<RoleAssignment> {
        serde_json::from_value(doc.clone())
            .map_err(|e| AppError::storage(format!("corrupt role assignment: {}", e)))
    }
}

/// Resolve the effective role a caller holds on a snip, or None.
///
/// Assignment state is fetched fresh on every check; concurrent role changes are
/// observed per-field, never cached across requests.
pub async fn role_on(store: &SharedStore, snip: &Snip, subject: Option<&str>) -> AppResult<Option<Role>> {
    let mut best: Option<Role> = None;
    if snip.public {
        best = Some(Role::Reader);
    }
    let Some(user_id) = subject else { return Ok(best) };
    if snip.owner_id == user_id {
        return Ok(Some(Role::Owner));
    }
    let mut filter = serde_json::Map::new();
    filter.insert("snip_id".into(), Value::String(snip.id.clone()));
    filter.insert("user_id".into(), Value::String(user_id.to_string()));
    for doc in store.find(EntityKind::UserRole, &filter).await? {
        let assignment = RoleAssignment::from_doc(&doc)?;
        best = Some(match best {
            Some(b) => b.max(assignment.role),
            None => assignment.role,
        });
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    #[test]
    fn hierarchy_is_total_and_ordered() {
        for held in [Role::Owner, Role::Editor, Role::Reader] {
            assert!(held.satisfies(Role::Reader) || held == Role::Reader);
            assert!(held.satisfies(held), "a role always satisfies itself");
        }
        assert!(Role::Owner.satisfies(Role::Editor));
        assert!(Role::Owner.satisfies(Role::Reader));
        assert!(Role::Editor.satisfies(Role::Reader));
        assert!(!Role::Editor.satisfies(Role::Owner));
        assert!(!Role::Reader.satisfies(Role::Editor));
        assert!(!Role::Reader.satisfies(Role::Owner));
    }

    #[test]
    fn role_round_trips_through_strings() {
        for r in [Role::Owner, Role::Editor, Role::Reader] {
            assert_eq!(r.as_str().parse::<Role>().unwrap(), r);
        }
        assert!("ADMIN".parse::<Role>().is_err());
    }

    fn snip_doc(id: &str, owner: &str, public: bool) -> Value {
        json!({
            "id": id, "name": "n", "content": "", "public": public,
            "owner_id": owner, "role_ids": [], "tags": []
        })
    }

    #[tokio::test]
    async fn owner_is_implicit_and_public_grants_reader() {
        let store = MemoryStore::shared();
        let snip = Snip::from_doc(&snip_doc("s1", "u-owner", true)).unwrap();

        assert_eq!(role_on(&store, &snip, Some("u-owner")).await.unwrap(), Some(Role::Owner));
        assert_eq!(role_on(&store, &snip, Some("u-stranger")).await.unwrap(), Some(Role::Reader));
        assert_eq!(role_on(&store, &snip, None).await.unwrap(), Some(Role::Reader));

        let private = Snip::from_doc(&snip_doc("s2", "u-owner", false)).unwrap();
        assert_eq!(role_on(&store, &private, Some("u-stranger")).await.unwrap(), None);
        assert_eq!(role_on(&store, &private, None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_assignments_read_as_the_maximum() {
        let store = MemoryStore::shared();
        let snip = Snip::from_doc(&snip_doc("s1", "u-owner", false)).unwrap();
        for role in ["READER", "EDITOR"] {
            let mut f = serde_json::Map::new();
            f.insert("user_id".into(), json!("u2"));
            f.insert("snip_id".into(), json!("s1"));
            f.insert("role".into(), json!(role));
            store.create(EntityKind::UserRole, f).await.unwrap();
        }
        assert_eq!(role_on(&store, &snip, Some("u2")).await.unwrap(), Some(Role::Editor));
    }
}
