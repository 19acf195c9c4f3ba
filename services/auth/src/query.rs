//! User queries expressed as filter trees

use chrono::{DateTime, Utc};
use owdb::{Criterion, FilterNode, Limits, Where};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Role, User};

/// Per-field criteria on a user; all set criteria must hold.
///
/// `created` is the indexed field stores can range-scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserWhere {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Criterion<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<Criterion<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Criterion<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Criterion<Role>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Criterion<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<Criterion<DateTime<Utc>>>,
}

pub type UserFilter = FilterNode<UserWhere>;

impl UserWhere {
    pub fn id(criterion: Criterion<Uuid>) -> Self {
        Self {
            id: Some(criterion),
            ..Self::default()
        }
    }

    pub fn username(criterion: Criterion<String>) -> Self {
        Self {
            username: Some(criterion),
            ..Self::default()
        }
    }

    pub fn email(criterion: Criterion<String>) -> Self {
        Self {
            email: Some(criterion),
            ..Self::default()
        }
    }

    pub fn role(criterion: Criterion<Role>) -> Self {
        Self {
            role: Some(criterion),
            ..Self::default()
        }
    }

    pub fn created(criterion: Criterion<DateTime<Utc>>) -> Self {
        Self {
            created: Some(criterion),
            ..Self::default()
        }
    }

    pub fn last_login(criterion: Criterion<DateTime<Utc>>) -> Self {
        Self {
            last_login: Some(criterion),
            ..Self::default()
        }
    }

    /// Matches every user
    pub fn all() -> UserFilter {
        FilterNode::Condition(Self::default())
    }
}

impl Where for UserWhere {
    type Record = User;
    type Index = DateTime<Utc>;

    fn matches(&self, user: &User) -> bool {
        if let Some(c) = &self.id {
            if !c.accepts(&user.id) {
                return false;
            }
        }
        if let Some(c) = &self.username {
            if !c.accepts(&user.username) {
                return false;
            }
        }
        if let Some(c) = &self.email {
            if !c.accepts_opt(user.email.as_ref()) {
                return false;
            }
        }
        if let Some(c) = &self.role {
            if !c.accepts(&user.role) {
                return false;
            }
        }
        if let Some(c) = &self.created {
            if !c.accepts(&user.created) {
                return false;
            }
        }
        if let Some(c) = &self.last_login {
            if !c.accepts_opt(user.last_login.as_ref()) {
                return false;
            }
        }
        true
    }

    fn index_limits(&self) -> Limits<DateTime<Utc>> {
        self.created
            .as_ref()
            .map(Criterion::limits)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(name: &str, role: Role) -> User {
        let mut user = User::new(name, "$argon2id$x", role);
        user.id = Uuid::new_v4();
        user
    }

    #[test]
    fn test_empty_where_matches_everything() {
        assert!(UserWhere::all().matches(&user("alice", Role::Guest)));
    }

    #[test]
    fn test_fields_are_anded() {
        let cond = UserWhere {
            username: Some(Criterion::Eq("alice".to_string())),
            role: Some(Criterion::Eq(Role::Admin)),
            ..UserWhere::default()
        };
        assert!(cond.matches(&user("alice", Role::Admin)));
        assert!(!cond.matches(&user("alice", Role::Normal)));
        assert!(!cond.matches(&user("bob", Role::Admin)));
    }

    #[test]
    fn test_missing_email_fails_equality() {
        let cond = UserWhere::email(Criterion::Eq("a@example.com".to_string()));
        let mut alice = user("alice", Role::Normal);
        assert!(!cond.matches(&alice));
        alice.email = Some("a@example.com".to_string());
        assert!(cond.matches(&alice));
    }

    #[test]
    fn test_tree_over_users() {
        let admins = FilterNode::from(UserWhere::role(Criterion::Eq(Role::Admin)));
        let named_bob = FilterNode::from(UserWhere::username(Criterion::Eq("bob".to_string())));
        let filter = admins.or(named_bob.clone()).and(named_bob.negate());

        assert!(filter.matches(&user("alice", Role::Admin)));
        assert!(!filter.matches(&user("bob", Role::Admin)));
        assert!(!filter.matches(&user("carol", Role::Normal)));
    }

    #[test]
    fn test_index_limits_come_from_created() {
        let start = Utc::now();
        let end = start + Duration::days(1);
        let filter = FilterNode::from(UserWhere::created(Criterion::Ge(start)))
            .and(UserWhere::created(Criterion::Le(end)))
            .and(UserWhere::username(Criterion::Eq("alice".to_string())));

        assert_eq!(filter.index_limits(), Limits::new(Some(start), Some(end)));
        assert!(UserWhere::all().index_limits().is_open());
    }
}
