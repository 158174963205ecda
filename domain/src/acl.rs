//! Group-based access control.
//!
//! A user's principals are derived from the `groups` column of their row;
//! the policy is a list of allow entries pairing a principal with a
//! permission.

use crate::User;

/// Permissions checked by the HTTP layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Access to the to-do page and item API.
    Entry,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Entry => "entry",
        }
    }
}

/// Principal string for a group name.
pub fn group_principal(group: &str) -> String {
    format!("group:{}", group)
}

/// `group:<name>` principals for every group of `user`.
pub fn group_principals(user: &User) -> Vec<String> {
    user.groups.iter().map(|g| group_principal(g)).collect()
}

/// Allow-list of `(principal, permission)` pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessPolicy {
    allow: Vec<(String, Permission)>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self { allow: Vec::new() }
    }

    /// Policy granting `permission` to each group in `groups`.
    pub fn for_groups<I, S>(groups: I, permission: Permission) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut policy = Self::new();
        for g in groups {
            policy = policy.allow(group_principal(g.as_ref()), permission);
        }
        policy
    }

    pub fn allow<S: Into<String>>(mut self, principal: S, permission: Permission) -> Self {
        self.allow.push((principal.into(), permission));
        self
    }

    pub fn permits(&self, user: &User, permission: Permission) -> bool {
        let principals = group_principals(user);
        self.allow
            .iter()
            .any(|(p, perm)| *perm == permission && principals.iter().any(|q| q == p))
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::for_groups(["users", "admins"], Permission::Entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OwnerId;

    fn user(groups: &[&str]) -> User {
        User {
            id: OwnerId::new(1),
            username: "u".into(),
            password_hash: "h".into(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
        }
    }

    #[test]
    fn principals_are_prefixed() {
        assert_eq!(
            group_principals(&user(&["users", "admins"])),
            vec!["group:users".to_string(), "group:admins".to_string()]
        );
    }

    #[test]
    fn default_policy_admits_users_and_admins() {
        let policy = AccessPolicy::default();
        assert!(policy.permits(&user(&["users"]), Permission::Entry));
        assert!(policy.permits(&user(&["guests", "admins"]), Permission::Entry));
        assert!(!policy.permits(&user(&["guests"]), Permission::Entry));
        assert!(!policy.permits(&user(&[]), Permission::Entry));
    }

    #[test]
    fn empty_policy_denies_everyone() {
        assert!(!AccessPolicy::new().permits(&user(&["users"]), Permission::Entry));
    }
}
