use crate::acl::{AccessPolicy, Permission};
use crate::validate::{validate_new_item, validate_username};
use crate::{
    CoreError, ItemId, ItemStore, NewItem, OwnerId, PasswordHasher, TodoItem, User, UserDirectory,
};

/// Outcome of an authorization check for an authenticated name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Granted(User),
    /// The user exists but none of their groups carries the permission.
    Forbidden,
    /// The name is not (or no longer) present in the user table.
    UnknownUser,
}

/// Application service orchestrating authentication and the item store.
///
/// Users live in a relational table reached through `U`; items live in a
/// document store `I` keyed by the user's relational id. The two stores are
/// written independently and never reconciled.
pub struct TodoService<U: UserDirectory, I: ItemStore, H: PasswordHasher> {
    users: U,
    items: I,
    hasher: H,
    policy: AccessPolicy,
}

impl<U: UserDirectory, I: ItemStore, H: PasswordHasher> TodoService<U, I, H> {
    pub fn new(users: U, items: I, hasher: H, policy: AccessPolicy) -> Self {
        Self {
            users,
            items,
            hasher,
            policy,
        }
    }

    pub fn users(&self) -> &U {
        &self.users
    }

    pub fn items(&self) -> &I {
        &self.items
    }

    /// Check a login/password pair. Unknown users and wrong passwords both
    /// yield `None`.
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<Option<User>, CoreError> {
        match self.find_user(login).await? {
            Some(user) => self.check_password(user, password),
            None => Ok(None),
        }
    }

    /// The user row for `login`, if any.
    pub async fn find_user(&self, login: &str) -> Result<Option<User>, CoreError> {
        self.users.find_by_username(login).await
    }

    /// Verify `password` against the row's digest. CPU-bound; callers on an
    /// async runtime should run it off the worker threads.
    pub fn check_password(&self, user: User, password: &str) -> Result<Option<User>, CoreError> {
        if self.hasher.verify(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Resolve an authenticated name and check `permission` against the policy.
    pub async fn authorize(&self, username: &str, permission: Permission) -> Result<Access, CoreError> {
        match self.users.find_by_username(username).await? {
            None => Ok(Access::UnknownUser),
            Some(user) if self.policy.permits(&user, permission) => Ok(Access::Granted(user)),
            Some(_) => Ok(Access::Forbidden),
        }
    }

    pub async fn list_items(&self, owner: OwnerId) -> Result<Vec<TodoItem>, CoreError> {
        self.items.list_by_owner(owner).await
    }

    pub async fn add_item(&self, owner: OwnerId, item: NewItem) -> Result<ItemId, CoreError> {
        validate_new_item(&item)?;
        self.items.insert(owner, item).await
    }

    /// Remove an item of `owner`. Missing ids are not an error.
    pub async fn remove_item(&self, owner: OwnerId, id: &ItemId) -> Result<bool, CoreError> {
        self.items.remove(owner, id).await
    }

    /// Provision a user row with a freshly hashed password.
    pub async fn register_user(
        &self,
        username: &str,
        password: &str,
        groups: &[String],
    ) -> Result<(), CoreError> {
        validate_username(username)?;
        if self.users.find_by_username(username).await?.is_some() {
            return Err(CoreError::AlreadyExists);
        }
        let digest = self.hasher.hash(password)?;
        self.users.insert_user(username, &digest, groups).await
    }
}
