//! Lightweight input validation helpers. Keep logic minimal and deterministic.

use crate::{CoreError, NewItem};

const MAX_USERNAME_LEN: usize = 64;

/// Reject only a blank `item_value`. Item text and category are otherwise
/// stored as given.
pub fn validate_new_item(item: &NewItem) -> Result<(), CoreError> {
    if item.item_value.trim().is_empty() {
        return Err(CoreError::InvalidItem("item_value is empty".into()));
    }
    Ok(())
}

/// Validate a username for registration: non-empty, bounded, no whitespace
/// or control characters.
pub fn validate_username(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::InvalidUsername("empty".into()));
    }
    if name.chars().count() > MAX_USERNAME_LEN {
        return Err(CoreError::InvalidUsername("too long".into()));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(CoreError::InvalidUsername("invalid characters".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(value: &str, category: &str) -> NewItem {
        NewItem {
            item_value: value.into(),
            category: category.into(),
        }
    }

    #[test]
    fn blank_item_is_rejected() {
        assert!(validate_new_item(&item("wake up", "green")).is_ok());
        assert!(validate_new_item(&item("   ", "green")).is_err());
        assert!(validate_new_item(&item("", "green")).is_err());
    }

    #[test]
    fn free_form_categories_and_long_items_pass() {
        for category in ["high priority", "красный", "Work/Home", ""] {
            assert!(validate_new_item(&item("eat", category)).is_ok(), "{category}");
        }
        assert!(validate_new_item(&item(&"a".repeat(2000), "red")).is_ok());
    }

    #[test]
    fn username_validation() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("o'brien").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("a b").is_err());
        assert!(validate_username("a\u{0}").is_err());
    }
}
