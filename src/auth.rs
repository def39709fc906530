//! Display-name allow-list for multiplayer access

use std::collections::HashSet;

use crate::error::{GameError, GameResult};

/// Longest display name accepted, in characters
pub const MAX_NAME_CHARS: usize = 32;

/// Names permitted to join multiplayer rooms
#[derive(Debug, Clone)]
pub struct AllowList {
    /// None = open mode, any well-formed name may play
    names: Option<HashSet<String>>,
}

impl AllowList {
    /// Allow-list that accepts every well-formed name
    pub fn open() -> Self {
        Self { names: None }
    }

    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: HashSet<String> = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        Self { names: Some(names) }
    }

    /// Load from ALLOWED_NAMES (comma separated)
    pub fn from_env() -> Self {
        let raw = std::env::var("ALLOWED_NAMES").unwrap_or_default();
        let list = Self::new(raw.split(','));

        if list.names.as_ref().is_some_and(|n| !n.is_empty()) {
            tracing::info!("Name allow-list enabled");
            list
        } else {
            tracing::warn!("ALLOWED_NAMES not set - anyone can join multiplayer rooms!");
            Self::open()
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.names.is_some()
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        match &self.names {
            Some(names) => names.contains(name),
            None => true,
        }
    }

    /// Normalize a requested display name and check it against the list
    pub fn authorize(&self, raw: &str) -> GameResult<String> {
        let name = raw.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
            return Err(GameError::InvalidArgument(format!(
                "Display name must be 1-{} characters",
                MAX_NAME_CHARS
            )));
        }
        if !self.is_allowed(name) {
            return Err(GameError::Unauthorized(
                "This name is not allowed to play".to_string(),
            ));
        }
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_list_accepts_any_name() {
        let list = AllowList::open();
        assert!(!list.is_restricted());
        assert_eq!(list.authorize("  alice ").unwrap(), "alice");
    }

    #[test]
    fn test_restricted_list() {
        let list = AllowList::new(["0104", " 0624 ", ""]);
        assert!(list.is_restricted());
        assert_eq!(list.authorize("0624").unwrap(), "0624");
        assert!(matches!(
            list.authorize("mallory"),
            Err(GameError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_malformed_names_rejected() {
        let list = AllowList::open();
        assert!(matches!(
            list.authorize("   "),
            Err(GameError::InvalidArgument(_))
        ));
        let long = "x".repeat(MAX_NAME_CHARS + 1);
        assert!(matches!(
            list.authorize(&long),
            Err(GameError::InvalidArgument(_))
        ));
    }
}
