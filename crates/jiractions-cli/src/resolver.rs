//! User resolution backed by the `[users]` table of the run config.

use jiractions_core::users::{ResolveError, UserResolver};
use jiractions_core::UserIdentity;
use std::collections::BTreeMap;

/// Resolves account keys against a static key-to-display-name map.
#[derive(Debug, Clone, Default)]
pub struct DirectoryResolver {
    users: BTreeMap<String, String>,
}

impl DirectoryResolver {
    #[must_use]
    pub const fn new(users: BTreeMap<String, String>) -> Self {
        Self { users }
    }
}

impl UserResolver for DirectoryResolver {
    fn resolve(&self, key: &str) -> Result<UserIdentity, ResolveError> {
        self.users
            .get(key)
            .map(|display_name| UserIdentity {
                key: key.to_string(),
                display_name: display_name.clone(),
            })
            .ok_or_else(|| ResolveError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> DirectoryResolver {
        DirectoryResolver::new(BTreeMap::from([("amy".to_string(), "Amy A".to_string())]))
    }

    #[test]
    fn known_key_resolves() {
        let identity = resolver().resolve("amy").expect("should resolve");
        assert_eq!(identity.display_name, "Amy A");
        assert_eq!(identity.key, "amy");
    }

    #[test]
    fn unknown_key_is_not_found() {
        assert!(matches!(
            resolver().resolve("bob"),
            Err(ResolveError::NotFound(_))
        ));
    }
}
