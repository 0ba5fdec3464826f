//! Collection naming.
//!
//! Collection names end up in SQL text as table identifiers, so every name is
//! validated before use.

use personable_core::{Error, Result};

pub const DEFAULT_LEADS_COLLECTION: &str = "leads";
pub const DEFAULT_CONTACTS_COLLECTION: &str = "contacts";
pub const DEFAULT_USERS_COLLECTION: &str = "users";

/// Table names for the three entity collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSettings {
    pub leads: String,
    pub contacts: String,
    pub users: String,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            leads: DEFAULT_LEADS_COLLECTION.to_string(),
            contacts: DEFAULT_CONTACTS_COLLECTION.to_string(),
            users: DEFAULT_USERS_COLLECTION.to_string(),
        }
    }
}

impl CollectionSettings {
    /// Same names with a common prefix, e.g. for test isolation.
    pub fn with_prefix(prefix: &str) -> Self {
        let base = Self::default();
        Self {
            leads: format!("{}_{}", prefix, base.leads),
            contacts: format!("{}_{}", prefix, base.contacts),
            users: format!("{}_{}", prefix, base.users),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for name in [&self.leads, &self.contacts, &self.users] {
            validate_collection_name(name).map_err(|e| Error::Config(e.to_string()))?;
        }
        if self.leads == self.contacts || self.leads == self.users || self.contacts == self.users {
            return Err(Error::Config(
                "collection names must be distinct".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validate a collection name as a plain PostgreSQL identifier.
///
/// Names must be 1-63 characters of ASCII letters, digits or underscore,
/// must not start with a digit, and must not be a reserved word.
///
/// ```
/// use personable_db::validate_collection_name;
///
/// assert!(validate_collection_name("leads").is_ok());
/// assert!(validate_collection_name("crm_leads_2024").is_ok());
/// assert!(validate_collection_name("1leads").is_err());
/// assert!(validate_collection_name("leads; DROP TABLE users").is_err());
/// ```
pub fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput(
            "Collection name cannot be empty".to_string(),
        ));
    }

    if name.len() > 63 {
        return Err(Error::InvalidInput(format!(
            "Collection name exceeds 63 character limit: {} characters",
            name.len()
        )));
    }

    if let Some(first) = name.chars().next() {
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(Error::InvalidInput(format!(
                "Collection name must start with a letter or underscore, found: '{}'",
                first
            )));
        }
    }

    if let Some(ch) = name.chars().find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
        return Err(Error::InvalidInput(format!(
            "Collection name contains invalid character: '{}'",
            ch
        )));
    }

    const RESERVED_KEYWORDS: &[&str] = &[
        "select", "insert", "update", "delete", "drop", "create", "alter", "grant", "revoke",
        "truncate", "table", "user", "where", "from",
    ];
    if RESERVED_KEYWORDS.contains(&name.to_lowercase().as_str()) {
        return Err(Error::InvalidInput(format!(
            "Collection name '{}' is a reserved SQL keyword",
            name
        )));
    }

    Ok(())
}
