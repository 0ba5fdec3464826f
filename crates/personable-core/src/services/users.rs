//! User service.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::require;
use crate::error::{Error, Result};
use crate::filter::UserFilter;
use crate::models::{Name, User, UserRole, UserStatus};
use crate::outcome::Outcome;
use crate::traits::Repository;

/// Body of a user create or update request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    #[serde(default)]
    pub name: Option<Name>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: BTreeSet<UserRole>,
    #[serde(default)]
    pub reporting_to: Option<Uuid>,
    #[serde(default)]
    pub status: UserStatus,
}

impl UserInput {
    /// Build the user stored under `user_id`.
    fn into_user(self, user_id: Uuid) -> Result<User> {
        let name = require(self.name, "name")?;
        name.validate("name").map_err(Error::InvalidInput)?;

        let email = require(self.email, "email")?;
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::InvalidInput("email must be a valid address".to_string()));
        }

        if self.reporting_to == Some(user_id) {
            return Err(Error::InvalidInput("a user cannot report to themselves".to_string()));
        }

        Ok(User {
            user_id,
            name,
            email: email.to_string(),
            roles: self.roles,
            status: self.status,
            reporting_to: self.reporting_to,
        })
    }
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn Repository<User>>,
}

impl UserService {
    pub fn new(users: Arc<dyn Repository<User>>) -> Self {
        Self { users }
    }

    pub async fn list_all(&self) -> Outcome<Vec<User>> {
        self.users.find_all().await
    }

    pub async fn filter(&self, filter: &UserFilter) -> Outcome<Vec<User>> {
        let predicate = filter.to_predicate();
        debug!(
            subsystem = "service",
            component = "users",
            op = "filter",
            clause_count = predicate.clauses().len(),
            "Filtering users"
        );
        self.users.find_by_predicate(&predicate).await
    }

    pub async fn get(&self, id: Uuid) -> Outcome<User> {
        self.users.find_by_id(id).await
    }

    pub async fn create(&self, input: UserInput) -> Outcome<User> {
        let user = crate::try_outcome!(Outcome::from(input.into_user(Uuid::new_v4())));
        self.users.insert(user).await
    }

    /// Replace every field of an existing user except its id.
    pub async fn update(&self, id: Uuid, input: UserInput) -> Outcome<User> {
        crate::try_outcome!(self.users.find_by_id(id).await);
        let user = crate::try_outcome!(Outcome::from(input.into_user(id)));
        self.users.replace(id, user).await
    }

    pub async fn delete(&self, id: Uuid) -> Outcome<bool> {
        self.users.delete(id).await
    }
}
