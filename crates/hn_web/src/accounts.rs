//! User accounts: sign-up, sign-in and self-service profile changes.

use hn_core::{Error, NewUser, Result, User, UserChanges, UserFilter, UserStorage};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::{CurrentUser, TokenAuthority};
use crate::passwords::Passwords;

#[derive(Debug, Clone, Deserialize)]
pub struct SignUp {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub password: String,
}

/// Either identifier works; email is tried first.
#[derive(Debug, Clone, Deserialize)]
pub struct SignIn {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password: Option<String>,
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}

fn email(value: &str) -> Result<String> {
    let value = required("email", value)?;
    let valid = value
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
        && !value.contains(char::is_whitespace);
    if !valid {
        return Err(Error::InvalidArgument(format!("'{}' is not a valid email address", value)));
    }
    Ok(value)
}

/// Blank phone numbers count as absent.
fn phone_number(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|phone| !phone.is_empty())
        .map(str::to_string)
}

fn password(value: &str) -> Result<&str> {
    if value.is_empty() {
        return Err(Error::InvalidArgument("password must not be empty".to_string()));
    }
    Ok(value)
}

pub struct Accounts {
    users: Arc<dyn UserStorage>,
    passwords: Passwords,
}

impl Accounts {
    pub fn new(users: Arc<dyn UserStorage>, passwords: Passwords) -> Self {
        Self { users, passwords }
    }

    /// Hashes off the async runtime; Argon2 is slow on purpose.
    async fn hash(&self, password: &str) -> Result<String> {
        let passwords = self.passwords.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || passwords.hash(&password))
            .await
            .map_err(|e| Error::External(anyhow::Error::new(e).context("Password hashing failed")))?
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let passwords = self.passwords.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || passwords.verify(&password, &hash))
            .await
            .map_err(|e| Error::External(anyhow::Error::new(e).context("Password check failed")))
    }

    pub async fn sign_up(&self, form: SignUp) -> Result<User> {
        let new_user = NewUser {
            name: required("name", &form.name)?,
            email: email(&form.email)?,
            phone_number: phone_number(form.phone_number.as_deref()),
            password_hash: self.hash(password(&form.password)?).await?,
        };
        let user = self.users.create_user(&new_user).await?;
        info!("👤 Created user {}", user.id);
        Ok(user)
    }

    /// Returns a signed identity token for the matching account.
    pub async fn sign_in(&self, form: SignIn, tokens: &TokenAuthority) -> Result<String> {
        let email = form.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
        let phone = phone_number(form.phone_number.as_deref());
        if email.is_none() && phone.is_none() {
            return Err(Error::InvalidArgument(
                "email or phone_number is required".to_string(),
            ));
        }

        let user = self
            .users
            .find_login(email, phone.as_deref())
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        if !self.verify(&form.password, &user.password_hash).await? {
            return Err(Error::Unauthenticated(
                "Incorrect email, phone number, or password".to_string(),
            ));
        }
        tokens.issue(user.id)
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        self.users.find_users(&UserFilter::default()).await
    }

    pub async fn find(&self, filter: &UserFilter) -> Result<Vec<User>> {
        self.users.find_users(filter).await
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        self.users.get_user(id).await
    }

    pub async fn update(&self, current: CurrentUser, id: i64, form: ProfileUpdate) -> Result<User> {
        Self::check_owner(current, id)?;
        let password_hash = match form.password.as_deref() {
            Some(new_password) => Some(self.hash(password(new_password)?).await?),
            None => None,
        };
        let changes = UserChanges {
            name: form.name.as_deref().map(|n| required("name", n)).transpose()?,
            email: form.email.as_deref().map(email).transpose()?,
            phone_number: phone_number(form.phone_number.as_deref()),
            password_hash,
        };
        self.users.update_user(id, &changes).await
    }

    pub async fn delete(&self, current: CurrentUser, id: i64) -> Result<()> {
        Self::check_owner(current, id)?;
        self.users.delete_user(id).await?;
        info!("👤 Deleted user {}", id);
        Ok(())
    }

    fn check_owner(current: CurrentUser, id: i64) -> Result<()> {
        if current.user_id != id {
            return Err(Error::Forbidden(
                "Users can only change their own account".to_string(),
            ));
        }
        Ok(())
    }
}
