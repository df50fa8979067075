use thiserror::Error;

use eventflow_core::{Role, User};

use crate::{ClientContext, Gateway, GatewayError};

pub type Result<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The users collection has not arrived yet, so credentials cannot be
    /// verified one way or the other
    #[error("still connecting to the backend, try again in a moment")]
    UsersNotSynced,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    EmailTaken,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Establishes and tears down the session
pub struct Auth<G> {
    context: ClientContext<G>,
}

impl<G> Auth<G>
where
    G: Gateway,
{
    pub fn new(context: &ClientContext<G>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Signs in the built-in admin account. The admin is synthetic and
    /// never lives in the users collection.
    pub fn login_admin(&self, email: &str, password: &str) -> Result<User> {
        let config = &self.context.config;

        if email != config.admin_email || password != config.admin_password {
            return Err(AuthError::InvalidCredentials);
        }

        let admin = User {
            id: "admin".to_string(),
            provider_id: None,
            name: "Admin".to_string(),
            email: config.admin_email.clone(),
            role: Role::Admin,
            password: None,
            photo_url: None,
        };

        self.context.set_session(Some(admin.clone()));

        Ok(admin)
    }

    /// Signs in a participant against the mirrored users collection.
    ///
    /// An empty mirror is indistinguishable from a backend that has not
    /// answered yet, so it is reported as "not synced" rather than as a
    /// credential failure.
    pub fn login_participant(&self, email: &str, password: &str) -> Result<User> {
        let mirror = &self.context.mirror;

        if mirror.users().is_empty() {
            return Err(AuthError::UsersNotSynced);
        }

        let user = mirror
            .user_by_email(email)
            .filter(|user| user.password.as_deref() == Some(password))
            .ok_or(AuthError::InvalidCredentials)?;

        self.context.set_session(Some(user.clone()));

        Ok(user)
    }

    /// Creates a participant account and signs it in
    pub async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let mirror = &self.context.mirror;

        if mirror.user_by_email(email).is_some() {
            return Err(AuthError::EmailTaken);
        }

        let user = User {
            id: String::new(),
            provider_id: None,
            name: name.to_string(),
            email: email.to_string(),
            role: Role::Participant,
            password: Some(password.to_string()),
            photo_url: None,
        };

        let user = self.context.gateway.upsert_user(&user).await?;

        self.remember(user.clone());

        Ok(user)
    }

    /// Signs in through an external identity provider.
    ///
    /// The provider's subject identifier is reconciled with the store's
    /// own keys by upserting on email, so a participant who signed up
    /// manually and later arrives through a provider keeps one account.
    pub async fn login_with_provider(
        &self,
        subject: &str,
        name: &str,
        email: &str,
        photo_url: Option<&str>,
    ) -> Result<User> {
        let user = User {
            id: String::new(),
            provider_id: Some(subject.to_string()),
            name: name.to_string(),
            email: email.to_string(),
            role: Role::Participant,
            password: None,
            photo_url: photo_url.map(str::to_string),
        };

        let user = self.context.gateway.upsert_user(&user).await?;

        self.remember(user.clone());

        Ok(user)
    }

    pub fn logout(&self) {
        self.context.set_session(None);
    }

    /// Stores the signed-in user in the session and in the mirror, so the
    /// account is visible locally before the next sync tick
    fn remember(&self, user: User) {
        let id = user.id.clone();

        self.context.mirror.mutate_users(|users| {
            match users.iter_mut().find(|u| u.id == id) {
                Some(existing) => *existing = user.clone(),
                None => users.push(user.clone()),
            }
        });

        self.context.set_session(Some(user));
    }
}
