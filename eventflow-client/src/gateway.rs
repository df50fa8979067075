use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use eventflow_core::{
    Event, EventStatus, Key, Notification, Registration, RegistrationStatus, Team, TeamMember,
    User,
};

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid API base url: {0}")]
    InvalidBaseUrl(String),

    /// The request never produced a response
    #[error("request failed: {0}")]
    Network(String),

    /// The server answered with a non-2xx status
    #[error("server responded with {status}: {message}")]
    Server { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Partial update of an event. Only the present fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RegistrationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<TeamMember>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NotificationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
}

/// Represents a type that can reach the five backend collections.
///
/// The gateway performs no retries; a failed write is surfaced to the
/// caller immediately and retry policy, if any, belongs there.
#[async_trait]
pub trait Gateway: Send + Sync + 'static {
    async fn list_events(&self) -> Result<Vec<Event>>;
    async fn create_event(&self, event: &Event) -> Result<Key>;
    async fn update_event(&self, id: &str, patch: &EventPatch) -> Result<()>;
    async fn delete_event(&self, id: &str) -> Result<()>;

    async fn list_users(&self) -> Result<Vec<User>>;
    /// Creates or updates the user keyed by email, returning the merged
    /// record so provider identities reconcile with store identities
    async fn upsert_user(&self, user: &User) -> Result<User>;

    async fn list_registrations(&self) -> Result<Vec<Registration>>;
    async fn create_registration(&self, registration: &Registration) -> Result<Key>;
    async fn update_registration(&self, id: &str, patch: &RegistrationPatch) -> Result<()>;
    async fn delete_registration(&self, id: &str) -> Result<()>;

    async fn list_teams(&self) -> Result<Vec<Team>>;
    async fn create_team(&self, team: &Team) -> Result<Key>;
    async fn update_team(&self, id: &str, patch: &TeamPatch) -> Result<()>;

    async fn list_notifications(&self) -> Result<Vec<Notification>>;
    async fn create_notification(&self, notification: &Notification) -> Result<Key>;
    async fn update_notification(&self, id: &str, patch: &NotificationPatch) -> Result<()>;
}

/// The record shape returned by create endpoints
#[derive(Debug, Deserialize)]
struct Created {
    id: Key,
}

/// A gateway speaking JSON over HTTP to the REST backend
pub struct RestGateway {
    client: Client,
    base: Url,
}

impl RestGateway {
    pub fn new(api_base: &str) -> Result<Self> {
        // A trailing slash makes Url::join treat the base as a directory
        let mut base = api_base.trim_end_matches('/').to_string();
        base.push('/');

        let base = Url::parse(&base).map_err(|e| GatewayError::InvalidBaseUrl(e.to_string()))?;

        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| GatewayError::InvalidBaseUrl(e.to_string()))
    }

    async fn list<T>(&self, resource: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .client
            .get(self.endpoint(resource)?)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn create<B>(&self, resource: &str, body: &B) -> Result<Key>
    where
        B: Serialize + Sync,
    {
        let created: Created = self.post(resource, body).await?;

        Ok(created.id)
    }

    async fn post<T, B>(&self, resource: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let response = self
            .client
            .post(self.endpoint(resource)?)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn put<B>(&self, resource: &str, id: &str, body: &B) -> Result<()>
    where
        B: Serialize + Sync,
    {
        let response = self
            .client
            .put(self.endpoint(&format!("{}/{}", resource, id))?)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        check_status(response).await?;

        Ok(())
    }

    async fn remove(&self, resource: &str, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.endpoint(&format!("{}/{}", resource, id))?)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        check_status(response).await?;

        Ok(())
    }
}

#[async_trait]
impl Gateway for RestGateway {
    async fn list_events(&self) -> Result<Vec<Event>> {
        self.list("events").await
    }

    async fn create_event(&self, event: &Event) -> Result<Key> {
        self.create("events", event).await
    }

    async fn update_event(&self, id: &str, patch: &EventPatch) -> Result<()> {
        self.put("events", id, patch).await
    }

    async fn delete_event(&self, id: &str) -> Result<()> {
        self.remove("events", id).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.list("users").await
    }

    async fn upsert_user(&self, user: &User) -> Result<User> {
        self.post("users", user).await
    }

    async fn list_registrations(&self) -> Result<Vec<Registration>> {
        self.list("registrations").await
    }

    async fn create_registration(&self, registration: &Registration) -> Result<Key> {
        self.create("registrations", registration).await
    }

    async fn update_registration(&self, id: &str, patch: &RegistrationPatch) -> Result<()> {
        self.put("registrations", id, patch).await
    }

    async fn delete_registration(&self, id: &str) -> Result<()> {
        self.remove("registrations", id).await
    }

    async fn list_teams(&self) -> Result<Vec<Team>> {
        self.list("teams").await
    }

    async fn create_team(&self, team: &Team) -> Result<Key> {
        self.create("teams", team).await
    }

    async fn update_team(&self, id: &str, patch: &TeamPatch) -> Result<()> {
        self.put("teams", id, patch).await
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>> {
        self.list("notifications").await
    }

    async fn create_notification(&self, notification: &Notification) -> Result<Key> {
        self.create("notifications", notification).await
    }

    async fn update_notification(&self, id: &str, patch: &NotificationPatch) -> Result<()> {
        self.put("notifications", id, patch).await
    }
}

/// The error body produced by the backend
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let message = match response.text().await {
        Ok(text) => match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => body.error,
            Err(_) => text,
        },
        Err(e) => e.to_string(),
    };

    Err(GatewayError::Server {
        status: status.as_u16(),
        message,
    })
}
