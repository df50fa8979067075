use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// The type used for record identifiers.
///
/// Identifiers are opaque strings assigned by the backing store, so local
/// code never fabricates one except for synthetic actors such as the
/// built-in admin account.
pub type Key = String;

/// An event that participants can browse and register for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub id: Key,
    pub title: String,
    pub description: String,
    /// Conference, Hackathon, Workshop, and so on
    #[serde(rename = "type")]
    pub kind: String,
    /// Date in `YYYY-MM-DD` form
    pub date: String,
    /// Start time in `HH:MM` form
    pub time: String,
    pub venue: String,
    pub max_participants: u32,
    /// How many registrations count toward this event.
    /// Maintained by a separate write alongside each registration,
    /// so it can drift under concurrent writers.
    #[serde(default)]
    pub registered: u32,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schedule: Vec<ScheduleEntry>,
}

/// A single slot in an event's programme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub time: String,
    pub title: String,
    pub speaker: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Upcoming,
    Active,
    Completed,
    Cancelled,
}

/// An account known to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: Key,
    /// The subject identifier assigned by the external identity provider.
    /// Kept separate from the store's own primary key; the two identity
    /// spaces are merged by upserting on email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    /// Only present for accounts created through manual sign-up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(
        default,
        rename = "photoURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Participant,
}

/// A participant's registration for an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(default)]
    pub id: Key,
    pub event_id: Key,
    pub user_id: Key,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub status: RegistrationStatus,
    /// Attendance confirmation. Transitions false to true only; no exposed
    /// operation reverses it.
    #[serde(default)]
    pub check_in: bool,
    /// Date in `YYYY-MM-DD` form
    pub registration_date: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    #[default]
    Confirmed,
    Pending,
}

/// A team formed for an event, joined via invite code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(default)]
    pub id: Key,
    pub name: String,
    pub event_id: Key,
    /// Ordered member list. The first member is the team lead.
    pub members: Vec<TeamMember>,
    pub max_members: u32,
    pub invite_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: Key,
    pub name: String,
    /// "Team Lead" for the founding member, "Member" for everyone else
    pub role: String,
    pub email: String,
}

impl Team {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.id == user_id)
    }

    pub fn is_full(&self) -> bool {
        self.members.len() as u32 >= self.max_members
    }
}

/// An announcement broadcast by an admin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default)]
    pub id: Key,
    pub title: String,
    pub message: String,
    /// Either the sentinel `all` or `event_<id>`
    pub recipients: String,
    /// A single flag shared by every viewer; marking read is a global effect
    #[serde(default)]
    pub read: bool,
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    /// Creation time in milliseconds since the epoch
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl Notification {
    /// Returns true if this notification targets every participant
    pub fn targets_all(&self) -> bool {
        self.recipients == Recipient::ALL
    }

    /// Returns the targeted event id, if this notification targets one event
    pub fn target_event(&self) -> Option<&str> {
        self.recipients.strip_prefix(Recipient::EVENT_PREFIX)
    }
}

/// The audience of a notification, rendered to the wire as
/// `all` or `event_<id>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    All,
    Event(Key),
}

impl Recipient {
    pub const ALL: &'static str = "all";
    pub const EVENT_PREFIX: &'static str = "event_";
}

impl Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::All => f.write_str(Self::ALL),
            Recipient::Event(id) => write!(f, "{}{}", Self::EVENT_PREFIX, id),
        }
    }
}
