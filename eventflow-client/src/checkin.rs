use serde::{Deserialize, Serialize};
use thiserror::Error;

use eventflow_core::Registration;

use crate::{ClientContext, Gateway, GatewayError, RegistrationPatch};

pub type Result<T> = std::result::Result<T, CheckInError>;

/// The payload encoded in an event's check-in QR code.
///
/// The payload is plain JSON and carries no signature; possession of the
/// code is the only credential, as with a printed badge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub event_id: String,
}

impl QrPayload {
    pub const KIND: &'static str = "event_checkin";

    /// The payload to encode into an event's QR code
    pub fn for_event(event_id: &str) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            event_id: event_id.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CheckInError {
    #[error("this code is not an event check-in code")]
    InvalidPayload,

    #[error("sign in to check in")]
    NotSignedIn,

    #[error("event not found")]
    EventNotFound,

    #[error("you are not registered for this event")]
    NotRegistered,

    #[error("no registration matches that email or id")]
    NotFound,

    #[error("{attendee} is already checked in")]
    AlreadyCheckedIn { attendee: String },

    /// The check-in write did not go through; the attendee stays
    /// unchecked and can try again
    #[error("could not save the check-in: {0}")]
    PersistFailed(#[from] GatewayError),
}

/// What the attendee (or the desk) sees after a successful check-in
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInConfirmation {
    pub attendee: String,
    pub event_title: String,
    pub date: String,
    pub time: String,
    pub venue: String,
}

/// Attendance confirmation, by QR scan or by desk lookup
pub struct CheckInManager<G> {
    context: ClientContext<G>,
}

impl<G> CheckInManager<G>
where
    G: Gateway,
{
    pub fn new(context: &ClientContext<G>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Checks in the attendee matching the query, which is either an
    /// email (matched case-insensitively) or an exact registration id.
    /// This is the desk fallback for attendees without their code.
    pub async fn manual(&self, query: &str) -> Result<CheckInConfirmation> {
        let registration = self
            .context
            .mirror
            .registration_by_email_or_id(query)
            .ok_or(CheckInError::NotFound)?;

        self.confirm(registration).await
    }

    /// Checks in the signed-in user by the raw contents of a scanned code
    pub async fn scan(&self, raw: &str) -> Result<CheckInConfirmation> {
        let payload: QrPayload =
            serde_json::from_str(raw).map_err(|_| CheckInError::InvalidPayload)?;

        if payload.kind != QrPayload::KIND {
            return Err(CheckInError::InvalidPayload);
        }

        let mirror = &self.context.mirror;

        mirror
            .event_by_id(&payload.event_id)
            .ok_or(CheckInError::EventNotFound)?;

        let user = self.context.current_user().ok_or(CheckInError::NotSignedIn)?;

        let registration = mirror
            .registration_for(&payload.event_id, &user.id)
            .ok_or(CheckInError::NotRegistered)?;

        self.confirm(registration).await
    }

    async fn confirm(&self, registration: Registration) -> Result<CheckInConfirmation> {
        // A second check-in is rejected before any write happens
        if registration.check_in {
            return Err(CheckInError::AlreadyCheckedIn {
                attendee: registration.name,
            });
        }

        let event = self
            .context
            .mirror
            .event_by_id(&registration.event_id)
            .ok_or(CheckInError::EventNotFound)?;

        let patch = RegistrationPatch {
            check_in: Some(true),
            ..Default::default()
        };

        self.context
            .gateway
            .update_registration(&registration.id, &patch)
            .await?;

        self.context.mirror.mutate_registrations(|registrations| {
            if let Some(found) = registrations.iter_mut().find(|r| r.id == registration.id) {
                found.check_in = true;
            }
        });

        Ok(CheckInConfirmation {
            attendee: registration.name,
            event_title: event.title,
            date: event.date,
            time: event.time,
            venue: event.venue,
        })
    }
}
