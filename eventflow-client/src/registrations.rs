use thiserror::Error;

use eventflow_core::{Registration, RegistrationStatus, User};

use crate::util::today;
use crate::{ClientContext, EventPatch, Gateway, GatewayError, RegistrationPatch};

pub type Result<T> = std::result::Result<T, RegistrationError>;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("sign in to register for events")]
    NotSignedIn,

    #[error("event not found")]
    EventNotFound,

    #[error("you are already registered for this event")]
    AlreadyRegistered,

    #[error("registration not found")]
    NotFound,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Manages the registrations collection and the per-event attendance
/// counter.
///
/// The counter on the event record is bookkeeping written alongside each
/// registration, not derived from it, matching the backend's data shape.
/// Concurrent writers can therefore make it drift from the actual number
/// of registration records.
pub struct RegistrationManager<G> {
    context: ClientContext<G>,
}

impl<G> RegistrationManager<G>
where
    G: Gateway,
{
    pub fn new(context: &ClientContext<G>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Registers the signed-in user for an event.
    ///
    /// Capacity is advisory and not enforced here; an event can go over
    /// its maximum if people keep registering.
    pub async fn register(&self, event_id: &str) -> Result<Registration> {
        let user = self.context.current_user().ok_or(RegistrationError::NotSignedIn)?;

        let mirror = &self.context.mirror;

        mirror
            .event_by_id(event_id)
            .ok_or(RegistrationError::EventNotFound)?;

        if mirror.registration_for(event_id, &user.id).is_some() {
            return Err(RegistrationError::AlreadyRegistered);
        }

        self.insert(registration_for(&user, event_id)).await
    }

    /// Adds an attendee by name and email, on behalf of an admin.
    ///
    /// No duplicate check is made; the same person can be added twice and
    /// each addition bumps the counter.
    pub async fn add(&self, event_id: &str, name: &str, email: &str) -> Result<Registration> {
        self.context
            .mirror
            .event_by_id(event_id)
            .ok_or(RegistrationError::EventNotFound)?;

        let registration = Registration {
            id: String::new(),
            event_id: event_id.to_string(),
            user_id: String::new(),
            name: name.to_string(),
            email: email.to_string(),
            status: Default::default(),
            check_in: false,
            registration_date: today(),
        };

        self.insert(registration).await
    }

    /// Cancels a registration, releasing its slot on the counter
    pub async fn cancel(&self, registration_id: &str) -> Result<()> {
        let registration = self
            .context
            .mirror
            .registrations()
            .into_iter()
            .find(|r| r.id == registration_id)
            .ok_or(RegistrationError::NotFound)?;

        self.adjust_registered(&registration.event_id, -1).await?;
        self.context.gateway.delete_registration(registration_id).await?;

        self.context.mirror.mutate_registrations(|registrations| {
            registrations.retain(|r| r.id != registration_id);
        });

        Ok(())
    }

    /// Flips a registration between confirmed and pending
    pub async fn toggle_status(&self, registration_id: &str) -> Result<RegistrationStatus> {
        let registration = self
            .context
            .mirror
            .registrations()
            .into_iter()
            .find(|r| r.id == registration_id)
            .ok_or(RegistrationError::NotFound)?;

        let next = match registration.status {
            RegistrationStatus::Confirmed => RegistrationStatus::Pending,
            RegistrationStatus::Pending => RegistrationStatus::Confirmed,
        };

        let patch = RegistrationPatch {
            status: Some(next),
            ..Default::default()
        };

        self.context
            .gateway
            .update_registration(registration_id, &patch)
            .await?;

        self.context.mirror.mutate_registrations(|registrations| {
            if let Some(registration) = registrations.iter_mut().find(|r| r.id == registration_id) {
                registration.status = next;
            }
        });

        Ok(next)
    }

    async fn insert(&self, mut registration: Registration) -> Result<Registration> {
        registration.id = self
            .context
            .gateway
            .create_registration(&registration)
            .await?;

        self.adjust_registered(&registration.event_id, 1).await?;

        let created = registration.clone();
        self.context.mirror.mutate_registrations(|registrations| {
            registrations.push(registration);
        });

        Ok(created)
    }

    /// The second half of the dual write: bumps the event's counter,
    /// flooring at zero
    async fn adjust_registered(&self, event_id: &str, delta: i64) -> Result<()> {
        let current = self
            .context
            .mirror
            .event_by_id(event_id)
            .map(|e| e.registered)
            .unwrap_or_default();

        let next = (current as i64 + delta).max(0) as u32;

        let patch = EventPatch {
            registered: Some(next),
            ..Default::default()
        };

        self.context.gateway.update_event(event_id, &patch).await?;

        self.context.mirror.mutate_events(|events| {
            if let Some(event) = events.iter_mut().find(|e| e.id == event_id) {
                event.registered = next;
            }
        });

        Ok(())
    }
}

fn registration_for(user: &User, event_id: &str) -> Registration {
    Registration {
        id: String::new(),
        event_id: event_id.to_string(),
        user_id: user.id.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
        status: Default::default(),
        check_in: false,
        registration_date: today(),
    }
}
