//! Test doubles shared by the command layer tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use eventflow_core::{
    CollectionKind, Event, Key, Notification, Registration, Role, Team, TeamMember, User,
};

use crate::gateway::Result;
use crate::{
    ClientConfig, EventFlow, EventPatch, Gateway, GatewayError, NotificationPatch,
    RegistrationPatch, TeamPatch,
};

/// Creates a client over the given gateway, with default config and no
/// persistence
pub fn client(gateway: MemoryGateway) -> EventFlow<MemoryGateway> {
    EventFlow::with_gateway(gateway, ClientConfig::default(), None)
}

/// A gateway holding its collections in memory, with injectable failures
/// and delays
#[derive(Clone, Default)]
pub struct MemoryGateway {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    events: Mutex<Vec<Event>>,
    users: Mutex<Vec<User>>,
    registrations: Mutex<Vec<Registration>>,
    teams: Mutex<Vec<Team>>,
    notifications: Mutex<Vec<Notification>>,

    failing: Mutex<HashSet<CollectionKind>>,
    delays: Mutex<HashMap<CollectionKind, Duration>>,
    failing_writes: Mutex<bool>,

    next_id: AtomicU64,
    update_calls: AtomicUsize,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every fetch of the given collection fail
    pub fn fail(&self, kind: CollectionKind) {
        self.inner.failing.lock().insert(kind);
    }

    pub fn recover(&self, kind: CollectionKind) {
        self.inner.failing.lock().remove(&kind);
    }

    /// Makes every fetch of the given collection hang for the duration
    pub fn delay(&self, kind: CollectionKind, duration: Duration) {
        self.inner.delays.lock().insert(kind, duration);
    }

    /// Makes every write fail
    pub fn fail_writes(&self, failing: bool) {
        *self.inner.failing_writes.lock() = failing;
    }

    /// How many update calls have been made, across all collections
    pub fn update_calls(&self) -> usize {
        self.inner.update_calls.load(Ordering::SeqCst)
    }

    pub fn seed_event(&self, id: &str, title: &str, max_participants: u32, registered: u32) {
        self.inner.events.lock().push(Event {
            id: id.to_string(),
            title: title.to_string(),
            description: "An event".to_string(),
            kind: "Conference".to_string(),
            date: "2024-03-15".to_string(),
            time: "09:00".to_string(),
            venue: "Hall A".to_string(),
            max_participants,
            registered,
            status: Default::default(),
            image: String::new(),
            schedule: vec![],
        });
    }

    pub fn seed_user(&self, id: &str, name: &str, email: &str, role: Role) {
        self.inner.users.lock().push(User {
            id: id.to_string(),
            provider_id: None,
            name: name.to_string(),
            email: email.to_string(),
            role,
            password: Some("hunter2".to_string()),
            photo_url: None,
        });
    }

    pub fn seed_registration(&self, id: &str, event_id: &str, user_id: &str, email: &str) {
        self.inner.registrations.lock().push(Registration {
            id: id.to_string(),
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
            name: "Seeded Person".to_string(),
            email: email.to_string(),
            status: Default::default(),
            check_in: false,
            registration_date: "2024-02-15".to_string(),
        });
    }

    pub fn seed_team(&self, id: &str, event_id: &str, invite_code: &str, members: Vec<TeamMember>) {
        self.inner.teams.lock().push(Team {
            id: id.to_string(),
            name: "Seeded Team".to_string(),
            event_id: event_id.to_string(),
            members,
            max_members: 4,
            invite_code: invite_code.to_string(),
        });
    }

    pub fn seed_notification_record(&self, notification: Notification) {
        self.inner.notifications.lock().push(notification);
    }

    pub fn member(id: &str, name: &str, role: &str) -> TeamMember {
        TeamMember {
            id: id.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.events.lock().clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.inner.users.lock().clone()
    }

    pub fn registrations(&self) -> Vec<Registration> {
        self.inner.registrations.lock().clone()
    }

    pub fn teams(&self) -> Vec<Team> {
        self.inner.teams.lock().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.notifications.lock().clone()
    }

    fn assign_id(&self) -> Key {
        let n = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;

        format!("G{}", n)
    }

    async fn fetch_guard(&self, kind: CollectionKind) -> Result<()> {
        let delay = self.inner.delays.lock().get(&kind).copied();

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.inner.failing.lock().contains(&kind) {
            return Err(GatewayError::Network("injected failure".to_string()));
        }

        Ok(())
    }

    fn write_guard(&self) -> Result<()> {
        if *self.inner.failing_writes.lock() {
            return Err(GatewayError::Network("injected write failure".to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn list_events(&self) -> Result<Vec<Event>> {
        self.fetch_guard(CollectionKind::Events).await?;

        Ok(self.events())
    }

    async fn create_event(&self, event: &Event) -> Result<Key> {
        self.write_guard()?;

        let mut stored = event.clone();
        stored.id = self.assign_id();

        let id = stored.id.clone();
        self.inner.events.lock().push(stored);

        Ok(id)
    }

    async fn update_event(&self, id: &str, patch: &EventPatch) -> Result<()> {
        self.write_guard()?;
        self.inner.update_calls.fetch_add(1, Ordering::SeqCst);

        let mut events = self.inner.events.lock();

        if let Some(event) = events.iter_mut().find(|e| e.id == id) {
            if let Some(title) = &patch.title {
                event.title = title.clone();
            }
            if let Some(description) = &patch.description {
                event.description = description.clone();
            }
            if let Some(kind) = &patch.kind {
                event.kind = kind.clone();
            }
            if let Some(date) = &patch.date {
                event.date = date.clone();
            }
            if let Some(time) = &patch.time {
                event.time = time.clone();
            }
            if let Some(venue) = &patch.venue {
                event.venue = venue.clone();
            }
            if let Some(max_participants) = patch.max_participants {
                event.max_participants = max_participants;
            }
            if let Some(registered) = patch.registered {
                event.registered = registered;
            }
            if let Some(status) = patch.status {
                event.status = status;
            }
            if let Some(image) = &patch.image {
                event.image = image.clone();
            }
        }

        Ok(())
    }

    async fn delete_event(&self, id: &str) -> Result<()> {
        self.write_guard()?;
        self.inner.events.lock().retain(|e| e.id != id);

        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.fetch_guard(CollectionKind::Users).await?;

        Ok(self.users())
    }

    async fn upsert_user(&self, user: &User) -> Result<User> {
        self.write_guard()?;

        let mut users = self.inner.users.lock();

        let existing = users
            .iter_mut()
            .find(|u| u.email.eq_ignore_ascii_case(&user.email));

        let merged = match existing {
            Some(existing) => {
                existing.name = user.name.clone();

                if user.provider_id.is_some() {
                    existing.provider_id = user.provider_id.clone();
                }
                if user.photo_url.is_some() {
                    existing.photo_url = user.photo_url.clone();
                }

                existing.clone()
            }
            None => {
                let mut stored = user.clone();
                stored.id = self.assign_id();

                users.push(stored.clone());
                stored
            }
        };

        Ok(merged)
    }

    async fn list_registrations(&self) -> Result<Vec<Registration>> {
        self.fetch_guard(CollectionKind::Registrations).await?;

        Ok(self.registrations())
    }

    async fn create_registration(&self, registration: &Registration) -> Result<Key> {
        self.write_guard()?;

        let mut stored = registration.clone();
        stored.id = self.assign_id();

        let id = stored.id.clone();
        self.inner.registrations.lock().push(stored);

        Ok(id)
    }

    async fn update_registration(&self, id: &str, patch: &RegistrationPatch) -> Result<()> {
        self.write_guard()?;
        self.inner.update_calls.fetch_add(1, Ordering::SeqCst);

        let mut registrations = self.inner.registrations.lock();

        if let Some(registration) = registrations.iter_mut().find(|r| r.id == id) {
            if let Some(status) = patch.status {
                registration.status = status;
            }
            if let Some(check_in) = patch.check_in {
                registration.check_in = check_in;
            }
        }

        Ok(())
    }

    async fn delete_registration(&self, id: &str) -> Result<()> {
        self.write_guard()?;
        self.inner.registrations.lock().retain(|r| r.id != id);

        Ok(())
    }

    async fn list_teams(&self) -> Result<Vec<Team>> {
        self.fetch_guard(CollectionKind::Teams).await?;

        Ok(self.teams())
    }

    async fn create_team(&self, team: &Team) -> Result<Key> {
        self.write_guard()?;

        let mut stored = team.clone();
        stored.id = self.assign_id();

        let id = stored.id.clone();
        self.inner.teams.lock().push(stored);

        Ok(id)
    }

    async fn update_team(&self, id: &str, patch: &TeamPatch) -> Result<()> {
        self.write_guard()?;
        self.inner.update_calls.fetch_add(1, Ordering::SeqCst);

        let mut teams = self.inner.teams.lock();

        if let Some(team) = teams.iter_mut().find(|t| t.id == id) {
            if let Some(members) = &patch.members {
                team.members = members.clone();
            }
        }

        Ok(())
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>> {
        self.fetch_guard(CollectionKind::Notifications).await?;

        Ok(self.notifications())
    }

    async fn create_notification(&self, notification: &Notification) -> Result<Key> {
        self.write_guard()?;

        let mut stored = notification.clone();
        stored.id = self.assign_id();

        let id = stored.id.clone();
        self.inner.notifications.lock().push(stored);

        Ok(id)
    }

    async fn update_notification(&self, id: &str, patch: &NotificationPatch) -> Result<()> {
        self.write_guard()?;
        self.inner.update_calls.fetch_add(1, Ordering::SeqCst);

        let mut notifications = self.inner.notifications.lock();

        if let Some(notification) = notifications.iter_mut().find(|n| n.id == id) {
            if let Some(read) = patch.read {
                notification.read = read;
            }
        }

        Ok(())
    }
}
