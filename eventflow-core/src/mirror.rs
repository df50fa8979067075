use crossbeam::channel::unbounded;
use log::warn;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{
    BoxedPersistence, CollectionKind, Event, EventReceiver, EventSender, Notification,
    Registration, StateEvent, Team, User,
};

/// The local, observable copy of the five backend collections.
///
/// The mirror is a lagging cache: the backing store is the authority, and
/// each collection is wholesale-replaced on every successful sync tick.
/// Command handlers may edit it optimistically after a gateway write; the
/// next tick overwrites those edits, which is the reconciliation point.
pub struct Mirror {
    events: RwLock<Vec<Event>>,
    users: RwLock<Vec<User>>,
    registrations: RwLock<Vec<Registration>>,
    teams: RwLock<Vec<Team>>,
    notifications: RwLock<Vec<Notification>>,

    subscribers: Mutex<Vec<EventSender>>,
    persistence: Option<BoxedPersistence>,
}

impl Mirror {
    pub fn new() -> Self {
        Self {
            events: Default::default(),
            users: Default::default(),
            registrations: Default::default(),
            teams: Default::default(),
            notifications: Default::default(),
            subscribers: Default::default(),
            persistence: None,
        }
    }

    /// Creates a mirror seeded from the given store. The seed is only a
    /// cold-start convenience; the first sync tick overwrites it.
    pub fn with_persistence(persistence: BoxedPersistence) -> Self {
        let mirror = Self {
            persistence: Some(persistence),
            ..Self::new()
        };

        *mirror.events.write() = mirror.seed(CollectionKind::Events);
        *mirror.users.write() = mirror.seed(CollectionKind::Users);
        *mirror.registrations.write() = mirror.seed(CollectionKind::Registrations);
        *mirror.teams.write() = mirror.seed(CollectionKind::Teams);
        *mirror.notifications.write() = mirror.seed(CollectionKind::Notifications);

        mirror
    }

    /// Registers a subscriber that receives every state event from now on
    pub fn subscribe(&self) -> EventReceiver {
        let (sender, receiver) = unbounded();
        self.subscribers.lock().push(sender);

        receiver
    }

    /// Sends an event to all subscribers, dropping the disconnected ones
    pub fn broadcast(&self, event: StateEvent) {
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.users.read().clone()
    }

    pub fn registrations(&self) -> Vec<Registration> {
        self.registrations.read().clone()
    }

    pub fn teams(&self) -> Vec<Team> {
        self.teams.read().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().clone()
    }

    pub fn replace_events(&self, items: Vec<Event>) {
        self.replace(&self.events, CollectionKind::Events, items)
    }

    pub fn replace_users(&self, items: Vec<User>) {
        self.replace(&self.users, CollectionKind::Users, items)
    }

    pub fn replace_registrations(&self, items: Vec<Registration>) {
        self.replace(&self.registrations, CollectionKind::Registrations, items)
    }

    pub fn replace_teams(&self, items: Vec<Team>) {
        self.replace(&self.teams, CollectionKind::Teams, items)
    }

    pub fn replace_notifications(&self, items: Vec<Notification>) {
        self.replace(&self.notifications, CollectionKind::Notifications, items)
    }

    pub fn mutate_events<F>(&self, f: F)
    where
        F: FnOnce(&mut Vec<Event>),
    {
        self.mutate(&self.events, CollectionKind::Events, f)
    }

    pub fn mutate_users<F>(&self, f: F)
    where
        F: FnOnce(&mut Vec<User>),
    {
        self.mutate(&self.users, CollectionKind::Users, f)
    }

    pub fn mutate_registrations<F>(&self, f: F)
    where
        F: FnOnce(&mut Vec<Registration>),
    {
        self.mutate(&self.registrations, CollectionKind::Registrations, f)
    }

    pub fn mutate_teams<F>(&self, f: F)
    where
        F: FnOnce(&mut Vec<Team>),
    {
        self.mutate(&self.teams, CollectionKind::Teams, f)
    }

    pub fn mutate_notifications<F>(&self, f: F)
    where
        F: FnOnce(&mut Vec<Notification>),
    {
        self.mutate(&self.notifications, CollectionKind::Notifications, f)
    }

    /// Returns the event with the given id, if mirrored
    pub fn event_by_id(&self, id: &str) -> Option<Event> {
        self.events.read().iter().find(|e| e.id == id).cloned()
    }

    /// Returns the user with the given email, if mirrored
    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.users
            .read()
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    /// Returns a user's registration for an event, if any
    pub fn registration_for(&self, event_id: &str, user_id: &str) -> Option<Registration> {
        self.registrations
            .read()
            .iter()
            .find(|r| r.event_id == event_id && r.user_id == user_id)
            .cloned()
    }

    pub fn registrations_for_user(&self, user_id: &str) -> Vec<Registration> {
        self.registrations
            .read()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Looks up a registration by email (case-insensitive) or exact id
    pub fn registration_by_email_or_id(&self, query: &str) -> Option<Registration> {
        self.registrations
            .read()
            .iter()
            .find(|r| r.email.eq_ignore_ascii_case(query) || r.id == query)
            .cloned()
    }

    pub fn team_by_invite_code(&self, code: &str) -> Option<Team> {
        self.teams
            .read()
            .iter()
            .find(|t| t.invite_code == code)
            .cloned()
    }

    fn replace<T>(&self, collection: &RwLock<Vec<T>>, kind: CollectionKind, items: Vec<T>)
    where
        T: Serialize,
    {
        self.persist(kind, &items);
        *collection.write() = items;

        self.broadcast(StateEvent::CollectionReplaced { collection: kind });
    }

    fn mutate<T, F>(&self, collection: &RwLock<Vec<T>>, kind: CollectionKind, f: F)
    where
        T: Serialize,
        F: FnOnce(&mut Vec<T>),
    {
        {
            let mut guard = collection.write();
            f(&mut guard);
            self.persist(kind, &guard);
        }

        self.broadcast(StateEvent::CollectionMutated { collection: kind });
    }

    fn persist<T>(&self, kind: CollectionKind, items: &[T])
    where
        T: Serialize,
    {
        let Some(persistence) = &self.persistence else {
            return;
        };

        let value = match serde_json::to_value(items) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to serialize {} for the seed store: {}", kind.key(), e);
                return;
            }
        };

        if let Err(e) = persistence.save(kind.key(), &value) {
            warn!("Failed to persist {}: {}", kind.key(), e);
        }
    }

    fn seed<T>(&self, kind: CollectionKind) -> Vec<T>
    where
        T: DeserializeOwned,
    {
        let Some(persistence) = &self.persistence else {
            return Vec::new();
        };

        let value = match persistence.load(kind.key()) {
            Ok(Some(value)) => value,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to load seed for {}: {}", kind.key(), e);
                return Vec::new();
            }
        };

        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!("Discarding malformed seed for {}: {}", kind.key(), e);
            Vec::new()
        })
    }
}

impl Default for Mirror {
    fn default() -> Self {
        Self::new()
    }
}
