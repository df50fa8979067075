//! The eventflow client system, facilitating polling sync, authentication,
//! and the registration, team, check-in, and notification workflows.

mod auth;
mod checkin;
mod config;
mod events;
mod gateway;
mod notifications;
mod registrations;
mod sync;
mod teams;
mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::*;
pub use checkin::*;
pub use config::*;
pub use events::*;
pub use gateway::*;
pub use notifications::*;
pub use registrations::*;
pub use sync::*;
pub use teams::*;

use parking_lot::RwLock;
use std::sync::Arc;

use eventflow_core::{keys, BoxedPersistence, EventReceiver, Mirror, User};

/// The top-level client, wiring the gateway, the mirror, the sync loop,
/// and the command layer together.
pub struct EventFlow<G = RestGateway> {
    context: ClientContext<G>,

    pub sync: SyncLoop<G>,
    pub auth: Auth<G>,
    pub events: EventManager<G>,
    pub registrations: RegistrationManager<G>,
    pub checkin: CheckInManager<G>,
    pub teams: TeamManager<G>,
    pub notifications: NotificationManager<G>,
}

/// A type passed to the various commands, to access the gateway, the
/// mirror, and the current session
pub struct ClientContext<G> {
    pub config: ClientConfig,
    pub gateway: Arc<G>,
    pub mirror: Arc<Mirror>,
    pub session: Arc<RwLock<Option<User>>>,
    pub persistence: Option<BoxedPersistence>,
}

impl EventFlow<RestGateway> {
    /// Creates a client talking to the REST backend named by the config
    pub fn new(config: ClientConfig) -> gateway::Result<Self> {
        let gateway = RestGateway::new(&config.api_base)?;

        Ok(Self::with_gateway(gateway, config, None))
    }

    /// Like [EventFlow::new], but seeding and persisting last-known state
    /// through the given store
    pub fn with_persistence(
        config: ClientConfig,
        persistence: BoxedPersistence,
    ) -> gateway::Result<Self> {
        let gateway = RestGateway::new(&config.api_base)?;

        Ok(Self::with_gateway(gateway, config, Some(persistence)))
    }
}

impl<G> EventFlow<G>
where
    G: Gateway,
{
    /// Creates a client over any gateway implementation
    pub fn with_gateway(
        gateway: G,
        config: ClientConfig,
        persistence: Option<BoxedPersistence>,
    ) -> Self {
        let mirror = match &persistence {
            Some(persistence) => Mirror::with_persistence(persistence.clone()),
            None => Mirror::new(),
        };

        let context = ClientContext {
            session: Arc::new(RwLock::new(load_session(&persistence))),
            gateway: Arc::new(gateway),
            mirror: Arc::new(mirror),
            persistence,
            config,
        };

        Self {
            sync: SyncLoop::new(&context),
            auth: Auth::new(&context),
            events: EventManager::new(&context),
            registrations: RegistrationManager::new(&context),
            checkin: CheckInManager::new(&context),
            teams: TeamManager::new(&context),
            notifications: NotificationManager::new(&context),
            context,
        }
    }

    /// Registers a renderer that receives every state event from now on
    pub fn subscribe(&self) -> EventReceiver {
        self.context.mirror.subscribe()
    }

    /// The local mirror, which is the single source of truth for rendering
    pub fn mirror(&self) -> &Arc<Mirror> {
        &self.context.mirror
    }

    pub fn current_user(&self) -> Option<User> {
        self.context.current_user()
    }

    pub fn dark_mode(&self) -> bool {
        self.context
            .persistence
            .as_ref()
            .and_then(|p| p.load(keys::DARK_MODE).ok().flatten())
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }

    pub fn set_dark_mode(&self, enabled: bool) {
        if let Some(persistence) = &self.context.persistence {
            if let Err(e) = persistence.save(keys::DARK_MODE, &enabled.into()) {
                log::warn!("Failed to persist dark mode preference: {}", e);
            }
        }
    }
}

impl<G> ClientContext<G> {
    pub fn current_user(&self) -> Option<User> {
        self.session.read().clone()
    }

    /// Replaces the session, persisting it so a restart can resume it
    pub fn set_session(&self, user: Option<User>) {
        if let Some(persistence) = &self.persistence {
            let result = match &user {
                Some(user) => serde_json::to_value(user)
                    .map_err(Into::into)
                    .and_then(|value| persistence.save(keys::CURRENT_USER, &value)),
                None => persistence.remove(keys::CURRENT_USER),
            };

            if let Err(e) = result {
                log::warn!("Failed to persist session: {}", e);
            }
        }

        *self.session.write() = user;
    }
}

impl<G> Clone for ClientContext<G> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            gateway: self.gateway.clone(),
            mirror: self.mirror.clone(),
            session: self.session.clone(),
            persistence: self.persistence.clone(),
        }
    }
}

fn load_session(persistence: &Option<BoxedPersistence>) -> Option<User> {
    let value = persistence.as_ref()?.load(keys::CURRENT_USER).ok()??;

    serde_json::from_value(value).ok()
}
