use crossbeam::channel::{Receiver, Sender};

pub type EventSender = Sender<StateEvent>;
pub type EventReceiver = Receiver<StateEvent>;

/// The five backend collections mirrored locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Events,
    Users,
    Registrations,
    Teams,
    Notifications,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 5] = [
        CollectionKind::Events,
        CollectionKind::Users,
        CollectionKind::Registrations,
        CollectionKind::Teams,
        CollectionKind::Notifications,
    ];

    /// The key this collection is seeded from and persisted under
    pub fn key(&self) -> &'static str {
        match self {
            CollectionKind::Events => "events",
            CollectionKind::Users => "users",
            CollectionKind::Registrations => "registrations",
            CollectionKind::Teams => "teams",
            CollectionKind::Notifications => "notifications",
        }
    }
}

/// Events emitted by the mirror and the sync loop, consumed by renderers
#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    /// A collection was wholesale-replaced by a sync tick
    CollectionReplaced { collection: CollectionKind },
    /// A collection was edited optimistically after a gateway write
    CollectionMutated { collection: CollectionKind },
    /// A sync tick finished. Emitted exactly once per tick, after every
    /// replacement of that tick, regardless of partial failure.
    SyncCompleted {
        updated: Vec<CollectionKind>,
        failed: Vec<CollectionKind>,
    },
    /// Every fetch of a tick failed. Emitted at most once for the lifetime
    /// of the loop, so the user is warned a single time.
    SyncOffline,
}
