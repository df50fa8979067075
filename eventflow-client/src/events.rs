use thiserror::Error;

use eventflow_core::{Event, Key, ScheduleEntry};

use crate::{ClientContext, EventPatch, Gateway, GatewayError};

pub type Result<T> = std::result::Result<T, EventError>;

/// Shown when an event is created without a picture
pub const STOCK_IMAGE: &str =
    "https://images.unsplash.com/photo-1540575467063-178a50c2df87?w=800";

#[derive(Debug, Error)]
pub enum EventError {
    #[error("the {0} field is required")]
    MissingField(&'static str),

    #[error("maximum participants must be at least 1")]
    InvalidCapacity,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// The fields an admin fills in when creating an event
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub kind: String,
    pub date: String,
    pub time: String,
    pub venue: String,
    pub max_participants: u32,
    pub image: Option<String>,
    pub schedule: Vec<ScheduleEntry>,
}

/// Admin-side management of the events collection.
///
/// Every write goes to the gateway first; the mirror is only edited after
/// the write succeeds, so a failed write leaves the local state untouched.
pub struct EventManager<G> {
    context: ClientContext<G>,
}

impl<G> EventManager<G>
where
    G: Gateway,
{
    pub fn new(context: &ClientContext<G>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn create(&self, draft: EventDraft) -> Result<Event> {
        let mut event = validate(draft)?;

        event.id = self.context.gateway.create_event(&event).await?;

        let created = event.clone();
        self.context.mirror.mutate_events(|events| {
            events.push(event);
        });

        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: EventPatch) -> Result<()> {
        self.context.gateway.update_event(id, &patch).await?;

        self.context.mirror.mutate_events(|events| {
            if let Some(event) = events.iter_mut().find(|e| e.id == id) {
                apply_patch(event, &patch);
            }
        });

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.context.gateway.delete_event(id).await?;

        self.context.mirror.mutate_events(|events| {
            events.retain(|e| e.id != id);
        });

        Ok(())
    }
}

fn validate(draft: EventDraft) -> Result<Event> {
    let required = [
        ("title", &draft.title),
        ("description", &draft.description),
        ("type", &draft.kind),
        ("date", &draft.date),
        ("time", &draft.time),
        ("venue", &draft.venue),
    ];

    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(EventError::MissingField(name));
        }
    }

    if draft.max_participants == 0 {
        return Err(EventError::InvalidCapacity);
    }

    Ok(Event {
        id: Key::new(),
        title: draft.title,
        description: draft.description,
        kind: draft.kind,
        date: draft.date,
        time: draft.time,
        venue: draft.venue,
        max_participants: draft.max_participants,
        registered: 0,
        status: Default::default(),
        image: draft.image.unwrap_or_else(|| STOCK_IMAGE.to_string()),
        schedule: draft.schedule,
    })
}

fn apply_patch(event: &mut Event, patch: &EventPatch) {
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

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{client, MemoryGateway};
    use eventflow_core::EventStatus;

    fn draft() -> EventDraft {
        EventDraft {
            title: "Tech Summit".to_string(),
            description: "Annual conference".to_string(),
            kind: "Conference".to_string(),
            date: "2024-03-15".to_string(),
            time: "09:00".to_string(),
            venue: "Hall A".to_string(),
            max_participants: 500,
            image: None,
            schedule: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_validates_required_fields() {
        let flow = client(MemoryGateway::new());

        let missing_title = EventDraft {
            title: "  ".to_string(),
            ..draft()
        };
        assert!(matches!(
            flow.events.create(missing_title).await,
            Err(EventError::MissingField("title"))
        ));

        let zero_capacity = EventDraft {
            max_participants: 0,
            ..draft()
        };
        assert!(matches!(
            flow.events.create(zero_capacity).await,
            Err(EventError::InvalidCapacity)
        ));
    }

    #[tokio::test]
    async fn test_create_applies_defaults_and_mirrors() {
        let flow = client(MemoryGateway::new());

        let event = flow.events.create(draft()).await.expect("event is created");

        assert!(!event.id.is_empty());
        assert_eq!(event.registered, 0);
        assert_eq!(event.status, EventStatus::Upcoming);
        assert_eq!(event.image, STOCK_IMAGE);

        // Visible locally before the next sync tick
        assert_eq!(flow.mirror().events().len(), 1);
    }

    #[tokio::test]
    async fn test_update_edits_store_and_mirror() {
        let gateway = MemoryGateway::new();
        gateway.seed_event("E1", "Tech Summit", 500, 0);

        let flow = client(gateway);
        flow.sync.run_tick().await;

        let patch = EventPatch {
            status: Some(EventStatus::Cancelled),
            ..Default::default()
        };
        flow.events.update("E1", patch).await.expect("update succeeds");

        assert_eq!(flow.mirror().events()[0].status, EventStatus::Cancelled);
        assert_eq!(
            flow.context.gateway.events()[0].status,
            EventStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_failed_write_leaves_mirror_untouched() {
        let gateway = MemoryGateway::new();
        gateway.seed_event("E1", "Tech Summit", 500, 0);

        let flow = client(gateway);
        flow.sync.run_tick().await;

        flow.context.gateway.fail_writes(true);

        let result = flow.events.delete("E1").await;
        assert!(matches!(result, Err(EventError::Gateway(_))));
        assert_eq!(flow.mirror().events().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_everywhere() {
        let gateway = MemoryGateway::new();
        gateway.seed_event("E1", "Tech Summit", 500, 0);

        let flow = client(gateway);
        flow.sync.run_tick().await;

        flow.events.delete("E1").await.expect("delete succeeds");

        assert!(flow.mirror().events().is_empty());
        assert!(flow.context.gateway.events().is_empty());
    }
}
