use thiserror::Error;

use eventflow_core::{Notification, NotificationKind, Recipient, Role, User};

use crate::util::now_millis;
use crate::{ClientContext, Gateway, GatewayError, NotificationPatch};

pub type Result<T> = std::result::Result<T, NotificationError>;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("only admins can send notifications")]
    NotAdmin,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Announcement broadcast and per-audience filtering.
///
/// The read flag lives on the notification record itself, so marking one
/// read marks it read for every viewer.
pub struct NotificationManager<G> {
    context: ClientContext<G>,
}

impl<G> NotificationManager<G>
where
    G: Gateway,
{
    pub fn new(context: &ClientContext<G>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Sends an announcement to the given audience
    pub async fn send(
        &self,
        title: &str,
        message: &str,
        recipient: Recipient,
        kind: NotificationKind,
    ) -> Result<Notification> {
        let is_admin = self
            .context
            .current_user()
            .map(|user| user.role == Role::Admin)
            .unwrap_or(false);

        if !is_admin {
            return Err(NotificationError::NotAdmin);
        }

        let mut notification = Notification {
            id: String::new(),
            title: title.to_string(),
            message: message.to_string(),
            recipients: recipient.to_string(),
            read: false,
            kind,
            timestamp: now_millis(),
        };

        notification.id = self
            .context
            .gateway
            .create_notification(&notification)
            .await?;

        let created = notification.clone();
        self.context.mirror.mutate_notifications(|notifications| {
            // Newest first, matching the feed order
            notifications.insert(0, notification);
        });

        Ok(created)
    }

    /// The notifications the given user should see, newest first.
    ///
    /// Admins see everything; participants see broadcasts plus anything
    /// targeting an event they are registered for.
    pub fn visible_to(&self, user: &User) -> Vec<Notification> {
        let mirror = &self.context.mirror;

        let mut visible: Vec<_> = mirror
            .notifications()
            .into_iter()
            .filter(|notification| {
                if user.role == Role::Admin {
                    return true;
                }

                if notification.targets_all() {
                    return true;
                }

                notification
                    .target_event()
                    .map(|event_id| mirror.registration_for(event_id, &user.id).is_some())
                    .unwrap_or(false)
            })
            .collect();

        visible.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        visible
    }

    /// The visible notifications still unread, for badge counts
    pub fn unread_for(&self, user: &User) -> usize {
        self.visible_to(user).iter().filter(|n| !n.read).count()
    }

    /// Marks a notification read, for every viewer at once
    pub async fn mark_read(&self, id: &str) -> Result<()> {
        let patch = NotificationPatch { read: Some(true) };

        self.context.gateway.update_notification(id, &patch).await?;

        self.context.mirror.mutate_notifications(|notifications| {
            if let Some(notification) = notifications.iter_mut().find(|n| n.id == id) {
                notification.read = true;
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{client, MemoryGateway};

    fn notification(id: &str, recipients: &str, timestamp: i64) -> Notification {
        Notification {
            id: id.to_string(),
            title: "Update".to_string(),
            message: "Details inside".to_string(),
            recipients: recipients.to_string(),
            read: false,
            kind: NotificationKind::Info,
            timestamp,
        }
    }

    fn participant(id: &str) -> User {
        User {
            id: id.to_string(),
            provider_id: None,
            name: "Alex".to_string(),
            email: "alex@example.com".to_string(),
            role: Role::Participant,
            password: None,
            photo_url: None,
        }
    }

    #[tokio::test]
    async fn test_send_requires_admin() {
        let flow = client(MemoryGateway::new());

        assert!(matches!(
            flow.notifications
                .send("Hi", "there", Recipient::All, NotificationKind::Info)
                .await,
            Err(NotificationError::NotAdmin)
        ));
    }

    #[tokio::test]
    async fn test_send_stamps_and_prepends() {
        let flow = client(MemoryGateway::new());
        flow.auth
            .login_admin("admin@eventflow.com", "admin123")
            .expect("admin signs in");

        let first = flow
            .notifications
            .send("First", "one", Recipient::All, NotificationKind::Info)
            .await
            .expect("send succeeds");
        let second = flow
            .notifications
            .send(
                "Second",
                "two",
                Recipient::Event("E1".to_string()),
                NotificationKind::Warning,
            )
            .await
            .expect("send succeeds");

        assert!(first.timestamp > 0);
        assert_eq!(second.recipients, "event_E1");

        let mirrored = flow.mirror().notifications();
        assert_eq!(mirrored[0].title, "Second");
        assert_eq!(mirrored[1].title, "First");
    }

    #[tokio::test]
    async fn test_visibility_follows_registrations() {
        let gateway = MemoryGateway::new();
        gateway.seed_notification_record(notification("N1", "all", 1));
        gateway.seed_notification_record(notification("N2", "event_E1", 2));
        gateway.seed_notification_record(notification("N3", "event_E2", 3));

        let flow = client(gateway);
        flow.sync.run_tick().await;

        let user = participant("U1");

        // Not registered anywhere: broadcasts only
        let visible = flow.notifications.visible_to(&user);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "N1");

        flow.context.gateway.seed_registration("R1", "E1", "U1", "alex@example.com");
        flow.sync.run_tick().await;

        let visible = flow.notifications.visible_to(&user);
        assert_eq!(visible.len(), 2);
        // Newest first
        assert_eq!(visible[0].id, "N2");
        assert_eq!(visible[1].id, "N1");
    }

    #[tokio::test]
    async fn test_admin_sees_everything() {
        let flow = client(MemoryGateway::new());

        flow.mirror().replace_notifications(vec![
            notification("N1", "all", 1),
            notification("N2", "event_E1", 2),
        ]);

        let admin = flow
            .auth
            .login_admin("admin@eventflow.com", "admin123")
            .expect("admin signs in");

        assert_eq!(flow.notifications.visible_to(&admin).len(), 2);
    }

    #[tokio::test]
    async fn test_mark_read_is_global() {
        let gateway = MemoryGateway::new();
        let flow = client(gateway);

        flow.context
            .gateway
            .seed_notification_record(notification("N1", "all", 1));
        flow.sync.run_tick().await;

        flow.notifications.mark_read("N1").await.expect("mark succeeds");

        assert!(flow.mirror().notifications()[0].read);
        assert!(flow.context.gateway.notifications()[0].read);

        // Every viewer now sees it read
        let user = participant("U1");
        assert_eq!(flow.notifications.unread_for(&user), 0);
    }
}
