use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{json, to_value, Value};

use eventflow_core::{Event, Notification, Registration, Team, User};

use crate::errors::{ServerError, ServerResult};
use crate::storage::Collection;
use crate::ServerContext;

pub fn router() -> Router<ServerContext> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/:id", put(update_event).delete(delete_event))
        .route("/users", get(list_users).post(upsert_user))
        .route("/registrations", get(list_registrations).post(create_registration))
        .route(
            "/registrations/:id",
            put(update_registration).delete(delete_registration),
        )
        .route("/teams", get(list_teams).post(create_team))
        .route("/teams/:id", put(update_team))
        .route("/notifications", get(list_notifications).post(create_notification))
        .route("/notifications/:id", put(update_notification))
}

async fn list_events(State(context): State<ServerContext>) -> ServerResult<Json<Vec<Value>>> {
    let documents = context.storage.list(Collection::Events).await?;

    Ok(Json(documents))
}

async fn create_event(
    State(context): State<ServerContext>,
    Json(event): Json<Event>,
) -> ServerResult<(StatusCode, Json<Value>)> {
    let created = context
        .storage
        .insert(Collection::Events, to_value(event)?)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_event(
    State(context): State<ServerContext>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> ServerResult<Json<Value>> {
    // A missing event is not an error; the update simply affects nothing
    context.storage.merge(Collection::Events, &id, patch).await?;

    Ok(Json(json!({ "success": true })))
}

async fn delete_event(
    State(context): State<ServerContext>,
    Path(id): Path<String>,
) -> ServerResult<Json<Value>> {
    context.storage.delete(Collection::Events, &id).await?;

    Ok(Json(json!({ "success": true })))
}

async fn list_users(State(context): State<ServerContext>) -> ServerResult<Json<Vec<Value>>> {
    let documents = context.storage.list(Collection::Users).await?;

    Ok(Json(documents))
}

/// Creates or updates the account keyed by email.
///
/// This is how provider identities and store identities reconcile: two
/// sign-in paths arriving at the same email end up with one account,
/// which is returned in full.
async fn upsert_user(
    State(context): State<ServerContext>,
    Json(user): Json<User>,
) -> ServerResult<Json<Value>> {
    let storage = &context.storage;

    let existing = storage
        .find_by(Collection::Users, "email", &user.email)
        .await?;

    let Some(existing) = existing else {
        let created = storage.insert(Collection::Users, to_value(user)?).await?;

        return Ok(Json(created));
    };

    let mut patch = json!({ "name": user.name });

    if let Some(provider_id) = &user.provider_id {
        patch["providerId"] = json!(provider_id);
    }
    if let Some(photo_url) = &user.photo_url {
        patch["photoURL"] = json!(photo_url);
    }

    let id = existing
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let merged = storage
        .merge(Collection::Users, &id, patch)
        .await?
        .unwrap_or(existing);

    Ok(Json(merged))
}

async fn list_registrations(
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Value>>> {
    let documents = context.storage.list(Collection::Registrations).await?;

    Ok(Json(documents))
}

async fn create_registration(
    State(context): State<ServerContext>,
    Json(registration): Json<Registration>,
) -> ServerResult<(StatusCode, Json<Value>)> {
    let created = context
        .storage
        .insert(Collection::Registrations, to_value(registration)?)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_registration(
    State(context): State<ServerContext>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> ServerResult<Json<Value>> {
    context
        .storage
        .merge(Collection::Registrations, &id, patch)
        .await?;

    Ok(Json(json!({ "success": true })))
}

async fn delete_registration(
    State(context): State<ServerContext>,
    Path(id): Path<String>,
) -> ServerResult<Json<Value>> {
    context.storage.delete(Collection::Registrations, &id).await?;

    Ok(Json(json!({ "success": true })))
}

async fn list_teams(State(context): State<ServerContext>) -> ServerResult<Json<Vec<Value>>> {
    let documents = context.storage.list(Collection::Teams).await?;

    Ok(Json(documents))
}

async fn create_team(
    State(context): State<ServerContext>,
    Json(team): Json<Team>,
) -> ServerResult<(StatusCode, Json<Value>)> {
    let created = context
        .storage
        .insert(Collection::Teams, to_value(team)?)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_team(
    State(context): State<ServerContext>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> ServerResult<Json<Value>> {
    context.storage.merge(Collection::Teams, &id, patch).await?;

    Ok(Json(json!({ "success": true })))
}

async fn list_notifications(
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Value>>> {
    let mut documents = context.storage.list(Collection::Notifications).await?;

    sort_newest_first(&mut documents);

    Ok(Json(documents))
}

async fn create_notification(
    State(context): State<ServerContext>,
    Json(notification): Json<Notification>,
) -> ServerResult<(StatusCode, Json<Value>)> {
    let created = context
        .storage
        .insert(Collection::Notifications, to_value(notification)?)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Unlike the other collections, updating a missing notification is an
/// error, so read receipts never silently vanish
async fn update_notification(
    State(context): State<ServerContext>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> ServerResult<Json<Value>> {
    let merged = context
        .storage
        .merge(Collection::Notifications, &id, patch)
        .await?
        .ok_or(ServerError::NotFound("Notification"))?;

    Ok(Json(merged))
}

fn sort_newest_first(documents: &mut [Value]) {
    documents.sort_by_key(|document| {
        std::cmp::Reverse(document.get("timestamp").and_then(Value::as_i64).unwrap_or(0))
    });
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::storage::MemoryStore;
    use eventflow_core::Role;
    use std::sync::Arc;

    fn context() -> ServerContext {
        ServerContext {
            storage: Arc::new(MemoryStore::new()),
        }
    }

    fn user(name: &str, email: &str, provider_id: Option<&str>) -> User {
        User {
            id: String::new(),
            provider_id: provider_id.map(str::to_string),
            name: name.to_string(),
            email: email.to_string(),
            role: Role::Participant,
            password: None,
            photo_url: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_user_merges_provider_identity() {
        let context = context();

        let Json(created) = upsert_user(
            State(context.clone()),
            Json(user("Alex", "alex@example.com", None)),
        )
        .await
        .expect("first upsert succeeds");

        let id = created["id"].as_str().expect("id is assigned").to_string();

        // The same email arriving through a provider keeps one account
        let Json(merged) = upsert_user(
            State(context.clone()),
            Json(user("Alex B", "ALEX@example.com", Some("sub-123"))),
        )
        .await
        .expect("second upsert succeeds");

        assert_eq!(merged["id"], Value::String(id));
        assert_eq!(merged["providerId"], "sub-123");
        assert_eq!(merged["name"], "Alex B");

        let listed = context
            .storage
            .list(Collection::Users)
            .await
            .expect("list succeeds");
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_notification_is_not_found() {
        let context = context();

        let result = update_notification(
            State(context.clone()),
            Path("missing".to_string()),
            Json(json!({ "read": true })),
        )
        .await;

        assert!(matches!(result, Err(ServerError::NotFound(_))));

        // The other resources stay silent about missing ids
        let Json(body) = update_event(
            State(context),
            Path("missing".to_string()),
            Json(json!({ "registered": 1 })),
        )
        .await
        .expect("update succeeds");

        assert_eq!(body["success"], true);
    }

    #[test]
    fn test_notifications_sort_newest_first() {
        let mut documents = vec![
            json!({ "id": "N1", "timestamp": 100 }),
            json!({ "id": "N3" }),
            json!({ "id": "N2", "timestamp": 300 }),
        ];

        sort_newest_first(&mut documents);

        assert_eq!(documents[0]["id"], "N2");
        assert_eq!(documents[1]["id"], "N1");
        assert_eq!(documents[2]["id"], "N3");
    }
}
