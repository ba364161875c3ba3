use axum::{Router, middleware::from_fn_with_state, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{AppState, middleware, routes};

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(routes::projects::router(&state))
        .merge(routes::tasks::router(&state))
        .merge(routes::sub_tasks::router(&state))
        .merge(routes::comments::router())
        .merge(routes::dashboard::router())
        .merge(routes::logs::router())
        .merge(routes::users::router())
        .merge(routes::settings::router())
        .merge(routes::lookups::router())
        .layer(from_fn_with_state(state.clone(), middleware::require_user));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use chrono::{Duration, Utc};
    use db::{
        DBService,
        models::{
            notification_outbox::NotificationOutbox,
            priority::Priority,
            status::Status,
            user::{CreateUser, User},
            work_item::WorkItem,
        },
        types::{NotificationKind, Role, StatusName},
    };
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::AppState;

    struct TestApp {
        state: AppState,
        admin: User,
        supervisor: User,
        staff: User,
    }

    async fn setup() -> TestApp {
        let pool = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&pool, None).await.unwrap();
        let state = AppState::new(DBService { pool });

        let mut users = Vec::new();
        for (name, role) in [
            ("Ada", Role::Admin),
            ("Sam", Role::Supervisor),
            ("Pat", Role::Staff),
        ] {
            users.push(
                User::create(
                    &state.db().pool,
                    &CreateUser {
                        name: name.to_string(),
                        email: Some(format!("{}@example.com", name.to_lowercase())),
                        password_hash: None,
                        role,
                    },
                    Uuid::new_v4(),
                )
                .await
                .unwrap(),
            );
        }
        let staff = users.pop().unwrap();
        let supervisor = users.pop().unwrap();
        let admin = users.pop().unwrap();

        TestApp {
            state,
            admin,
            supervisor,
            staff,
        }
    }

    async fn send(
        app: &TestApp,
        method: &str,
        uri: &str,
        acting: Option<&User>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let router = super::router(app.state.clone());

        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = acting {
            builder = builder.header("x-user-id", user.id.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn project_body(app: &TestApp, overrides: Value) -> Value {
        let pool = &app.state.db().pool;
        let status = Status::find_by_name(pool, StatusName::Backlog)
            .await
            .unwrap()
            .unwrap();
        let priority = Priority::find_all(pool).await.unwrap().remove(0);
        let start = Utc::now();

        let mut body = json!({
            "name": "Launch",
            "start_date": start.to_rfc3339(),
            "due_date": (start + Duration::days(7)).to_rfc3339(),
            "status_id": status.id,
            "priority_id": priority.id,
            "supervisor_id": app.supervisor.id,
            "is_private": false,
            "assignees": [app.admin.id],
        });
        if let (Value::Object(base), Value::Object(extra)) = (&mut body, overrides) {
            for (key, value) in extra {
                base.insert(key, value);
            }
        }
        body
    }

    fn item_id(response: &Value) -> Uuid {
        response["data"]["id"].as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn health_is_public_but_api_requires_identity() {
        let app = setup().await;

        let (status, _) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "GET", "/api/dashboard", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn staff_cannot_create_or_list_projects() {
        let app = setup().await;
        let body = project_body(&app, json!({})).await;

        let (status, _) =
            send(&app, "POST", "/api/projects", Some(&app.staff), Some(body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, "GET", "/api/projects", Some(&app.staff), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, "GET", "/api/projects", Some(&app.supervisor), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn private_project_is_hidden_from_unrelated_staff() {
        let app = setup().await;
        let body = project_body(&app, json!({ "is_private": true })).await;

        let (status, created) =
            send(&app, "POST", "/api/projects", Some(&app.admin), Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        let id = item_id(&created);

        let uri = format!("/api/projects/{id}");
        let (status, body) = send(&app, "GET", &uri, Some(&app.staff), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["data"].is_null(), "no data leaks on rejection");

        let (status, _) = send(&app, "GET", &uri, Some(&app.supervisor), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn due_date_before_start_date_is_rejected_without_persisting() {
        let app = setup().await;
        let start = Utc::now();
        let body = project_body(
            &app,
            json!({
                "start_date": start.to_rfc3339(),
                "due_date": (start - Duration::days(1)).to_rfc3339(),
            }),
        )
        .await;

        let (status, response) =
            send(&app, "POST", "/api/projects", Some(&app.admin), Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            response["data"]["errors"]["due_date"][0],
            json!("Due date must be after or equal to the start date.")
        );

        let (_, listing) = send(&app, "GET", "/api/projects", Some(&app.admin), None).await;
        assert_eq!(listing["data"]["total_items"], json!(0));
    }

    #[tokio::test]
    async fn supervisor_review_transition_queues_notification() {
        let app = setup().await;
        let pool = &app.state.db().pool;

        let body = project_body(&app, json!({})).await;
        let (_, created) =
            send(&app, "POST", "/api/projects", Some(&app.admin), Some(body)).await;
        let project_id = item_id(&created);

        let task_body = project_body(
            &app,
            json!({
                "name": "Ship it",
                "parent_id": project_id,
                "assignees": [app.staff.id],
            }),
        )
        .await;
        let (status, created) =
            send(&app, "POST", "/api/tasks", Some(&app.admin), Some(task_body)).await;
        assert_eq!(status, StatusCode::OK);
        let task_id = item_id(&created);
        assert!(created["data"]["slug"].as_str().unwrap().starts_with("TASK-"));

        for entry in NotificationOutbox::fetch_unpublished(pool, 50).await.unwrap() {
            NotificationOutbox::mark_published(pool, entry.id).await.unwrap();
        }

        let review = Status::find_by_name(pool, StatusName::InReview)
            .await
            .unwrap()
            .unwrap();
        let uri = format!("/api/tasks/{task_id}/status");
        let (status, _) = send(
            &app,
            "PUT",
            &uri,
            Some(&app.supervisor),
            Some(json!({ "status_id": review.id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let item = WorkItem::find_by_id(pool, task_id).await.unwrap().unwrap();
        assert_eq!(item.status_id, review.id);

        let pending = NotificationOutbox::fetch_unpublished(pool, 50).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, NotificationKind::InReview);
        assert_eq!(
            pending[0].recipient_email,
            app.supervisor.email.clone().unwrap()
        );
    }

    #[tokio::test]
    async fn staff_non_assignee_cannot_move_status_and_nothing_persists() {
        let app = setup().await;
        let pool = &app.state.db().pool;

        let body = project_body(&app, json!({})).await;
        let (_, created) =
            send(&app, "POST", "/api/projects", Some(&app.admin), Some(body)).await;
        let project_id = item_id(&created);
        let before = WorkItem::find_by_id(pool, project_id).await.unwrap().unwrap();

        let done = Status::find_by_name(pool, StatusName::Done)
            .await
            .unwrap()
            .unwrap();
        let uri = format!("/api/projects/{project_id}/status");
        let (status, _) = send(
            &app,
            "PUT",
            &uri,
            Some(&app.staff),
            Some(json!({ "status_id": done.id })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let after = WorkItem::find_by_id(pool, project_id).await.unwrap().unwrap();
        assert_eq!(after.status_id, before.status_id);
    }

    #[tokio::test]
    async fn delete_soft_deletes_and_repeats_as_not_found() {
        let app = setup().await;

        let body = project_body(&app, json!({})).await;
        let (_, created) =
            send(&app, "POST", "/api/projects", Some(&app.admin), Some(body)).await;
        let id = item_id(&created);
        let uri = format!("/api/projects/{id}");

        // Only admins delete.
        let (status, _) = send(&app, "DELETE", &uri, Some(&app.supervisor), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, "DELETE", &uri, Some(&app.admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));

        let (status, _) = send(&app, "DELETE", &uri, Some(&app.admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn assignees_comment_but_only_admins_delete_comments() {
        let app = setup().await;

        let body = project_body(&app, json!({ "assignees": [app.staff.id] })).await;
        let (_, created) =
            send(&app, "POST", "/api/projects", Some(&app.admin), Some(body)).await;
        let id = item_id(&created);

        let uri = format!("/api/projects/{id}/comments");
        let (status, _) = send(
            &app,
            "POST",
            &uri,
            Some(&app.staff),
            Some(json!({ "content": "ab" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, comment) = send(
            &app,
            "POST",
            &uri,
            Some(&app.staff),
            Some(json!({ "content": "On it" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let comment_id: Uuid = comment["data"]["id"].as_str().unwrap().parse().unwrap();

        let delete_uri = format!("/api/comments/{comment_id}");
        let (status, _) = send(&app, "DELETE", &delete_uri, Some(&app.staff), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, "DELETE", &delete_uri, Some(&app.admin), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn dashboard_respects_visibility_for_staff() {
        let app = setup().await;

        let visible = project_body(&app, json!({ "name": "Visible" })).await;
        send(&app, "POST", "/api/projects", Some(&app.admin), Some(visible)).await;
        let hidden = project_body(
            &app,
            json!({ "name": "Hidden", "is_private": true }),
        )
        .await;
        send(&app, "POST", "/api/projects", Some(&app.admin), Some(hidden)).await;

        let (status, feed) = send(&app, "GET", "/api/dashboard", Some(&app.staff), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(feed["data"]["total_items"], json!(1));
        assert_eq!(feed["data"]["items"][0]["name"], json!("Visible"));

        let (_, feed) = send(&app, "GET", "/api/dashboard", Some(&app.admin), None).await;
        assert_eq!(feed["data"]["total_items"], json!(2));
    }

    #[tokio::test]
    async fn logs_are_gated_and_formatted() {
        let app = setup().await;

        let body = project_body(&app, json!({})).await;
        send(&app, "POST", "/api/projects", Some(&app.admin), Some(body)).await;

        let (status, _) = send(&app, "GET", "/api/logs", Some(&app.staff), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, logs) = send(&app, "GET", "/api/logs", Some(&app.admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let items = logs["data"]["items"].as_array().unwrap();
        assert!(!items.is_empty());

        let creation = items
            .iter()
            .find(|item| item["event"] == json!("created"))
            .expect("creation entry");
        assert_eq!(creation["causer"]["name"], json!("Ada"));
        assert!(
            creation["subject"]["heading"]
                .as_str()
                .unwrap()
                .starts_with("PRO-")
        );
        let new_values: Vec<String> = creation["new_values"]
            .as_array()
            .unwrap()
            .iter()
            .map(|line| line.as_str().unwrap().to_string())
            .collect();
        assert!(new_values.iter().any(|line| line == "is private: false"));
    }
}
