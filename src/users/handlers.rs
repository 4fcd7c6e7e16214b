use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    db::Session,
    error::{AppError, WRONG_PASSWORD},
    extractors::{JsonBody, PathParam, QueryParams},
    state::AppState,
    users::{
        dto::{CreateUser, DeleteUser, Deleted, Pagination, PublicUser, UpdateUser},
        repo::User,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

#[instrument(skip(session))]
pub async fn get_user(
    mut session: Session,
    PathParam(id): PathParam<i64>,
) -> Result<Json<PublicUser>, AppError> {
    let user = User::find_by_id(&mut session, id)
        .await?
        .ok_or_else(AppError::user_not_found)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, session, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    mut session: Session,
    JsonBody(payload): JsonBody<CreateUser>,
) -> Result<Json<PublicUser>, AppError> {
    let password = state.hasher.hash(&payload.password)?;
    let user = User::create(&mut session, &payload, &password).await?;
    info!(user_id = user.id, "user created");
    Ok(Json(user.into()))
}

#[instrument(skip(session))]
pub async fn list_users(
    mut session: Session,
    QueryParams(page): QueryParams<Pagination>,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    page.validate()?;
    let users = User::list(&mut session, page.offset, page.limit).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, session, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    mut session: Session,
    PathParam(id): PathParam<i64>,
    JsonBody(payload): JsonBody<UpdateUser>,
) -> Result<Json<PublicUser>, AppError> {
    let mut user = User::find_by_id(&mut session, id)
        .await?
        .ok_or_else(AppError::user_not_found)?;
    payload.apply(&mut user, state.hasher.as_ref())?;
    let user = user.save(&mut session).await?;
    info!(user_id = user.id, "user updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state, session, payload))]
pub async fn delete_user(
    State(state): State<AppState>,
    mut session: Session,
    PathParam(id): PathParam<i64>,
    JsonBody(payload): JsonBody<DeleteUser>,
) -> Result<Json<Deleted>, AppError> {
    payload.validate()?;
    let user = User::find_by_id(&mut session, id)
        .await?
        .ok_or_else(AppError::user_not_found)?;

    if !state.hasher.verify(&payload.password, &user.password)? {
        warn!(user_id = id, "delete rejected: password mismatch");
        return Err(AppError::Forbidden(WRONG_PASSWORD));
    }

    if !User::delete(&mut session, id).await? {
        return Err(AppError::user_not_found());
    }
    info!(user_id = id, "user deleted");
    Ok(Json(Deleted { ok: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_app;
    use crate::config::HasherKind;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn jhon() -> Value {
        json!({
            "name": "Jhon",
            "lastname": "Doe",
            "age": 21,
            "email": "correo",
            "password": "Hola Mundo",
            "cv": "nombre_cv.pdf"
        })
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    async fn app() -> Router {
        build_app(AppState::fake().await)
    }

    #[tokio::test]
    async fn create_returns_public_shape_with_fresh_id() {
        let app = app().await;
        let (status, body) = send(&app, Method::POST, "/users/", Some(jhon())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "user_id": 1,
                "name": "Jhon",
                "lastname": "Doe",
                "age": 21,
                "email": "correo"
            })
        );
    }

    #[tokio::test]
    async fn create_without_trailing_slash_is_accepted() {
        let app = app().await;
        let (status, body) = send(&app, Method::POST, "/users", Some(jhon())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], 1);
        assert!(body.get("password").is_none());
        assert!(body.get("cv").is_none());
    }

    #[tokio::test]
    async fn fetch_after_create_returns_same_body() {
        let app = app().await;
        let (_, created) = send(&app, Method::POST, "/users/", Some(jhon())).await;

        let (status, fetched) = send(&app, Method::GET, "/users/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (status, again) = send(&app, Method::GET, "/users/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again, fetched);
    }

    #[tokio::test]
    async fn fetch_unknown_id_is_not_found() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/users/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "detail": "Usuario No Encontrado" }));
    }

    #[tokio::test]
    async fn fetch_with_non_integer_id_is_unprocessable() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/users/abc", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn create_with_missing_field_is_unprocessable() {
        let app = app().await;
        let mut body = jhon();
        body.as_object_mut().unwrap().remove("cv");

        let (status, response) = send(&app, Method::POST, "/users/", Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response["detail"].is_string());

        let (status, _) = send(&app, Method::GET, "/users/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_returns_created_users_and_caps_limit() {
        let app = app().await;
        for _ in 0..3 {
            send(&app, Method::POST, "/users/", Some(jhon())).await;
        }

        let (status, body) = send(&app, Method::GET, "/users/?offset=1&limit=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["user_id"], 2);

        let (status, body) = send(&app, Method::GET, "/users", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (status, _) = send(&app, Method::GET, "/users/?limit=101", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    fn confirm(password: &str) -> Value {
        json!({ "name": "Jhon", "lastname": "Doe", "password": password })
    }

    #[tokio::test]
    async fn patch_changes_only_sent_fields() {
        let app = app().await;
        send(&app, Method::POST, "/users/", Some(jhon())).await;

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/users/1",
            Some(json!({ "name": "Juan", "lastname": "Doe", "age": 22 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "user_id": 1,
                "name": "Juan",
                "lastname": "Doe",
                "age": 22,
                "email": "correo"
            })
        );

        let (status, _) = send(
            &app,
            Method::PATCH,
            "/users/2",
            Some(json!({ "lastname": "Doe" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patch_without_lastname_is_unprocessable() {
        let app = app().await;
        send(&app, Method::POST, "/users/", Some(jhon())).await;

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/users/1",
            Some(json!({ "email": "nuevo" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());

        let (_, stored) = send(&app, Method::GET, "/users/1", None).await;
        assert_eq!(stored["email"], "correo");
    }

    #[tokio::test]
    async fn patch_ignores_email() {
        let app = app().await;
        send(&app, Method::POST, "/users/", Some(jhon())).await;

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/users/1",
            Some(json!({ "lastname": "Pérez", "email": "nuevo" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lastname"], "Pérez");
        assert_eq!(body["email"], "correo");
    }

    #[tokio::test]
    async fn delete_requires_matching_password() {
        let app = app().await;
        send(&app, Method::POST, "/users/", Some(jhon())).await;

        let (status, body) =
            send(&app, Method::DELETE, "/users/1", Some(confirm("otra"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({ "detail": "Contraseña Incorrecta" }));
        let (status, _) = send(&app, Method::GET, "/users/1", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) =
            send(&app, Method::DELETE, "/users/1", Some(confirm("Hola Mundo"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));

        let (status, body) = send(&app, Method::GET, "/users/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Usuario No Encontrado");
    }

    #[tokio::test]
    async fn delete_without_base_fields_is_unprocessable() {
        let app = app().await;
        send(&app, Method::POST, "/users/", Some(jhon())).await;

        let (status, _) = send(
            &app,
            Method::DELETE,
            "/users/1",
            Some(json!({ "password": "Hola Mundo" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(&app, Method::GET, "/users/1", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn delete_with_empty_password_is_unprocessable() {
        let app = app().await;
        send(&app, Method::POST, "/users/", Some(jhon())).await;

        let (status, _) = send(&app, Method::DELETE, "/users/1", Some(confirm(""))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn argon2_store_hashes_and_still_deletes() {
        let state = AppState::fake().await.with_hasher(HasherKind::Argon2);
        let app = build_app(state.clone());

        let (status, created) = send(&app, Method::POST, "/users/", Some(jhon())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["user_id"], 1);

        let mut session = state.db.open_session().await.unwrap();
        let row = User::find_by_id(&mut session, 1).await.unwrap().unwrap();
        drop(session);
        assert!(row.password.starts_with("$argon2"));
        assert_ne!(row.password, "Hola Mundo");

        let (status, _) = send(&app, Method::DELETE, "/users/1", Some(confirm("otra"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) =
            send(&app, Method::DELETE, "/users/1", Some(confirm("Hola Mundo"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn plaintext_rows_are_rejected_not_failed_after_switching_to_argon2() {
        let state = AppState::fake().await;
        let plain_app = build_app(state.clone());
        send(&plain_app, Method::POST, "/users/", Some(jhon())).await;

        let argon_app = build_app(state.with_hasher(HasherKind::Argon2));
        let (status, body) =
            send(&argon_app, Method::DELETE, "/users/1", Some(confirm("Hola Mundo"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({ "detail": "Contraseña Incorrecta" }));

        let (status, _) = send(&argon_app, Method::GET, "/users/1", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
