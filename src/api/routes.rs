use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::access::{api as access_api, require_admin, require_session, AccessState};
use crate::api::handlers::{self, DashboardState};
use crate::middleware::request_logging_simple;

/// Full application router.
///
/// `/health` and login are public; everything else needs a session, and the
/// admin routes additionally need the admin email.
pub fn build_router(dashboard: DashboardState, access: AccessState) -> Router {
    let auth_router = Router::new()
        .route("/api/auth/login", post(access_api::login))
        .with_state(access.clone());

    let admin_routes = Router::new()
        .route(
            "/api/admin/users",
            get(access_api::list_users).post(access_api::add_user),
        )
        .route("/api/admin/users/:email", delete(access_api::remove_user))
        .route_layer(middleware::from_fn_with_state(access.clone(), require_admin))
        .route_layer(middleware::from_fn_with_state(access.clone(), require_session))
        .with_state(access.clone());

    let me_route = Router::new()
        .route("/api/auth/me", get(access_api::me))
        .route_layer(middleware::from_fn_with_state(access.clone(), require_session));

    let protected_routes = Router::new()
        .route("/api/overview", get(handlers::get_overview))
        .route("/api/records", get(handlers::get_records))
        .route("/api/filters", get(handlers::get_filters))
        .route("/api/groups/:name", get(handlers::get_group))
        .route("/api/refresh", post(handlers::post_refresh))
        .route_layer(middleware::from_fn_with_state(access, require_session))
        .with_state(dashboard.clone());

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(dashboard);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(me_route)
        .merge(admin_routes)
        .merge(auth_router)
        .layer(middleware::from_fn(request_logging_simple))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AllowlistStore, SessionHandler};
    use crate::dashboard::DashboardController;
    use crate::errors::LoadError;
    use crate::fields::Field;
    use crate::models::{SourceOrigin, TokenRecord};
    use crate::sources::{DataSourceChain, RecordSource, SourcePayload, StaticCredential};
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::sync::Arc;
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    const ADMIN: &str = "admin@google.com";

    /// Local stage whose result can be flipped between calls.
    struct Switch {
        available: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl RecordSource for Switch {
        fn name(&self) -> &'static str {
            "local"
        }

        fn requires_credential(&self) -> bool {
            false
        }

        async fn fetch(
            &self,
            _credential: Option<&str>,
        ) -> Result<Option<SourcePayload>, LoadError> {
            if !*self.available.lock() {
                return Err(LoadError::LocalSourceUnavailable {
                    location: "./data/tokens-data.json".to_string(),
                });
            }
            Ok(Some(SourcePayload {
                records: vec![
                    TokenRecord::default()
                        .with(Field::LeName, "Project X")
                        .with(Field::Surface, "Search")
                        .with(Field::AffStatus, "LE in Progress"),
                    TokenRecord::default()
                        .with(Field::LeName, "Project Y")
                        .with(Field::Surface, "Display")
                        .with(Field::AffStatus, "LE Planning"),
                ],
                as_of: None,
                origin: SourceOrigin::Local,
            }))
        }
    }

    struct Harness {
        app: Router,
        dashboard: DashboardState,
        available: Arc<Mutex<bool>>,
        _db: NamedTempFile,
    }

    fn harness(available: bool) -> Harness {
        let available = Arc::new(Mutex::new(available));
        let source = Switch {
            available: available.clone(),
        };
        let chain = DataSourceChain::new(Arc::new(StaticCredential(None)))
            .with_fallback(Arc::new(source));
        let dashboard = Arc::new(DashboardController::new(chain));

        let db = NamedTempFile::new().unwrap();
        let allowlist = AllowlistStore::new(db.path().to_str().unwrap(), ADMIN).unwrap();
        let access = AccessState::new(allowlist, SessionHandler::new("test-secret".to_string()));

        Harness {
            app: build_router(dashboard.clone(), access),
            dashboard,
            available,
            _db: db,
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn login(app: &Router, email: &str) -> (StatusCode, Value) {
        send(
            app,
            json_request("POST", "/api/auth/login", None, serde_json::json!({"email": email})),
        )
        .await
    }

    async fn admin_token(app: &Router) -> String {
        let (status, body) = login(app, ADMIN).await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let h = harness(true);
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_login_rules() {
        let h = harness(true);
        let (status, _) = login(&h.app, "not-an-email").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = login(&h.app, "stranger@google.com").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].as_str().unwrap().contains("Access denied"));

        let (status, body) = login(&h.app, "Admin@Google.com").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], ADMIN);
        assert_eq!(body["user"]["name"], "admin");
        assert_eq!(body["user"]["admin"], true);
        assert_eq!(body["expires_in"], 8 * 3600);
    }

    #[tokio::test]
    async fn test_data_routes_need_session() {
        let h = harness(true);
        let request = Request::builder().uri("/api/overview").body(Body::empty()).unwrap();
        let (status, _) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&h.app, get("/api/overview", "garbage")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_overview_filter_and_groups() {
        let h = harness(true);
        h.dashboard.refresh().await.unwrap();
        let token = admin_token(&h.app).await;

        let (status, body) = send(&h.app, get("/api/overview", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["groups"].as_array().unwrap().len(), 2);
        assert_eq!(body["freshness"]["origin"], "local");

        let request = get("/api/overview?field=surface&value=Search", &token);
        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["groups"][0]["name"], "Project X");
        assert_eq!(body["groups"].as_array().unwrap().len(), 1);

        let (status, _) = send(&h.app, get("/api/overview?field=bogus&value=x", &token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = get("/api/records?field=surface&value=Display", &token);
        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, body) = send(&h.app, get("/api/filters", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 6);

        let (status, body) = send(&h.app, get("/api/groups/Project%20Y", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Project Y");
        let (status, _) = send(&h.app, get("/api/groups/Nope", &token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unavailable_then_retry() {
        let h = harness(false);
        assert!(h.dashboard.refresh().await.is_err());
        let token = admin_token(&h.app).await;

        let (status, body) = send(&h.app, get("/api/overview", &token)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["retry"], "/api/refresh");
        assert_eq!(body["code"], "local_source_unavailable");
        assert!(body["remediation"].as_str().unwrap().contains("sds-dashboard sync"));

        *h.available.lock() = true;
        let request = json_request("POST", "/api/refresh", Some(&token), Value::Null);
        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["records"], 2);

        let (status, _) = send(&h.app, get("/api/overview", &token)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_manages_allowlist() {
        let h = harness(true);
        let token = admin_token(&h.app).await;

        let add = |email: &str| {
            json_request(
                "POST",
                "/api/admin/users",
                Some(&token),
                serde_json::json!({"email": email}),
            )
        };

        let (status, _) = send(&h.app, add("jane@google.com")).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = send(&h.app, add("JANE@google.com")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].as_str().unwrap().contains("already authorized"));
        let (status, _) = send(&h.app, add("nope")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&h.app, get("/api/admin/users", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        // Non-admin session cannot reach admin routes.
        let (_, body) = login(&h.app, "jane@google.com").await;
        let jane = body["token"].as_str().unwrap().to_string();
        let (status, _) = send(&h.app, get("/api/admin/users", &jane)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = send(&h.app, get("/api/auth/me", &jane)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["admin"], false);

        let delete = |email: &str| {
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/admin/users/{email}"))
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap()
        };
        let (status, _) = send(&h.app, delete(ADMIN)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&h.app, delete("jane@google.com")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&h.app, delete("jane@google.com")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // Revocation takes effect on the still-valid token.
        let (status, _) = send(&h.app, get("/api/auth/me", &jane)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
