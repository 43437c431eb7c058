// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, catalog, dashboard, session},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (catalog, sessions, dashboard, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool, Config, Session Registry).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let test_routes = Router::new()
        .route("/", get(catalog::list_tests))
        .route("/{id}", get(catalog::get_test))
        .route("/{id}/sessions", post(session::start_session));

    let session_routes = Router::new()
        .route(
            "/{id}",
            get(session::get_session).delete(session::abandon),
        )
        .route("/{id}/select", post(session::select_option))
        .route("/{id}/advance", post(session::advance))
        .route("/{id}/reload", post(session::reload))
        .route("/{id}/retry", post(session::retry));

    let me_routes = Router::new().route("/attempts", get(dashboard::my_attempts));

    let admin_routes = Router::new()
        .route("/tests", post(admin::create_test))
        .route(
            "/tests/{id}",
            put(admin::update_test).delete(admin::delete_test),
        )
        .route(
            "/tests/{id}/questions",
            get(admin::list_questions).post(admin::create_question),
        )
        .route(
            "/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route("/attempts", get(admin::list_attempts))
        .route("/attempts/{id}", axum::routing::delete(admin::delete_attempt))
        .route("/attempts/{id}/score", put(admin::set_admin_score))
        // Checked after auth_middleware has injected the claims
        .route_layer(middleware::from_fn(admin_middleware));

    let protected = Router::new()
        .nest("/api/tests", test_routes)
        .nest("/api/sessions", session_routes)
        .nest("/api/me", me_routes)
        .nest("/api/admin", admin_routes)
        // Only matched routes require a token; unknown paths fall through to 404
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use sqlx::SqlitePool;
    use tower::ServiceExt;

    use super::*;
    use crate::{config::Config, utils::jwt::sign_jwt};

    fn app() -> Router {
        let pool = SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "router_secret".to_string(),
            rust_log: "error".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            default_time_limit_minutes: 30,
            tick_interval_ms: 1000,
        };
        create_router(AppState::new(pool, config))
    }

    fn request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn missing_or_forged_tokens_are_unauthorized() {
        let response = app().oneshot(request("/api/tests", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let forged = sign_jwt("user_a", "user", "wrong_secret", 60).unwrap();
        let response = app()
            .oneshot(request("/api/tests", Some(&forged)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found_without_a_token() {
        for uri in ["/random_path_that_does_not_exist", "/api/admin/nothing_here"] {
            let response = app().oneshot(request(uri, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
        }
    }

    #[tokio::test]
    async fn admin_routes_forbid_regular_users() {
        let token = sign_jwt("user_a", "user", "router_secret", 60).unwrap();
        let response = app()
            .oneshot(request("/api/admin/attempts", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
