// src/routes.rs

use std::sync::Arc;

use axum::{
    Router, http::Method, middleware,
    routing::{get, post, put},
};
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, feed, posts},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public reader routes (feed, single post, comments).
/// * Auth routes, rate limited against brute force.
/// * Admin routes behind Auth + Admin middleware.
/// * Static serving of uploaded images.
/// * Global middleware (Trace, CORS) and the shared state.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(5)
        .key_extractor(GlobalKeyExtractor)
        .finish()
        .unwrap();

    let governor_conf = Arc::new(governor_conf);

    let public_routes = Router::new()
        .route("/api/posts", get(feed::list_posts))
        .route("/api/posts/{id}", get(posts::get_post))
        .route(
            "/api/posts/{id}/comments",
            get(posts::list_comments).post(posts::create_comment),
        );

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/forgot", post(auth::forgot_password))
        .route("/reset", post(auth::reset_password))
        .layer(GovernorLayer::new(governor_conf));

    let admin_routes = Router::new()
        .route("/posts", get(admin::list_posts).post(admin::create_post))
        .route(
            "/posts/{id}",
            put(admin::update_post).delete(admin::delete_post),
        )
        .route("/upload", post(admin::upload_image))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .nest_service("/uploads", ServeDir::new(&state.config.uploads_dir))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
