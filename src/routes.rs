// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, exam, feedback, notes, profile, results},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public routes: registration and login.
/// * Everything else requires a bearer token; `/api/admin` also requires the admin role.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let public_auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let protected_auth_routes = Router::new()
        .route("/password", put(auth::change_password))
        .layer(auth_layer.clone());

    let notes_routes = Router::new()
        .route("/", get(notes::list_notes))
        .route("/{id}/complete", post(notes::complete_topic))
        .layer(auth_layer.clone());

    let exam_routes = Router::new()
        .route(
            "/",
            post(exam::start_exam)
                .get(exam::get_exam)
                .delete(exam::abandon_exam),
        )
        .route("/answer", put(exam::select_answer))
        .route("/next", post(exam::next_question))
        .route("/previous", post(exam::previous_question))
        .route("/finish", post(exam::finish_exam))
        .layer(auth_layer.clone());

    let results_routes = Router::new()
        .route("/", get(results::list_results))
        .route("/{id}", get(results::get_result))
        .layer(auth_layer.clone());

    let feedback_routes = Router::new()
        .route("/", get(feedback::get_feedback).post(feedback::post_feedback))
        .layer(auth_layer.clone());

    let profile_routes = Router::new()
        .route(
            "/",
            put(profile::update_profile).delete(profile::delete_account),
        )
        .route("/me", get(profile::get_me))
        .layer(auth_layer.clone());

    let admin_routes = Router::new()
        .route("/questions", post(admin::create_question))
        .route("/topics", post(admin::create_topic))
        .route("/feedback/low-rating", get(admin::list_low_rating_feedback))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(auth_layer);

    Router::new()
        .nest("/api/auth", public_auth_routes.merge(protected_auth_routes))
        .nest("/api/notes", notes_routes)
        .nest("/api/exam", exam_routes)
        .nest("/api/results", results_routes)
        .nest("/api/feedback", feedback_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (trace outermost, then CORS)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
