// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{chat, conversation, exam, grade, health, progress, run, session},
    state::AppState,
};

/// Origins from the configuration that are valid header values.
fn allowed_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect()
}

/// Assembles the main application router.
///
/// * Merges all sub-routers (grading, exams, sessions, progress, chats).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&state.config.cors_origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let grading_routes = Router::new()
        .route("/grade", post(grade::grade_answer))
        .route("/run", post(run::run_code))
        .route("/chat", post(chat::chat))
        .route("/quiz/check", post(grade::check_quiz_answer));

    let exam_routes = Router::new()
        .route("/", get(exam::list_exams))
        .route("/{exam_id}", get(exam::get_exam))
        .route("/{exam_id}/sessions", post(session::create_session));

    let session_routes = Router::new()
        .route(
            "/{id}",
            get(session::get_session).delete(session::delete_session),
        )
        .route("/{id}/start", post(session::start_session))
        .route("/{id}/answers/{question_id}", put(session::record_answer))
        .route("/{id}/flags/{question_id}", post(session::toggle_flag))
        .route(
            "/{id}/questions/{question_id}/run",
            post(session::run_code_question),
        )
        .route("/{id}/submit", post(session::submit_session));

    let progress_routes = Router::new()
        .route(
            "/exams/results",
            get(progress::list_exam_results).post(progress::submit_exam_result),
        )
        .route(
            "/exams/results/{course_id}",
            get(progress::list_course_exam_results),
        )
        .route(
            "/practices/results",
            get(progress::list_practice_results).post(progress::submit_practice_result),
        )
        .route(
            "/practices/results/{course_id}",
            get(progress::list_course_practice_results),
        )
        .route(
            "/practices/progress/{course_id}",
            get(progress::practice_progress),
        )
        .route("/lessons/complete", post(progress::complete_lesson))
        .route(
            "/lessons/progress/{course_id}",
            get(progress::course_lesson_progress),
        );

    let conversation_routes = Router::new()
        .route(
            "/",
            get(conversation::list_conversations).post(conversation::create_conversation),
        )
        .route("/recent", get(conversation::recent_conversations))
        .route(
            "/{conversation_id}",
            get(conversation::get_conversation).delete(conversation::delete_conversation),
        )
        .route(
            "/{conversation_id}/messages",
            post(conversation::add_message),
        )
        .route(
            "/{conversation_id}/title",
            put(conversation::rename_conversation),
        );

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .nest("/api", grading_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/sessions", session_routes)
        .nest("/api/users/{user_id}", progress_routes)
        .nest("/api/users/{user_id}/chats", conversation_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
