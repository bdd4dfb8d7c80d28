use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Local;
use schulmanager_ics_core::{
    Credentials, IcsOptions,
    prelude::{FeedService, IcsGenerator},
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub feed: FeedService,
    pub ics_options: IcsOptions,
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Query of the feed endpoint
#[derive(Deserialize)]
struct CalendarQuery {
    username: Option<String>,
    password: Option<String>,
    format: Option<String>, // "json" or "ics", defaults to "ics"
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/calendar", get(calendar_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Schulmanager ICS Calendar Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Subscribable iCalendar feed of a Schulmanager Online timetable",
        "provider": {
            "name": state.feed.provider_name(),
            "description": state.feed.provider_description(),
        },
        "endpoints": {
            "health": "/health",
            "calendar": "/calendar?username=...&password=..."
        }
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn calendar_handler(
    Query(params): Query<CalendarQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let (Some(username), Some(password)) = (non_empty(params.username), non_empty(params.password))
    else {
        return Err(AppError(schulmanager_ics_core::Error::Config(
            "Missing username or password".to_string(),
        )));
    };
    tracing::info!("Building calendar for {}", username);

    let credentials = Credentials::new(username, password);
    let today = Local::now().date_naive();
    let events = state.feed.events(&credentials, today).await?;

    match params.format.as_deref() {
        Some("json") => Ok(Json(events).into_response()),
        _ => {
            let generator = IcsGenerator::new(state.ics_options.clone());
            let ics_content = generator.generate(&events)?;

            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
                    (header::CACHE_CONTROL, "no-cache"),
                    (header::CONTENT_DISPOSITION, "inline; filename=\"calendar.ics\""),
                ],
                ics_content,
            )
                .into_response())
        }
    }
}

/// Core error rendered as a plain-text response
#[derive(Debug)]
struct AppError(schulmanager_ics_core::Error);

impl AppError {
    fn status(&self) -> (StatusCode, &'static str) {
        use schulmanager_ics_core::Error;

        match &self.0 {
            Error::Config(_) => (StatusCode::BAD_REQUEST, "Missing username or password"),
            Error::Authentication(_) => (StatusCode::UNAUTHORIZED, "Login failed"),
            Error::MissingStudent => (StatusCode::UNAUTHORIZED, "Student ID not found"),
            Error::Upstream {
                stage: schulmanager_ics_core::Stage::Periods,
                ..
            } => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch times"),
            Error::Upstream { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch lessons"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to build calendar"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self.0);
        } else {
            tracing::warn!("{}", self.0);
        }

        (status, message).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<schulmanager_ics_core::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
