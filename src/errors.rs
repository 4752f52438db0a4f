use crate::config::RunMode;
use crate::facade::FacadeError;
use crate::state::AppState;
use crate::ui::{render_diagnostic, render_error};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}: {message}")]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
}

impl HttpError {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            message: status.canonical_reason().unwrap_or("Error").to_string(),
        }
    }

    pub fn with_message(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Anything that is not an HTTP error; `detail` is the diagnostic dump.
    #[error("{message}")]
    Unexpected { message: String, detail: String },
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Http(HttpError::with_message(StatusCode::UNAUTHORIZED, message))
    }

    pub fn unexpected<E>(err: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        Self::Unexpected {
            message: err.to_string(),
            detail: diagnostic(err),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Http(http) => http.status,
            Self::Unexpected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A bare status code becomes an HTTP error with that status; codes that are
/// not HTTP statuses are unexpected.
impl From<u16> for AppError {
    fn from(code: u16) -> Self {
        match StatusCode::from_u16(code) {
            Ok(status) => Self::Http(HttpError::new(status)),
            Err(err) => Self::Unexpected {
                message: format!("invalid HTTP status code {code}"),
                detail: diagnostic(&err),
            },
        }
    }
}

impl From<FacadeError> for AppError {
    fn from(err: FacadeError) -> Self {
        match &err {
            FacadeError::Rejected { status, message } => match StatusCode::from_u16(*status) {
                Ok(status) => Self::Http(HttpError::with_message(status, message.clone())),
                Err(_) => Self::unexpected(&err),
            },
            FacadeError::Transport(_) | FacadeError::Decode(_) => Self::unexpected(&err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = respond(&self, RunMode::Production, ErrorFormat::Html);
        response.extensions_mut().insert(self);
        response
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Body format the client asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFormat {
    Html,
    Json,
}

impl ErrorFormat {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let xhr = headers
            .get("x-requested-with")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.eq_ignore_ascii_case("xmlhttprequest"));
        let accept = headers
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let json_only = accept.contains("application/json") && !accept.contains("text/html");

        if xhr || json_only {
            Self::Json
        } else {
            Self::Html
        }
    }
}

/// Turns an error into the response the client sees, logging whatever the
/// client is not allowed to see.
pub fn render(err: &AppError, mode: RunMode, format: ErrorFormat) -> Response {
    if let AppError::Unexpected { message, detail } = err {
        if !mode.is_development() {
            error!(%message, %detail, "unexpected error");
        }
    }
    respond(err, mode, format)
}

fn respond(err: &AppError, mode: RunMode, format: ErrorFormat) -> Response {
    match err {
        AppError::Http(http) => send_http_error(http, format),
        AppError::Unexpected { message, detail } if mode.is_development() => {
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            match format {
                ErrorFormat::Json => (
                    status,
                    Json(json!({
                        "error": message,
                        "status": status.as_u16(),
                        "detail": detail,
                    })),
                )
                    .into_response(),
                ErrorFormat::Html => (status, Html(render_diagnostic(message, detail))).into_response(),
            }
        }
        AppError::Unexpected { .. } => send_http_error(
            &HttpError::new(StatusCode::INTERNAL_SERVER_ERROR),
            format,
        ),
    }
}

fn send_http_error(err: &HttpError, format: ErrorFormat) -> Response {
    match format {
        ErrorFormat::Json => (
            err.status,
            Json(json!({
                "error": err.message,
                "status": err.status.as_u16(),
            })),
        )
            .into_response(),
        ErrorFormat::Html => (err.status, Html(render_error(err.status, &err.message))).into_response(),
    }
}

fn diagnostic(err: &(dyn std::error::Error + 'static)) -> String {
    let mut detail = format!("{err:?}");
    let mut source = err.source();
    while let Some(cause) = source {
        detail.push_str("\ncaused by: ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}

/// Router-wide failure handler.
pub async fn normalize_errors(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let format = ErrorFormat::from_headers(request.headers());
    let response = next.run(request).await;

    match response.extensions().get::<AppError>().cloned() {
        Some(err) => render(&err, state.mode, format),
        None => response,
    }
}
