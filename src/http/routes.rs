use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{AppendHeaders, Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Extension, Form, Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::json;

use super::views::Views;
use crate::auth::{AuthError, AuthGate, SessionManager};
use crate::error::AppError;
use crate::incidents::{IncidentService, IncidentServiceError, IncidentSubmission};
use crate::notify::Notifier;
use crate::store::{IncidentStore, UserStore};

/// Process-level state for the operational endpoints.
#[derive(Clone)]
pub struct AppState {
    pub readiness: Arc<AtomicBool>,
    pub metrics: Arc<PrometheusHandle>,
}

/// Shared handles for the form-facing routes.
pub struct WebState<U, S, N> {
    pub auth: Arc<AuthGate<U>>,
    pub incidents: Arc<IncidentService<S, N>>,
    pub sessions: Arc<SessionManager>,
    pub views: Arc<Views>,
}

impl<U, S, N> Clone for WebState<U, S, N> {
    fn clone(&self) -> Self {
        Self {
            auth: self.auth.clone(),
            incidents: self.incidents.clone(),
            sessions: self.sessions.clone(),
            views: self.views.clone(),
        }
    }
}

/// Router builder exposing the form flow plus the operational endpoints.
pub fn web_router<U, S, N>(state: WebState<U, S, N>) -> Router
where
    U: UserStore + 'static,
    S: IncidentStore + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/", get(dashboard::<U, S, N>))
        .route(
            "/register",
            get(register_form::<U, S, N>).post(register_submit::<U, S, N>),
        )
        .route(
            "/login",
            get(login_form::<U, S, N>).post(login_submit::<U, S, N>),
        )
        .route("/logout", get(logout::<U, S, N>))
        .route("/report", post(report_submit::<U, S, N>))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct FlashParams {
    flash: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CredentialsForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReportForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    severity: String,
}

fn cookie_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
}

fn redirect_with_flash(path: &str, message: &str) -> Redirect {
    Redirect::to(&format!("{path}?flash={}", urlencoding::encode(message)))
}

fn page(status: StatusCode, body: String) -> Response {
    (status, Html(body)).into_response()
}

pub(crate) async fn dashboard<U, S, N>(
    State(state): State<WebState<U, S, N>>,
    headers: HeaderMap,
    Query(params): Query<FlashParams>,
) -> Result<Response, AppError>
where
    U: UserStore + 'static,
    S: IncidentStore + 'static,
    N: Notifier + 'static,
{
    if state.sessions.authenticate(cookie_header(&headers)).is_none() {
        return Ok(Redirect::to("/login").into_response());
    }

    let incidents = state.incidents.list()?;
    let body = state
        .views
        .dashboard(&incidents, params.flash.as_deref(), None)?;
    Ok(Html(body).into_response())
}

pub(crate) async fn register_form<U, S, N>(
    State(state): State<WebState<U, S, N>>,
) -> Result<Response, AppError>
where
    U: UserStore + 'static,
    S: IncidentStore + 'static,
    N: Notifier + 'static,
{
    Ok(Html(state.views.register(None)?).into_response())
}

pub(crate) async fn register_submit<U, S, N>(
    State(state): State<WebState<U, S, N>>,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError>
where
    U: UserStore + 'static,
    S: IncidentStore + 'static,
    N: Notifier + 'static,
{
    let username = form.username.trim();
    if username.is_empty() {
        let body = state.views.register(Some("username is required"))?;
        return Ok(page(StatusCode::BAD_REQUEST, body));
    }
    if form.password.is_empty() {
        let body = state.views.register(Some("password is required"))?;
        return Ok(page(StatusCode::BAD_REQUEST, body));
    }

    match state.auth.register(username, &form.password) {
        Ok(_) => Ok(redirect_with_flash("/login", "Account created, please log in").into_response()),
        Err(AuthError::DuplicateUsername) => {
            let body = state
                .views
                .register(Some("That username is already taken"))?;
            Ok(page(StatusCode::CONFLICT, body))
        }
        Err(other) => Err(other.into()),
    }
}

pub(crate) async fn login_form<U, S, N>(
    State(state): State<WebState<U, S, N>>,
    Query(params): Query<FlashParams>,
) -> Result<Response, AppError>
where
    U: UserStore + 'static,
    S: IncidentStore + 'static,
    N: Notifier + 'static,
{
    Ok(Html(state.views.login(params.flash.as_deref(), None)?).into_response())
}

pub(crate) async fn login_submit<U, S, N>(
    State(state): State<WebState<U, S, N>>,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError>
where
    U: UserStore + 'static,
    S: IncidentStore + 'static,
    N: Notifier + 'static,
{
    match state.auth.login(form.username.trim(), &form.password) {
        Ok(issued) => Ok((
            AppendHeaders([(header::SET_COOKIE, issued.set_cookie)]),
            Redirect::to("/"),
        )
            .into_response()),
        Err(AuthError::InvalidCredentials) => {
            let body = state
                .views
                .login(None, Some("Invalid username or password"))?;
            Ok(page(StatusCode::OK, body))
        }
        Err(other) => Err(other.into()),
    }
}

pub(crate) async fn logout<U, S, N>(
    State(state): State<WebState<U, S, N>>,
    headers: HeaderMap,
) -> Result<Response, AppError>
where
    U: UserStore + 'static,
    S: IncidentStore + 'static,
    N: Notifier + 'static,
{
    let Some(session) = state.sessions.authenticate(cookie_header(&headers)) else {
        return Ok(Redirect::to("/login").into_response());
    };

    state.auth.logout(&session);
    Ok((
        AppendHeaders([(header::SET_COOKIE, SessionManager::clear_cookie())]),
        redirect_with_flash("/login", "You have been signed out"),
    )
        .into_response())
}

pub(crate) async fn report_submit<U, S, N>(
    State(state): State<WebState<U, S, N>>,
    headers: HeaderMap,
    Form(form): Form<ReportForm>,
) -> Result<Response, AppError>
where
    U: UserStore + 'static,
    S: IncidentStore + 'static,
    N: Notifier + 'static,
{
    if state.sessions.authenticate(cookie_header(&headers)).is_none() {
        return Ok(Redirect::to("/login").into_response());
    }

    let submission = IncidentSubmission {
        title: form.title,
        description: form.description,
        location: form.location,
        severity: form.severity,
    };

    match state.incidents.report(submission).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(IncidentServiceError::Validation { field }) => {
            let incidents = state.incidents.list()?;
            let body = state
                .views
                .dashboard(&incidents, None, Some(&format!("{field} is required")))?;
            Ok(page(StatusCode::BAD_REQUEST, body))
        }
        Err(IncidentServiceError::Store(err)) => Err(err.into()),
    }
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
