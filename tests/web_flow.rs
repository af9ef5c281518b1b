//! End-to-end specifications for the registration, login, and incident
//! reporting flow, driven through the public router so the form handling,
//! session gating, and storage are exercised together.

mod common {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, Response, StatusCode};
    use axum::Router;
    use tower::util::ServiceExt;

    use incident_desk::auth::{AuthGate, SessionManager};
    use incident_desk::http::{web_router, Views, WebState};
    use incident_desk::incidents::IncidentService;
    use incident_desk::notify::{DeliveryError, Notifier};
    use incident_desk::store::SqliteStore;

    pub(super) struct RecordingNotifier {
        pub(super) sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(
            &self,
            recipient: &str,
            subject: &str,
            body: &str,
        ) -> Result<(), DeliveryError> {
            self.sent.lock().expect("notifier mutex poisoned").push((
                recipient.to_string(),
                subject.to_string(),
                body.to_string(),
            ));
            Ok(())
        }
    }

    pub(super) struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send(&self, _: &str, _: &str, _: &str) -> Result<(), DeliveryError> {
            Err(DeliveryError::Address(
                "missing-domain".parse::<lettre::Address>().unwrap_err(),
            ))
        }
    }

    pub(super) fn app_with<N: Notifier + 'static>(notifier: Arc<N>) -> Router {
        let store = Arc::new(SqliteStore::open_in_memory().expect("store opens"));
        let sessions = Arc::new(SessionManager::new("integration-test-secret"));
        let views = Arc::new(Views::new().expect("templates register"));
        let auth = Arc::new(AuthGate::new(store.clone(), sessions.clone()));
        let incidents = Arc::new(IncidentService::new(
            store,
            notifier,
            "admin@example.com".to_string(),
        ));

        web_router(WebState {
            auth,
            incidents,
            sessions,
            views,
        })
    }

    pub(super) fn recording_app() -> (Router, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier {
            sent: Mutex::new(Vec::new()),
        });
        (app_with(notifier.clone()), notifier)
    }

    pub(super) async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        form_body: Option<&str>,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if form_body.is_some() {
            builder = builder.header(
                header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            );
        }
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie.to_string());
        }
        let request = builder
            .body(Body::from(form_body.unwrap_or("").to_string()))
            .expect("request builds");

        app.clone().oneshot(request).await.expect("router responds")
    }

    pub(super) async fn body_text(response: Response<Body>) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        String::from_utf8(bytes.to_vec()).expect("body is utf-8")
    }

    pub(super) fn location(response: &Response<Body>) -> String {
        response
            .headers()
            .get(header::LOCATION)
            .expect("location header set")
            .to_str()
            .expect("location is ascii")
            .to_string()
    }

    pub(super) fn session_cookie(response: &Response<Body>) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .expect("set-cookie header present")
            .to_str()
            .expect("cookie is ascii")
            .split(';')
            .next()
            .expect("cookie has a value segment")
            .to_string()
    }

    /// Register and log in, returning the session cookie to attach to
    /// protected requests.
    pub(super) async fn logged_in_cookie(app: &Router, username: &str) -> String {
        let form = format!("username={username}&password=s3cret");
        let registered = send(app, "POST", "/register", Some(&form), None).await;
        assert!(registered.status().is_redirection());

        let logged_in = send(app, "POST", "/login", Some(&form), None).await;
        assert_eq!(location(&logged_in), "/");
        session_cookie(&logged_in)
    }

    pub(super) const SEE_OTHER: StatusCode = StatusCode::SEE_OTHER;
}

use common::*;
use axum::http::StatusCode;
use std::sync::Arc;

#[tokio::test]
async fn unauthenticated_dashboard_redirects_to_login() {
    let (app, _) = recording_app();

    let response = send(&app, "GET", "/", None, None).await;
    assert_eq!(response.status(), SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn register_then_login_reaches_the_dashboard() {
    let (app, _) = recording_app();

    let registered = send(
        &app,
        "POST",
        "/register",
        Some("username=alice&password=s3cret"),
        None,
    )
    .await;
    assert_eq!(registered.status(), SEE_OTHER);
    assert!(location(&registered).starts_with("/login?flash="));

    let logged_in = send(
        &app,
        "POST",
        "/login",
        Some("username=alice&password=s3cret"),
        None,
    )
    .await;
    assert_eq!(logged_in.status(), SEE_OTHER);
    let cookie = session_cookie(&logged_in);

    let dashboard = send(&app, "GET", "/", None, Some(&cookie)).await;
    assert_eq!(dashboard.status(), StatusCode::OK);
    let page = body_text(dashboard).await;
    assert!(page.contains("Incident Dashboard"));
    assert!(page.contains("No incidents reported yet"));
}

#[tokio::test]
async fn duplicate_registration_is_a_form_error_not_a_crash() {
    let (app, _) = recording_app();

    let first = send(
        &app,
        "POST",
        "/register",
        Some("username=alice&password=p1"),
        None,
    )
    .await;
    assert_eq!(first.status(), SEE_OTHER);

    let second = send(
        &app,
        "POST",
        "/register",
        Some("username=alice&password=p2"),
        None,
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let page = body_text(second).await;
    assert!(page.contains("already taken"));

    // The original credentials still work: no second record was written.
    let logged_in = send(
        &app,
        "POST",
        "/login",
        Some("username=alice&password=p1"),
        None,
    )
    .await;
    assert_eq!(location(&logged_in), "/");
}

#[tokio::test]
async fn blank_registration_fields_are_named() {
    let (app, _) = recording_app();

    let response = send(&app, "POST", "/register", Some("username=&password=x"), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("username is required"));

    let response = send(
        &app,
        "POST",
        "/register",
        Some("username=alice&password="),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("password is required"));
}

#[tokio::test]
async fn wrong_password_rerenders_login_with_a_generic_message() {
    let (app, _) = recording_app();
    send(
        &app,
        "POST",
        "/register",
        Some("username=alice&password=right"),
        None,
    )
    .await;

    let response = send(
        &app,
        "POST",
        "/login",
        Some("username=alice&password=wrong"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("Invalid username or password"));

    // Unknown users get the same message.
    let response = send(
        &app,
        "POST",
        "/login",
        Some("username=mallory&password=right"),
        None,
    )
    .await;
    assert!(body_text(response).await.contains("Invalid username or password"));
}

#[tokio::test]
async fn reported_incident_shows_on_the_dashboard_and_notifies() {
    let (app, notifier) = recording_app();
    let cookie = logged_in_cookie(&app, "alice").await;

    let reported = send(
        &app,
        "POST",
        "/report",
        Some("title=Fire&description=Kitchen%20fire&location=Bldg%20A&severity=High"),
        Some(&cookie),
    )
    .await;
    assert_eq!(reported.status(), SEE_OTHER);
    assert_eq!(location(&reported), "/");

    let dashboard = send(&app, "GET", "/", None, Some(&cookie)).await;
    let page = body_text(dashboard).await;
    assert!(page.contains("Fire"));
    assert!(page.contains("Kitchen fire"));
    assert!(page.contains("Bldg A"));
    assert!(page.contains("High"));

    let sent = notifier.sent.lock().expect("notifier mutex poisoned");
    assert_eq!(
        sent.as_slice(),
        [(
            "admin@example.com".to_string(),
            "New Incident Reported".to_string(),
            "Incident Fire reported.".to_string(),
        )]
    );
}

#[tokio::test]
async fn incidents_render_in_submission_order() {
    let (app, _) = recording_app();
    let cookie = logged_in_cookie(&app, "alice").await;

    for title in ["first", "second", "third"] {
        let form = format!("title={title}&description=d&location=l&severity=Low");
        send(&app, "POST", "/report", Some(&form), Some(&cookie)).await;
    }

    let page = body_text(send(&app, "GET", "/", None, Some(&cookie)).await).await;
    let first = page.find("first").expect("first listed");
    let second = page.find("second").expect("second listed");
    let third = page.find("third").expect("third listed");
    assert!(first < second && second < third);
}

#[tokio::test]
async fn unauthenticated_report_is_redirected_not_stored() {
    let (app, _) = recording_app();

    let response = send(
        &app,
        "POST",
        "/report",
        Some("title=Fire&description=d&location=l&severity=High"),
        None,
    )
    .await;
    assert_eq!(response.status(), SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let cookie = logged_in_cookie(&app, "alice").await;
    let page = body_text(send(&app, "GET", "/", None, Some(&cookie)).await).await;
    assert!(page.contains("No incidents reported yet"));
}

#[tokio::test]
async fn missing_report_field_is_a_400_naming_the_field() {
    let (app, _) = recording_app();
    let cookie = logged_in_cookie(&app, "alice").await;

    let response = send(
        &app,
        "POST",
        "/report",
        Some("title=&description=d&location=l&severity=High"),
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("title is required"));
}

#[tokio::test]
async fn notifier_failure_still_persists_the_incident() {
    let app = app_with(Arc::new(FailingNotifier));
    let cookie = logged_in_cookie(&app, "alice").await;

    let reported = send(
        &app,
        "POST",
        "/report",
        Some("title=Fire&description=d&location=l&severity=High"),
        Some(&cookie),
    )
    .await;
    assert_eq!(reported.status(), SEE_OTHER);

    let page = body_text(send(&app, "GET", "/", None, Some(&cookie)).await).await;
    assert!(page.contains("Fire"));
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let (app, _) = recording_app();
    let cookie = logged_in_cookie(&app, "alice").await;

    let logged_out = send(&app, "GET", "/logout", None, Some(&cookie)).await;
    assert_eq!(logged_out.status(), SEE_OTHER);
    assert!(location(&logged_out).starts_with("/login"));

    let dashboard = send(&app, "GET", "/", None, Some(&cookie)).await;
    assert_eq!(dashboard.status(), SEE_OTHER);
    assert_eq!(location(&dashboard), "/login");
}

#[tokio::test]
async fn tampered_session_cookie_is_treated_as_anonymous() {
    let (app, _) = recording_app();
    let cookie = logged_in_cookie(&app, "alice").await;

    let mut forged = cookie.clone();
    let at = "sid=".len();
    let original = forged.as_bytes()[at] as char;
    let flipped = if original == 'A' { 'B' } else { 'A' };
    forged.replace_range(at..at + 1, &flipped.to_string());

    let dashboard = send(&app, "GET", "/", None, Some(&forged)).await;
    assert_eq!(dashboard.status(), SEE_OTHER);
    assert_eq!(location(&dashboard), "/login");
}
