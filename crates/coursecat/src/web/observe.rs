//! Per-request tracing around every route.
//!
//! The middleware asks a [`RequestObserver`] to open a span before the
//! handler runs and hands it the [`Outcome`] afterwards. Handlers never touch
//! spans; they describe what happened by attaching [`RouteNotes`] to their
//! response.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, MatchedPath, State};
use axum::http::header::{HOST, LOCATION};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tracing::field::Empty;
use tracing::{debug, error, info, Instrument, Span};

use super::AppState;

/// The application's routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `GET /`
    Index,
    /// `GET /catalog`
    CourseCatalog,
    /// `GET /course/:code`
    CourseDetails,
    /// `GET|POST /add_course`
    AddCourse,
    /// Anything else.
    Other,
}

impl Route {
    /// Map an axum route template to a route.
    #[must_use]
    pub fn from_matched_path(path: &str) -> Self {
        match path {
            "/" => Self::Index,
            "/catalog" => Self::CourseCatalog,
            "/course/:code" => Self::CourseDetails,
            "/add_course" => Self::AddCourse,
            _ => Self::Other,
        }
    }
}

/// What is known about a request before its handler runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    /// Which route matched.
    pub route: Route,
    /// Peer address, or `unknown` when not served with connect info.
    pub user_ip: String,
    /// Absolute request URL.
    pub http_url: String,
    /// Request method.
    pub http_method: String,
}

impl RequestMeta {
    /// Collect request metadata.
    #[must_use]
    pub fn from_request(request: &Request<Body>) -> Self {
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map_or(Route::Other, |p| Route::from_matched_path(p.as_str()));

        let user_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map_or_else(|| "unknown".to_string(), |ci| ci.0.ip().to_string());

        let path = request
            .uri()
            .path_and_query()
            .map_or("/", |pq| pq.as_str());
        let http_url = match request.headers().get(HOST).and_then(|h| h.to_str().ok()) {
            Some(host) => format!("http://{host}{path}"),
            None => request.uri().to_string(),
        };

        Self {
            route,
            user_ip,
            http_url,
            http_method: request.method().to_string(),
        }
    }
}

/// Facts a handler reports about its request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteNotes {
    /// Number of courses shown.
    pub course_count: Option<usize>,
    /// Code of the course shown.
    pub course_code: Option<String>,
    /// User-facing failure, if the request did not succeed.
    pub error: Option<String>,
    /// Informational log lines, in order.
    pub events: Vec<String>,
}

impl RouteNotes {
    /// Add an informational event.
    #[must_use]
    pub fn event(mut self, message: impl Into<String>) -> Self {
        self.events.push(message.into());
        self
    }

    /// Record the number of courses shown.
    #[must_use]
    pub fn course_count(mut self, count: usize) -> Self {
        self.course_count = Some(count);
        self
    }

    /// Record the course shown.
    #[must_use]
    pub fn course_code(mut self, code: impl Into<String>) -> Self {
        self.course_code = Some(code.into());
        self
    }

    /// Record a failure.
    #[must_use]
    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// Attach these notes to a response for the middleware to pick up.
    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// What happened to a request, as seen from its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Response status.
    pub status: StatusCode,
    /// Redirect target, for 3xx responses.
    pub redirect: Option<String>,
    /// Notes attached by the handler.
    pub notes: RouteNotes,
}

impl Outcome {
    /// Derive the outcome from a finished response.
    #[must_use]
    pub fn from_response(response: &Response) -> Self {
        let status = response.status();
        let redirect = if status.is_redirection() {
            response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        } else {
            None
        };

        Self {
            status,
            redirect,
            notes: response
                .extensions()
                .get::<RouteNotes>()
                .cloned()
                .unwrap_or_default(),
        }
    }
}

/// Hooks run around every routed request.
pub trait RequestObserver: Send + Sync + std::fmt::Debug {
    /// Open the span the handler will run in.
    fn before(&self, meta: &RequestMeta) -> Span;

    /// Record the outcome. Called inside `span`.
    fn after(&self, span: &Span, meta: &RequestMeta, outcome: &Outcome);
}

/// Default observer: one `tracing` span per request plus log lines.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    service_name: String,
}

impl TracingObserver {
    /// Create an observer that tags spans with `service_name`.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }
}

// Span names must be literals, so each route gets its own expansion.
macro_rules! request_span {
    ($name:literal, $service:expr, $meta:expr) => {
        tracing::info_span!(
            $name,
            service = %$service,
            user_ip = %$meta.user_ip,
            http_url = %$meta.http_url,
            http_method = %$meta.http_method,
            http_status = Empty,
            course_count = Empty,
            course_code = Empty,
            error.message = Empty,
        )
    };
}

impl RequestObserver for TracingObserver {
    fn before(&self, meta: &RequestMeta) -> Span {
        match meta.route {
            Route::Index => request_span!("index", self.service_name, meta),
            Route::CourseCatalog => request_span!("course_catalog", self.service_name, meta),
            Route::CourseDetails => request_span!("course_details", self.service_name, meta),
            Route::AddCourse => request_span!("add_course", self.service_name, meta),
            Route::Other => request_span!("http_request", self.service_name, meta),
        }
    }

    fn after(&self, span: &Span, meta: &RequestMeta, outcome: &Outcome) {
        let notes = &outcome.notes;
        span.record("http_status", outcome.status.as_u16());
        if let Some(count) = notes.course_count {
            span.record("course_count", u64::try_from(count).unwrap_or(u64::MAX));
        }
        if let Some(code) = &notes.course_code {
            span.record("course_code", code.as_str());
        }

        for event in &notes.events {
            info!("{event}");
        }
        if let Some(message) = &notes.error {
            span.record("error.message", message.as_str());
            error!("{message}");
        }
        if let Some(location) = &outcome.redirect {
            debug!(
                "{} {} redirected to {location}",
                meta.http_method, meta.http_url
            );
        }
    }
}

/// Middleware wrapping each routed request in its observer span.
pub(crate) async fn observe_requests(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let meta = RequestMeta::from_request(&request);
    let span = state.observer.before(&meta);

    let response = next.run(request).instrument(span.clone()).await;

    let outcome = Outcome::from_response(&response);
    span.in_scope(|| state.observer.after(&span, &meta, &outcome));
    response
}
