//! HTTP front end.
//!
//! Four routes over a [`CatalogService`], each wrapped by the
//! [`observe`] middleware. HTML is rendered by [`views`]; flash messages
//! travel between requests in a signed cookie ([`flash`]).

pub mod flash;
mod handlers;
pub mod observe;
pub mod views;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::catalog::CatalogService;
use crate::config::Config;
use crate::error::Result;

pub use flash::{Flash, FlashCategory, FlashKey};
pub use handlers::AppError;
pub use observe::{Outcome, RequestMeta, RequestObserver, Route, RouteNotes, TracingObserver};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Catalog queries and writes.
    pub catalog: CatalogService,
    /// Key for signing flash cookies.
    pub flash_key: FlashKey,
    /// Hooks run around every request.
    pub observer: Arc<dyn RequestObserver>,
}

impl AppState {
    /// Build state from a catalog service and the loaded configuration.
    #[must_use]
    pub fn new(catalog: CatalogService, config: &Config) -> Self {
        Self {
            catalog,
            flash_key: FlashKey::derive(&config.server.secret_key),
            observer: Arc::new(TracingObserver::new(
                config.telemetry.service_name.clone(),
            )),
        }
    }

    /// Replace the request observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = observer;
        self
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/catalog", get(handlers::course_catalog))
        .route("/course/:code", get(handlers::course_details))
        .route(
            "/add_course",
            get(handlers::add_course_form).post(handlers::add_course_submit),
        )
        .route_layer(from_fn_with_state(state.clone(), observe::observe_requests))
        .with_state(state)
}

/// Serve the application on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("coursecat listening on http://{addr}");
    }
    let app = build_router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
