//! # HTTP Server
//!
//! Main HTTP server combining the blueprint, socket and observability
//! routers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderName;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::blueprint_routes::{blueprint_routes, BlueprintState};
use super::config::HttpServerConfig;
use super::observability_routes::{health_routes, observability_routes};
use super::socket_routes::socket_routes;
use crate::observability::{log_event_with_fields, Event};

/// HTTP server for the find blueprint
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with custom configuration
    pub fn with_config(config: HttpServerConfig, state: Arc<BlueprintState>) -> Self {
        let router = Self::build_router(&config, state);
        Self { config, router }
    }

    /// Build the combined router with all endpoints
    fn build_router(config: &HttpServerConfig, state: Arc<BlueprintState>) -> Router {
        let cors = Self::cors_layer(config);
        let metrics = state.finder.metrics().clone();

        Router::new()
            .merge(health_routes())
            .nest("/observability", observability_routes(metrics))
            .merge(socket_routes(state.clone()))
            // Static routes take priority over `/:model`
            .merge(blueprint_routes(state))
            .layer(cors)
    }

    fn cors_layer(config: &HttpServerConfig) -> CorsLayer {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new().allow_origin(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();
            CorsLayer::new().allow_origin(AllowOrigin::list(origins))
        };

        cors.allow_methods(Any)
            .allow_headers(Any)
            .expose_headers([HeaderName::from_static("x-total-count")])
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Start the HTTP server (async)
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let listener = TcpListener::bind(addr).await?;
        let bound = listener.local_addr()?.to_string();
        log_event_with_fields(Event::ServerStart, &[("addr", bound.as_str())]);

        axum::serve(listener, self.router).await?;

        Ok(())
    }
}
