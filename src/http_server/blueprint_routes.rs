//! Blueprint HTTP Routes
//!
//! `GET /:model`, `/:model/find`, `/:model/:id` and `/:model/find/:id`,
//! all answered by the find action.

use std::sync::Arc;

use axum::{
    extract::State,
    http::Uri,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::blueprint::{FindResponse, RecordFinder, RequestContext, Transport};
use crate::realtime::SubscriptionRegistry;

// ==================
// Shared State
// ==================

/// State shared by the blueprint and socket handlers
pub struct BlueprintState {
    pub finder: Arc<RecordFinder>,
    pub subscriptions: Arc<SubscriptionRegistry>,
}

impl BlueprintState {
    pub fn new(finder: Arc<RecordFinder>, subscriptions: Arc<SubscriptionRegistry>) -> Self {
        Self {
            finder,
            subscriptions,
        }
    }
}

// ==================
// Router
// ==================

/// Create blueprint routes
pub fn blueprint_routes(state: Arc<BlueprintState>) -> Router {
    Router::new()
        .route("/:model", get(find_handler))
        .route("/:model/*rest", get(find_handler))
        .with_state(state)
}

// ==================
// Handlers
// ==================

/// Find records over HTTP
async fn find_handler(State(state): State<Arc<BlueprintState>>, uri: Uri) -> Response {
    let ctx = match RequestContext::from_url(&uri.to_string(), Transport::Http) {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };

    FindResponse::from(state.finder.find(&ctx).await).into_response()
}
