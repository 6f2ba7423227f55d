//! Response cache middleware for the front page.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, header},
    middleware::Next,
    response::Response,
};
use metrics::counter;
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::store::{PageCache, buffer_response, should_store_response};
use crate::application::auth::SESSION_COOKIE;

/// Every front page request shares one cache entry, so pagination deep
/// links always re-render while the landing page stays hot.
pub const INDEX_CACHE_KEY: &str = "index_page";

#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub cache: Arc<PageCache>,
}

/// Serves the anonymous front page from cache when a fresh copy
/// exists, and stores newly rendered copies for the configured TTL.
/// Requests from a logged-in browser render personal navigation
/// chrome, so they bypass the cache in both directions.
pub async fn page_cache_layer(
    State(state): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.enabled || request.method() != Method::GET || carries_session(&request) {
        return next.run(request).await;
    }

    if let Some(cached) = state.cache.get(INDEX_CACHE_KEY) {
        counter!("quaderno_page_cache_hits_total").increment(1);
        debug!(key = INDEX_CACHE_KEY, outcome = "hit", "serving cached page");
        return cached.into_response();
    }

    counter!("quaderno_page_cache_misses_total").increment(1);
    let response = next.run(request).await;

    if !should_store_response(&response) {
        return response;
    }

    match buffer_response(response).await {
        Ok((rebuilt, cached)) => {
            state.cache.put(INDEX_CACHE_KEY.to_string(), cached);
            counter!("quaderno_page_cache_stores_total").increment(1);
            rebuilt
        }
        Err((rebuilt, error)) => {
            warn!(error = %error, "failed to buffer response for caching");
            rebuilt
        }
    }
}

fn carries_session(request: &Request<Body>) -> bool {
    let Some(value) = request.headers().get(header::COOKIE) else {
        return false;
    };
    let Ok(cookies) = value.to_str() else {
        // An unreadable cookie header may still hold a session token.
        return true;
    };
    cookies.split(';').any(|pair| {
        pair.trim()
            .split_once('=')
            .is_some_and(|(name, _)| name == SESSION_COOKIE)
    })
}
