//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::Cache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    CapacityRequest, CapacityResponse, DeleteResponse, DumpResponse, GetResponse, HealthResponse,
    SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// The cache synchronizes internally, so handlers share it through a plain `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Shared string cache
    pub cache: Arc<Cache<String, String>>,
    /// TTL applied when a set request omits one; zero means never expire
    pub default_ttl: Duration,
}

impl AppState {
    /// Creates a new AppState around an existing cache.
    pub fn new(cache: Cache<String, String>, default_ttl: Duration) -> Self {
        Self {
            cache: Arc::new(cache),
            default_ttl,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Must be called inside a Tokio runtime, since the cache starts its sweeper.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = Cache::with_config(config.cache_config())?;
        Ok(Self::new(cache, config.default_ttl()))
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair. An explicit `ttl` of 0 disables expiration;
/// an omitted one falls back to the server default.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req
        .ttl
        .map(Duration::from_secs)
        .unwrap_or(state.default_ttl);

    state.cache.set_with_ttl(req.key.clone(), req.value, ttl);

    let applied = (!ttl.is_zero()).then(|| ttl.as_secs());
    Ok(Json(SetResponse::new(req.key, applied)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key) {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.cache.delete(&key) {
        return Err(CacheError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for POST /dump
///
/// Empties the cache and cancels every pending expiration.
pub async fn dump_handler(State(state): State<AppState>) -> Json<DumpResponse> {
    let cleared = state.cache.dump();

    Json(DumpResponse::new(cleared))
}

/// Handler for PUT /capacity
pub async fn capacity_handler(
    State(state): State<AppState>,
    Json(req): Json<CapacityRequest>,
) -> Result<Json<CapacityResponse>> {
    let evicted = state.cache.set_capacity(req.capacity)?;

    Ok(Json(CapacityResponse {
        capacity: req.capacity,
        evicted,
    }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats();
    Json(StatsResponse::new(&stats, state.cache.capacity()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
