//! Email engagement tracking: open pixel and click redirect.
//!
//! Neither endpoint ever reports a failure to the caller. Store errors are
//! logged and swallowed; the response is always the pixel or a redirect.

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::state::AppState;
use crate::store::Store;

/// 1×1 transparent GIF.
pub const TRANSPARENT_GIF: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

#[derive(Debug, Default, Deserialize)]
pub struct TrackingQuery {
    #[serde(rename = "trackingId")]
    pub tracking_id: Option<String>,
    pub url: Option<String>,
}

impl TrackingQuery {
    fn tracking_id(&self) -> Option<&str> {
        non_empty(self.tracking_id.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn open_pixel_url(base_url: &str, tracking_id: &str) -> anyhow::Result<String> {
    let mut url = endpoint(base_url, "open")?;
    url.query_pairs_mut().append_pair("trackingId", tracking_id);
    Ok(url.to_string())
}

/// Wraps `target` so following it goes through the click tracker first.
pub fn click_url(base_url: &str, tracking_id: &str, target: &str) -> anyhow::Result<String> {
    let mut url = endpoint(base_url, "click")?;
    url.query_pairs_mut()
        .append_pair("trackingId", tracking_id)
        .append_pair("url", target);
    Ok(url.to_string())
}

fn endpoint(base_url: &str, kind: &str) -> anyhow::Result<Url> {
    let raw = format!("{}/api/email/track/{kind}", base_url.trim_end_matches('/'));
    Url::parse(&raw).with_context(|| format!("Invalid tracking endpoint '{raw}'"))
}

/// Records the first open for `tracking_id`. Later opens are no-ops.
pub async fn record_open(store: &dyn Store, clock: &dyn Clock, tracking_id: &str) {
    match store.mark_opened(tracking_id, clock.now()).await {
        Ok(true) => debug!(tracking_id, "Recorded email open"),
        Ok(false) => debug!(tracking_id, "Open already recorded or unknown tracking id"),
        Err(e) => warn!(tracking_id, "Failed to record email open: {e}"),
    }
}

/// Records the first click for `tracking_id`. Later clicks are no-ops.
pub async fn record_click(store: &dyn Store, clock: &dyn Clock, tracking_id: &str) {
    match store.mark_clicked(tracking_id, clock.now()).await {
        Ok(true) => debug!(tracking_id, "Recorded email click"),
        Ok(false) => debug!(tracking_id, "Click already recorded or unknown tracking id"),
        Err(e) => warn!(tracking_id, "Failed to record email click: {e}"),
    }
}

/// Picks the redirect target. Falls back to `default_url` when either the
/// tracking id or the target is missing, or the target is not an absolute
/// http(s) URL.
pub fn redirect_target(tracking_id: Option<&str>, url: Option<&str>, default_url: &str) -> String {
    let (Some(_), Some(target)) = (non_empty(tracking_id), non_empty(url)) else {
        return default_url.to_string();
    };
    match Url::parse(target) {
        // Serialized from the parsed URL so the Location header is always valid ASCII.
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed.to_string(),
        _ => {
            warn!(redirect = target, "Rejected click redirect target");
            default_url.to_string()
        }
    }
}

/// GET /api/email/track/open?trackingId=
pub async fn handle_open(
    State(state): State<AppState>,
    query: Option<Query<TrackingQuery>>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    if let Some(tracking_id) = query.tracking_id() {
        record_open(state.store.as_ref(), state.clock.as_ref(), tracking_id).await;
    }
    pixel_response()
}

/// GET /api/email/track/click?trackingId=&url=
pub async fn handle_click(
    State(state): State<AppState>,
    query: Option<Query<TrackingQuery>>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    if let Some(tracking_id) = query.tracking_id() {
        record_click(state.store.as_ref(), state.clock.as_ref(), tracking_id).await;
    }
    let target = redirect_target(
        query.tracking_id.as_deref(),
        query.url.as_deref(),
        &state.config.default_redirect_url,
    );
    Redirect::temporary(&target).into_response()
}

fn pixel_response() -> Response {
    (
        [
            (header::CONTENT_TYPE, "image/gif"),
            (
                header::CACHE_CONTROL,
                "no-store, no-cache, must-revalidate, private",
            ),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        TRANSPARENT_GIF.as_slice(),
    )
        .into_response()
}
