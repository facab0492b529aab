//! # siren-geo
//!
//! Nominatim-style geocoding client. The portal treats geocoding as an
//! opaque collaborator: results are strings to store in the `location` and
//! target-institution fields, and a network failure always degrades to a
//! usable fallback (the raw coordinate string, or the fixed institution
//! option) rather than blocking request creation.

use std::time::Duration;

use serde_json::Value;

use siren_core::error::{Error, Result};
use siren_core::observability::upstream_span;
use siren_core::service::ServiceKind;

/// Default request timeout for geocoding lookups.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How many search candidates are offered before the fixed fallback.
const MAX_CANDIDATES: usize = 4;

/// Geocoding client over an HTTP endpoint with Nominatim query semantics.
pub struct Geocoder {
    client: reqwest::Client,
    base_url: String,
}

impl Geocoder {
    /// Creates a geocoder against the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Reverse geocodes coordinates into a human-readable place string.
    ///
    /// Prefers `city, state`, then the display name; any failure degrades to
    /// the raw `"lat, lon"` string. This never returns an error: a report
    /// with an unresolved location is still a valid report.
    pub async fn reverse(&self, lat: f64, lon: f64) -> String {
        let span = upstream_span("geocoder", "reverse");
        let _guard = span.enter();

        let url = format!(
            "{}/reverse?format=jsonv2&lat={lat}&lon={lon}&addressdetails=1",
            self.base_url
        );
        match self.fetch_json(&url).await {
            Ok(body) => place_from_response(&body, lat, lon),
            Err(err) => {
                tracing::warn!(error = %err, "reverse geocoding failed, keeping raw coordinates");
                coordinate_string(lat, lon)
            }
        }
    }

    /// Searches for nearby institutions of the given service kind.
    ///
    /// Returns up to four candidates from a bounded viewbox around the
    /// coordinates, always followed by the fixed fallback option. Upstream
    /// failure degrades to the fallback option alone.
    pub async fn nearby_institutions(&self, kind: ServiceKind, lat: f64, lon: f64) -> Vec<String> {
        let span = upstream_span("geocoder", "search");
        let _guard = span.enter();

        let delta = search_delta(kind);
        let url = format!(
            "{}/search?format=jsonv2&q={}&limit=5&viewbox={}&bounded=1",
            self.base_url,
            search_term(kind).replace(' ', "+"),
            viewbox(lat, lon, delta),
        );
        match self.fetch_json(&url).await {
            Ok(body) => institutions_from_response(kind, &body),
            Err(err) => {
                tracing::warn!(service = %kind, error = %err, "institution search failed, offering fallback only");
                vec![fallback_institution(kind).to_string()]
            }
        }
    }

    async fn fetch_json(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::upstream(format!("geocoding request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::upstream(format!(
                "geocoding endpoint returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::upstream(format!("geocoding response unreadable: {e}")))
    }
}

/// Extracts a place string from a reverse-geocoding response.
#[must_use]
pub fn place_from_response(body: &Value, lat: f64, lon: f64) -> String {
    let address = &body["address"];
    if let Some(city) = address["city"].as_str() {
        return match address["state"].as_str() {
            Some(state) => format!("{city}, {state}"),
            None => city.to_string(),
        };
    }
    body["display_name"]
        .as_str()
        .map_or_else(|| coordinate_string(lat, lon), str::to_string)
}

/// Extracts institution options from a search response: the first four
/// display names, then the fixed fallback.
#[must_use]
pub fn institutions_from_response(kind: ServiceKind, body: &Value) -> Vec<String> {
    let mut options: Vec<String> = body
        .as_array()
        .map(|results| {
            results
                .iter()
                .filter_map(|entry| entry["display_name"].as_str())
                .take(MAX_CANDIDATES)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    options.push(fallback_institution(kind).to_string());
    options
}

/// Formats the bounded search viewbox around a point.
#[must_use]
pub fn viewbox(lat: f64, lon: f64, delta: f64) -> String {
    format!(
        "{},{},{},{}",
        lon - delta,
        lat + delta,
        lon + delta,
        lat - delta
    )
}

/// Search radius per kind: hospitals are searched tightly, stations wider.
#[must_use]
pub const fn search_delta(kind: ServiceKind) -> f64 {
    match kind {
        ServiceKind::Ambulance => 0.02,
        ServiceKind::Fire | ServiceKind::Crime => 0.20,
    }
}

/// The query term used for each kind.
#[must_use]
pub const fn search_term(kind: ServiceKind) -> &'static str {
    match kind {
        ServiceKind::Ambulance => "hospital",
        ServiceKind::Fire => "fire station",
        ServiceKind::Crime => "police station",
    }
}

/// The fixed institution option always offered last.
#[must_use]
pub const fn fallback_institution(kind: ServiceKind) -> &'static str {
    match kind {
        ServiceKind::Ambulance => "City Hospital",
        ServiceKind::Fire => "City Fire Brigade",
        ServiceKind::Crime => "City Police Station",
    }
}

fn coordinate_string(lat: f64, lon: f64) -> String {
    format!("{lat}, {lon}")
}
