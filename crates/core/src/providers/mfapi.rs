use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::fund::{NavPoint, SchemeData, SchemeListing};
use super::traits::FundDataProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.mfapi.in";

const PROVIDER: &str = "mfapi";

/// mfapi.in provider for Indian mutual fund NAVs.
///
/// - **Free**: No API key required.
/// - **Endpoints**: `/mf` (scheme listing), `/mf/{scheme_code}` (meta + history)
/// - **History order**: newest first, dates formatted `dd-mm-yyyy`, NAVs as strings.
pub struct MfApiProvider {
    client: Client,
    base_url: String,
}

impl MfApiProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
        }
    }

    /// Parse a `/mf/{scheme_code}` response body.
    ///
    /// Points with an unparsable date or NAV are skipped. A body without a
    /// scheme name or without any usable point is reported as an API error:
    /// mfapi answers unknown codes with an empty `meta` and `data`.
    pub fn parse_scheme(fund_id: &str, body: &str) -> Result<SchemeData, CoreError> {
        let resp: SchemeResponse = serde_json::from_str(body).map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse scheme {fund_id}: {e}"),
        })?;

        if resp.status.as_deref().is_some_and(|s| !s.eq_ignore_ascii_case("SUCCESS")) {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Scheme {fund_id} request returned status {:?}", resp.status),
            });
        }

        let name = resp
            .meta
            .scheme_name
            .ok_or_else(|| CoreError::FundNotFound(fund_id.to_string()))?;

        let history: Vec<NavPoint> = resp
            .data
            .iter()
            .filter_map(|p| {
                let date = NaiveDate::parse_from_str(&p.date, "%d-%m-%Y").ok()?;
                let nav: f64 = p.nav.trim().parse().ok()?;
                (nav.is_finite() && nav > 0.0).then_some(NavPoint { date, nav })
            })
            .collect();

        if history.is_empty() {
            return Err(CoreError::PriceNotAvailable(fund_id.to_string()));
        }

        let id = resp
            .meta
            .scheme_code
            .map(SchemeCode::into_string)
            .unwrap_or_else(|| fund_id.to_string());

        Ok(SchemeData {
            id,
            name,
            category: resp.meta.scheme_category.filter(|c| !c.is_empty()),
            fund_house: resp.meta.fund_house.filter(|h| !h.is_empty()),
            history,
        })
    }

    /// Parse a `/mf` listing response body.
    pub fn parse_listing(body: &str) -> Result<Vec<SchemeListing>, CoreError> {
        let entries: Vec<ListingEntry> = serde_json::from_str(body).map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse scheme listing: {e}"),
        })?;

        Ok(entries
            .into_iter()
            .map(|e| SchemeListing {
                id: e.scheme_code.into_string(),
                name: e.scheme_name,
            })
            .collect())
    }

    async fn get_text(&self, url: &str) -> Result<String, CoreError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("HTTP {status} for {url}"),
            });
        }
        Ok(resp.text().await?)
    }
}

impl Default for MfApiProvider {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, Duration::from_secs(30))
    }
}

// ── mfapi response types ────────────────────────────────────────────

/// Scheme codes come back as numbers in some payloads and strings in others.
#[derive(Deserialize)]
#[serde(untagged)]
enum SchemeCode {
    Number(u64),
    Text(String),
}

impl SchemeCode {
    fn into_string(self) -> String {
        match self {
            SchemeCode::Number(n) => n.to_string(),
            SchemeCode::Text(s) => s,
        }
    }
}

#[derive(Deserialize)]
struct ListingEntry {
    #[serde(rename = "schemeCode")]
    scheme_code: SchemeCode,
    #[serde(rename = "schemeName")]
    scheme_name: String,
}

#[derive(Deserialize)]
struct SchemeResponse {
    #[serde(default)]
    meta: SchemeMeta,
    #[serde(default)]
    data: Vec<NavEntry>,
    status: Option<String>,
}

#[derive(Deserialize, Default)]
struct SchemeMeta {
    fund_house: Option<String>,
    scheme_category: Option<String>,
    scheme_code: Option<SchemeCode>,
    scheme_name: Option<String>,
}

#[derive(Deserialize)]
struct NavEntry {
    date: String,
    nav: String,
}

#[async_trait]
impl FundDataProvider for MfApiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn list_schemes(&self) -> Result<Vec<SchemeListing>, CoreError> {
        let url = format!("{}/mf", self.base_url);
        let body = self.get_text(&url).await?;
        Self::parse_listing(&body)
    }

    async fn fetch_scheme(&self, fund_id: &str) -> Result<SchemeData, CoreError> {
        let code = fund_id.trim();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::Validation(format!("Invalid scheme code '{fund_id}'")));
        }
        let url = format!("{}/mf/{code}", self.base_url);
        let body = self.get_text(&url).await?;
        Self::parse_scheme(code, &body)
    }
}
