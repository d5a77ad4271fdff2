use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::holding::Holding;
use crate::models::settings::RecordStoreSettings;
use crate::models::user::Identity;

use super::record_store::RecordStore;

const WALLETS: &str = "wallets";
const HOLDINGS: &str = "holdings";

/// Record store backed by a PostgREST-style REST API (e.g. a hosted
/// Postgres with row-level security).
///
/// Tables:
/// - `wallets(user_id, balance)`, one row per user
/// - `holdings(user_id, fund_id, units, purchase_nav)`, unique on `(user_id, fund_id)`
///
/// Requests carry the project API key and, when the identity has one, the
/// user's access token as bearer.
pub struct RestRecordStore {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct WalletRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    balance: f64,
}

/// Wire shape of a holding row.
#[derive(Debug, Serialize, Deserialize)]
struct HoldingRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    fund_id: String,
    units: f64,
    purchase_nav: f64,
}

impl HoldingRow {
    fn for_user(user: &Identity, holding: &Holding) -> Self {
        Self {
            user_id: Some(user.user_id.clone()),
            fund_id: holding.fund_id.clone(),
            units: holding.units,
            purchase_nav: holding.purchase_nav,
        }
    }
}

impl From<HoldingRow> for Holding {
    fn from(row: HoldingRow) -> Self {
        Holding::new(row.fund_id, row.units, row.purchase_nav)
    }
}

impl RestRecordStore {
    pub fn new(settings: &RecordStoreSettings, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: settings.url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        }
    }

    /// REST endpoint of a table.
    #[must_use]
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    /// Parse a `holdings` select response, dropping rows with no units.
    pub fn parse_holdings(body: &str) -> Result<Vec<Holding>, CoreError> {
        let rows: Vec<HoldingRow> = serde_json::from_str(body)
            .map_err(|e| CoreError::store("fetch_holdings", format!("invalid response: {e}")))?;
        Ok(rows
            .into_iter()
            .filter(|r| r.units.is_finite() && r.units > 0.0)
            .map(Holding::from)
            .collect())
    }

    fn request(&self, method: Method, table: &str, user: &Identity) -> RequestBuilder {
        self.authorized(self.client.request(method, self.table_url(table)), user)
            .query(&[("user_id", format!("eq.{}", user.user_id))])
    }

    /// Row inserts carry the owner in the body rather than a filter.
    fn post(&self, table: &str, user: &Identity) -> RequestBuilder {
        self.authorized(self.client.post(self.table_url(table)), user)
    }

    fn authorized(&self, request: RequestBuilder, user: &Identity) -> RequestBuilder {
        let bearer = user.access_token.as_deref().unwrap_or(self.api_key.as_str());
        request.header("apikey", self.api_key.as_str()).bearer_auth(bearer)
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response, CoreError> {
        let resp = request
            .send()
            .await
            .map_err(|e| CoreError::store(operation, CoreError::from(e).to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(CoreError::store(operation, format!("HTTP {status}: {body}")))
    }

    async fn read_body(operation: &str, resp: Response) -> Result<String, CoreError> {
        resp.text()
            .await
            .map_err(|e| CoreError::store(operation, CoreError::from(e).to_string()))
    }

    /// PATCH that must touch exactly the filtered rows; an empty
    /// representation means nothing matched.
    async fn patch_existing(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<(), CoreError> {
        let resp = self
            .send(operation, request.header("Prefer", "return=representation"))
            .await?;
        let body = Self::read_body(operation, resp).await?;
        let rows: Vec<serde_json::Value> = serde_json::from_str(&body)
            .map_err(|e| CoreError::store(operation, format!("invalid response: {e}")))?;
        if rows.is_empty() {
            return Err(CoreError::store(operation, "no matching row"));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn fetch_wallet(&self, user: &Identity) -> Result<Option<f64>, CoreError> {
        let op = "fetch_wallet";
        let req = self
            .request(Method::GET, WALLETS, user)
            .query(&[("select", "balance")]);
        let body = Self::read_body(op, self.send(op, req).await?).await?;
        let rows: Vec<WalletRow> = serde_json::from_str(&body)
            .map_err(|e| CoreError::store(op, format!("invalid response: {e}")))?;
        Ok(rows.first().map(|r| r.balance))
    }

    async fn create_wallet(&self, user: &Identity, balance: f64) -> Result<(), CoreError> {
        let row = WalletRow {
            user_id: Some(user.user_id.clone()),
            balance,
        };
        let req = self.post(WALLETS, user).json(&row);
        self.send("create_wallet", req).await?;
        Ok(())
    }

    async fn set_wallet_balance(&self, user: &Identity, balance: f64) -> Result<(), CoreError> {
        let req = self
            .request(Method::PATCH, WALLETS, user)
            .json(&WalletRow { user_id: None, balance });
        self.patch_existing("set_wallet_balance", req).await
    }

    async fn fetch_holdings(&self, user: &Identity) -> Result<Vec<Holding>, CoreError> {
        let op = "fetch_holdings";
        let req = self
            .request(Method::GET, HOLDINGS, user)
            .query(&[("select", "fund_id,units,purchase_nav")]);
        let body = Self::read_body(op, self.send(op, req).await?).await?;
        Self::parse_holdings(&body)
    }

    async fn insert_holding(&self, user: &Identity, holding: &Holding) -> Result<(), CoreError> {
        let req = self
            .post(HOLDINGS, user)
            .json(&HoldingRow::for_user(user, holding));
        self.send("insert_holding", req).await?;
        Ok(())
    }

    async fn update_holding(&self, user: &Identity, holding: &Holding) -> Result<(), CoreError> {
        let mut row = HoldingRow::for_user(user, holding);
        row.user_id = None;
        let req = self
            .request(Method::PATCH, HOLDINGS, user)
            .query(&[("fund_id", format!("eq.{}", holding.fund_id))])
            .json(&row);
        self.patch_existing("update_holding", req).await
    }

    async fn upsert_holding(&self, user: &Identity, holding: &Holding) -> Result<(), CoreError> {
        let req = self
            .post(HOLDINGS, user)
            .header("Prefer", "resolution=merge-duplicates")
            .query(&[("on_conflict", "user_id,fund_id")])
            .json(&HoldingRow::for_user(user, holding));
        self.send("upsert_holding", req).await?;
        Ok(())
    }

    async fn delete_holding(&self, user: &Identity, fund_id: &str) -> Result<(), CoreError> {
        let req = self
            .request(Method::DELETE, HOLDINGS, user)
            .query(&[("fund_id", format!("eq.{fund_id}"))]);
        self.send("delete_holding", req).await?;
        Ok(())
    }
}
