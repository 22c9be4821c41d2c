use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;

use super::rows::{LeadPatch, LeadRow, NewLeadRow, PropertyRow, SettingsRow};
use super::{BackendStore, StoreError};
use crate::config::StoreConfig;

const PREFER_REPRESENTATION: &str = "return=representation";
const PREFER_MERGE: &str = "resolution=merge-duplicates,return=minimal";

/// PostgREST client for the hosted backend (`/rest/v1/<table>`).
///
/// Row-level security on the backend already scopes reads to the token's
/// user; the explicit `user_id=eq.` filter keeps the local store and the
/// remote one behaving the same.
pub struct RestStore {
    base_url: String,
    anon_key: String,
    access_token: String,
    client: Client,
}

impl RestStore {
    /// Fails with `NotAuthenticated` when the config has no access token.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let access_token = config
            .access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or(StoreError::NotAuthenticated)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Http(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            access_token,
            client,
        })
    }

    fn table_url(&self, table: &str, query: &[(&str, String)]) -> Result<Url, StoreError> {
        let mut url = Url::parse(&format!("{}/rest/v1/{table}", self.base_url))
            .map_err(|e| StoreError::Http(format!("invalid backend URL: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.access_token)
    }

    fn send(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
        let response = builder.send().map_err(|e| {
            if e.is_timeout() {
                StoreError::Http(format!("backend request timed out: {e}"))
            } else {
                StoreError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or(body);
        tracing::warn!(status = status.as_u16(), %message, "Backend write/read rejected");

        if status.as_u16() == 401 {
            return Err(StoreError::NotAuthenticated);
        }
        Err(StoreError::Status {
            status: status.as_u16(),
            message,
        })
    }

    fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, StoreError> {
        let response = self.send(self.request(Method::GET, url))?;
        response
            .json()
            .map_err(|e| StoreError::Http(format!("failed to decode backend rows: {e}")))
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

impl BackendStore for RestStore {
    fn list_leads(&self, owner: &str) -> Result<Vec<LeadRow>, StoreError> {
        let url = self.table_url(
            "leads",
            &[
                ("select", "*".into()),
                ("user_id", eq(owner)),
                ("order", "created_at.desc".into()),
            ],
        )?;
        self.fetch(url)
    }

    fn insert_lead(&self, lead: &NewLeadRow) -> Result<LeadRow, StoreError> {
        let url = self.table_url("leads", &[])?;
        let response = self.send(
            self.request(Method::POST, url)
                .header("Prefer", PREFER_REPRESENTATION)
                .json(&[lead]),
        )?;
        let rows: Vec<LeadRow> = response
            .json()
            .map_err(|e| StoreError::Http(format!("failed to decode inserted lead: {e}")))?;
        rows.into_iter().next().ok_or_else(|| StoreError::Status {
            status: 200,
            message: "insert returned no rows".into(),
        })
    }

    fn update_lead(&self, owner: &str, id: &str, patch: &LeadPatch) -> Result<(), StoreError> {
        if patch.is_empty() {
            return Ok(());
        }
        let url = self.table_url("leads", &[("id", eq(id)), ("user_id", eq(owner))])?;
        self.send(self.request(Method::PATCH, url).json(patch))?;
        Ok(())
    }

    fn delete_lead(&self, owner: &str, id: &str) -> Result<(), StoreError> {
        let url = self.table_url("leads", &[("id", eq(id)), ("user_id", eq(owner))])?;
        self.send(self.request(Method::DELETE, url))?;
        Ok(())
    }

    fn list_properties(&self, owner: &str) -> Result<Vec<PropertyRow>, StoreError> {
        let url = self.table_url(
            "properties",
            &[
                ("select", "*".into()),
                ("user_id", eq(owner)),
                ("order", "created_at.desc".into()),
            ],
        )?;
        self.fetch(url)
    }

    fn insert_property(&self, property: &PropertyRow) -> Result<(), StoreError> {
        if property.user_id.is_none() {
            return Err(StoreError::NotAuthenticated);
        }
        let url = self.table_url("properties", &[])?;
        self.send(self.request(Method::POST, url).json(&[property]))?;
        Ok(())
    }

    fn upsert_property(&self, property: &PropertyRow) -> Result<(), StoreError> {
        if property.user_id.is_none() {
            return Err(StoreError::NotAuthenticated);
        }
        let url = self.table_url(
            "properties",
            &[("on_conflict", "user_id,property_id".into())],
        )?;
        self.send(
            self.request(Method::POST, url)
                .header("Prefer", PREFER_MERGE)
                .json(&[property]),
        )?;
        Ok(())
    }

    fn delete_property(&self, owner: &str, property_id: &str) -> Result<(), StoreError> {
        let url = self.table_url(
            "properties",
            &[("property_id", eq(property_id)), ("user_id", eq(owner))],
        )?;
        self.send(self.request(Method::DELETE, url))?;
        Ok(())
    }

    fn load_settings(&self, owner: &str) -> Result<Option<SettingsRow>, StoreError> {
        let url = self.table_url(
            "agent_settings",
            &[
                ("select", "*".into()),
                ("user_id", eq(owner)),
                ("limit", "1".into()),
            ],
        )?;
        Ok(self.fetch(url)?.into_iter().next())
    }

    fn upsert_settings(&self, settings: &SettingsRow) -> Result<(), StoreError> {
        let url = self.table_url("agent_settings", &[("on_conflict", "user_id".into())])?;
        self.send(
            self.request(Method::POST, url)
                .header("Prefer", PREFER_MERGE)
                .json(&[settings]),
        )?;
        Ok(())
    }
}
