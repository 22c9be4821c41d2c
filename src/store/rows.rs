use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StoreError;
use crate::models::{
    AgentSettings, FinancingStatus, Lead, LeadStatus, LeadUpdate, PropertyRecord,
    GENERAL_PROPERTY,
};

pub const DEFAULT_LEAD_NAME: &str = "New Prospect";
pub const NOT_AVAILABLE: &str = "N/A";
pub const DEFAULT_CAPTURE_SUMMARY: &str = "Captured via AI Concierge";

// ── leads ──────────────────────────────────────────────────

/// A `leads` row as the backend returns it. Every column except `id` may be
/// null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadRow {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub financing_status: Option<String>,
    #[serde(default)]
    pub property_address: Option<String>,
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default)]
    pub chat_summary: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl LeadRow {
    /// Map to a `Lead`, filling the UI defaults for null columns.
    pub fn into_lead(self) -> Lead {
        let status = match non_empty(&self.status) {
            Some(s) => LeadStatus::from_str(s).unwrap_or_else(|e| {
                tracing::warn!(lead_id = %self.id, error = %e, "Unknown lead status, using New");
                LeadStatus::New
            }),
            None => LeadStatus::New,
        };
        let financing_status = non_empty(&self.financing_status)
            .and_then(|s| FinancingStatus::from_str(s).ok())
            .unwrap_or_default();

        Lead {
            name: non_empty(&self.name).unwrap_or(DEFAULT_LEAD_NAME).to_string(),
            phone: non_empty(&self.phone).unwrap_or(NOT_AVAILABLE).to_string(),
            email: non_empty(&self.email).map(str::to_string),
            financing_status,
            property_id: non_empty(&self.property_id)
                .unwrap_or(GENERAL_PROPERTY)
                .to_string(),
            property_address: non_empty(&self.property_address)
                .unwrap_or(NOT_AVAILABLE)
                .to_string(),
            status,
            timestamp: self.created_at.unwrap_or_else(Utc::now),
            notes: vec![self.chat_summary.unwrap_or_default()],
            id: self.id,
        }
    }
}

/// Insert payload for `leads`; the backend assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLeadRow {
    pub user_id: String,
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub property_address: String,
    pub property_id: String,
    pub chat_summary: String,
    pub status: String,
}

impl NewLeadRow {
    /// Payload for an optimistic lead, carrying its fields as captured.
    pub fn from_lead(owner: &str, lead: &Lead) -> Self {
        Self {
            user_id: owner.to_string(),
            name: lead.name.clone(),
            phone: lead.phone.clone(),
            email: lead.email.clone(),
            property_address: lead.property_address.clone(),
            property_id: lead.property_id.clone(),
            chat_summary: lead
                .notes
                .first()
                .cloned()
                .unwrap_or_else(|| DEFAULT_CAPTURE_SUMMARY.to_string()),
            status: lead.status.as_str().to_string(),
        }
    }
}

/// Column-level update for `leads`. Only set columns are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financing_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_summary: Option<String>,
}

impl From<&LeadUpdate> for LeadPatch {
    fn from(update: &LeadUpdate) -> Self {
        Self {
            name: update.name.clone(),
            phone: update.phone.clone(),
            email: update.email.clone(),
            financing_status: update.financing_status.map(|f| f.as_str().to_string()),
            property_address: update.property_address.clone(),
            status: update.status.map(|s| s.as_str().to_string()),
            // The summary column holds the first note.
            chat_summary: update
                .notes
                .as_ref()
                .map(|notes| notes.first().cloned().unwrap_or_default()),
        }
    }
}

impl LeadPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ── properties ─────────────────────────────────────────────

/// A `properties` row: queryable columns plus the full record as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRow {
    pub property_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub transaction_type: String,
    pub data: serde_json::Value,
}

impl PropertyRow {
    pub fn from_record(owner: &str, record: &PropertyRecord) -> Result<Self, StoreError> {
        Ok(Self {
            property_id: record.property_id.clone(),
            user_id: Some(owner.to_string()),
            address: record.listing_details.address.clone(),
            price: record.listing_details.price,
            status: record.status.as_str().to_string(),
            category: record.category.as_str().to_string(),
            transaction_type: record.transaction_type.as_str().to_string(),
            data: serde_json::to_value(record)?,
        })
    }

    /// The stored JSON blob is authoritative.
    pub fn into_record(self) -> Result<PropertyRecord, StoreError> {
        Ok(serde_json::from_value(self.data)?)
    }
}

// ── agent_settings ─────────────────────────────────────────

/// An `agent_settings` row (snake_case columns, one row per owner).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsRow {
    pub user_id: String,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub concierge_intro: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub high_security_mode: Option<bool>,
    #[serde(default)]
    pub terms_and_conditions: Option<String>,
    #[serde(default)]
    pub privacy_policy: Option<String>,
    #[serde(default)]
    pub nda: Option<String>,
    #[serde(default)]
    pub location_hours: Option<String>,
    #[serde(default)]
    pub service_areas: Option<String>,
    #[serde(default)]
    pub commission_rates: Option<String>,
    #[serde(default)]
    pub marketing_strategy: Option<String>,
    #[serde(default)]
    pub team_members: Option<String>,
    #[serde(default)]
    pub awards: Option<String>,
    #[serde(default)]
    pub legal_disclaimer: Option<String>,
}

impl SettingsRow {
    pub fn from_settings(owner: &str, s: &AgentSettings) -> Self {
        Self {
            user_id: owner.to_string(),
            business_name: Some(s.business_name.clone()),
            primary_color: Some(s.primary_color.clone()),
            concierge_intro: Some(s.concierge_intro.clone()),
            api_key: Some(s.api_key.clone()),
            high_security_mode: Some(s.high_security_mode),
            terms_and_conditions: Some(s.terms_and_conditions.clone()),
            privacy_policy: Some(s.privacy_policy.clone()),
            nda: Some(s.nda.clone()),
            location_hours: Some(s.location_hours.clone()),
            service_areas: Some(s.service_areas.clone()),
            commission_rates: Some(s.commission_rates.clone()),
            marketing_strategy: Some(s.marketing_strategy.clone()),
            team_members: Some(s.team_members.clone()),
            awards: Some(s.awards.clone()),
            legal_disclaimer: Some(s.legal_disclaimer.clone()),
        }
    }

    /// Overlay the stored row on `current`.
    ///
    /// Identity fields (name, color, intro, key) keep their current value when
    /// the column is empty; knowledge-base text is taken as stored, empty
    /// included. Fields without a column are untouched.
    pub fn merge_into(self, current: &AgentSettings) -> AgentSettings {
        let keep = |column: Option<String>, prior: &str| {
            column
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| prior.to_string())
        };
        let text = |column: Option<String>| column.unwrap_or_default();

        AgentSettings {
            business_name: keep(self.business_name, &current.business_name),
            primary_color: keep(self.primary_color, &current.primary_color),
            concierge_intro: keep(self.concierge_intro, &current.concierge_intro),
            api_key: keep(self.api_key, &current.api_key),
            high_security_mode: self.high_security_mode.unwrap_or(current.high_security_mode),
            terms_and_conditions: text(self.terms_and_conditions),
            privacy_policy: text(self.privacy_policy),
            nda: text(self.nda),
            location_hours: text(self.location_hours),
            service_areas: text(self.service_areas),
            commission_rates: text(self.commission_rates),
            marketing_strategy: text(self.marketing_strategy),
            team_members: text(self.team_members),
            awards: text(self.awards),
            legal_disclaimer: text(self.legal_disclaimer),
            ..current.clone()
        }
    }
}
