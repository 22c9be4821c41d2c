use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{FinancingStatus, LeadStatus};

/// Prefix of identifiers assigned locally before the backend confirms a lead.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Property reference used when a lead is not tied to a listing.
pub const GENERAL_PROPERTY: &str = "General";

/// A prospect in the pipeline. Identity is `id`; a `temp-` id marks an
/// optimistic entry not yet confirmed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub financing_status: FinancingStatus,
    pub property_id: String,
    pub property_address: String,
    pub status: LeadStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Lead {
    pub fn is_optimistic(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }

    /// Apply a partial update in place. Unset fields are left untouched.
    pub fn apply(&mut self, update: &LeadUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(phone) = &update.phone {
            self.phone = phone.clone();
        }
        if let Some(email) = &update.email {
            self.email = Some(email.clone());
        }
        if let Some(financing) = update.financing_status {
            self.financing_status = financing;
        }
        if let Some(address) = &update.property_address {
            self.property_address = address.clone();
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(notes) = &update.notes {
            self.notes = notes.clone();
        }
    }
}

/// What the concierge (or the manual form) knows when a lead is captured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadCapture {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub property_id: Option<String>,
    pub property_address: Option<String>,
    pub summary: Option<String>,
}

/// Partial change to a lead; `None` means "keep".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financing_status: Option<FinancingStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<String>>,
}

impl LeadUpdate {
    pub fn status(status: LeadStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
