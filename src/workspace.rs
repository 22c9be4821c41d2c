//! Session state for one signed-in agent.
//!
//! Every mutation is applied locally first and then written to the backend.
//! A failed write is not rolled back: the caller gets a `WriteAlert` to show
//! the user, and the local state keeps the change.

use std::collections::BTreeSet;
use std::fmt;

use chrono::Utc;

use crate::models::{
    generate_property_id, seed_portfolio, AgentSettings, FinancingStatus, Lead, LeadCapture, LeadStatus, LeadUpdate,
    PropertyRecord, GENERAL_PROPERTY, TEMP_ID_PREFIX,
};
use crate::realtime::{ChangeEvent, ChangeFeed};
use crate::reconcile::{confirm_lead, merge_lead, MergeOutcome};
use crate::store::rows::{DEFAULT_CAPTURE_SUMMARY, DEFAULT_LEAD_NAME, NOT_AVAILABLE};
use crate::store::{
    BackendStore, LeadPatch, NewLeadRow, PropertyRow, SettingsRow, StoreError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    CaptureLead,
    UpdateLead,
    DeleteLead,
    AddProperty,
    UpdateProperty,
    DeleteProperty,
    SaveSettings,
}

impl WriteOp {
    fn hint(&self) -> &'static str {
        match self {
            WriteOp::CaptureLead => {
                "Check that the 'leads' table has the 'property_id' column. You likely need to run the SQL migration script."
            }
            WriteOp::UpdateLead | WriteOp::DeleteLead => {
                "The change is kept for this session only. Reload once the connection is back."
            }
            WriteOp::AddProperty | WriteOp::UpdateProperty | WriteOp::DeleteProperty => {
                "The listing is kept locally for this session. Check the 'properties' table and your connection."
            }
            WriteOp::SaveSettings => {
                "Settings apply to this session only. Check the 'agent_settings' table and your connection."
            }
        }
    }
}

/// A backend write failed after the local state already changed.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteAlert {
    pub op: WriteOp,
    pub error: String,
    pub hint: &'static str,
}

impl WriteAlert {
    fn new(op: WriteOp, error: &StoreError) -> Self {
        tracing::error!(?op, error = %error, "Backend write failed, keeping local change");
        Self {
            op,
            error: error.to_string(),
            hint: op.hint(),
        }
    }
}

impl fmt::Display for WriteAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CRITICAL DATABASE ERROR: change not saved to cloud.\n\nError: {}\n\nHint: {}",
            self.error, self.hint
        )
    }
}

impl std::error::Error for WriteAlert {}

/// Leads, portfolio and settings of one owner, backed by a `BackendStore`.
pub struct Workspace<S: BackendStore> {
    store: S,
    owner: String,
    leads: Vec<Lead>,
    properties: Vec<PropertyRecord>,
    settings: AgentSettings,
    notifications: u32,
}

impl<S: BackendStore> Workspace<S> {
    /// Empty session showing the seed portfolio and default settings.
    pub fn new(store: S, owner: &str) -> Self {
        Self {
            store,
            owner: owner.to_string(),
            leads: Vec::new(),
            properties: seed_portfolio(),
            settings: AgentSettings::default(),
            notifications: 0,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn lead(&self, id: &str) -> Option<&Lead> {
        self.leads.iter().find(|l| l.id == id)
    }

    pub fn properties(&self) -> &[PropertyRecord] {
        &self.properties
    }

    pub fn property(&self, property_id: &str) -> Option<&PropertyRecord> {
        self.properties.iter().find(|p| p.property_id == property_id)
    }

    /// Ids currently in the portfolio, for extraction to avoid.
    pub fn property_ids(&self) -> BTreeSet<String> {
        self.properties.iter().map(|p| p.property_id.clone()).collect()
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn notifications(&self) -> u32 {
        self.notifications
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Pull leads, properties and settings from the backend.
    pub fn load(&mut self) -> Result<(), StoreError> {
        self.leads = self
            .store
            .list_leads(&self.owner)?
            .into_iter()
            .map(|row| row.into_lead())
            .collect();

        let stored: Vec<PropertyRecord> = self
            .store
            .list_properties(&self.owner)?
            .into_iter()
            .filter_map(|row| {
                let id = row.property_id.clone();
                match row.into_record() {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::warn!(property_id = %id, error = %e, "Skipping unreadable property blob");
                        None
                    }
                }
            })
            .collect();
        self.properties = merge_with_seeds(stored);

        if let Some(row) = self.store.load_settings(&self.owner)? {
            self.settings = row.merge_into(&self.settings);
        }

        tracing::info!(
            leads = self.leads.len(),
            properties = self.properties.len(),
            "Workspace loaded"
        );
        Ok(())
    }

    // ── leads ──────────────────────────────────────────────

    /// Optimistically add a lead, persist it, then swap in the confirmed id.
    ///
    /// Returns the lead's final id. On a failed write the optimistic lead
    /// stays (with its `temp-` id) and the alert is returned.
    pub fn capture_lead(&mut self, capture: LeadCapture, silent: bool) -> Result<String, WriteAlert> {
        let temp_id = format!("{TEMP_ID_PREFIX}{}", uuid::Uuid::new_v4());
        let text = |v: Option<String>, fallback: &str| {
            v.filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };

        let optimistic = Lead {
            id: temp_id.clone(),
            name: text(capture.name, DEFAULT_LEAD_NAME),
            phone: text(capture.phone, NOT_AVAILABLE),
            email: capture.email.filter(|s| !s.trim().is_empty()),
            financing_status: FinancingStatus::Unverified,
            property_id: text(capture.property_id, GENERAL_PROPERTY),
            property_address: text(capture.property_address, NOT_AVAILABLE),
            status: LeadStatus::New,
            timestamp: Utc::now(),
            notes: vec![text(capture.summary, DEFAULT_CAPTURE_SUMMARY)],
        };
        let row = NewLeadRow::from_lead(&self.owner, &optimistic);

        self.leads.insert(0, optimistic);
        if !silent {
            self.notifications += 1;
        }

        match self.store.insert_lead(&row) {
            Ok(confirmed) => {
                let confirmed = confirmed.into_lead();
                let id = confirmed.id.clone();
                let outcome = confirm_lead(&mut self.leads, &temp_id, confirmed);
                tracing::info!(lead_id = %id, ?outcome, "Lead captured");
                Ok(id)
            }
            Err(e) => Err(WriteAlert::new(WriteOp::CaptureLead, &e)),
        }
    }

    /// Apply one realtime event. Returns true when it added a lead.
    pub fn apply_change(&mut self, event: &ChangeEvent) -> bool {
        let Some(row) = event.lead_insert_for(&self.owner) else {
            return false;
        };
        match merge_lead(&mut self.leads, row.into_lead()) {
            MergeOutcome::Inserted => {
                self.notifications += 1;
                true
            }
            MergeOutcome::Duplicate => false,
        }
    }

    /// Apply everything queued on `feed`. Returns the number of leads added.
    pub fn drain_feed(&mut self, feed: &mut ChangeFeed) -> usize {
        let mut added = 0;
        for event in feed.drain() {
            if self.apply_change(&event) {
                added += 1;
            }
        }
        added
    }

    pub fn update_lead(&mut self, id: &str, update: LeadUpdate) -> Result<(), WriteAlert> {
        if let Some(lead) = self.leads.iter_mut().find(|l| l.id == id) {
            lead.apply(&update);
        }
        let patch = LeadPatch::from(&update);
        self.store
            .update_lead(&self.owner, id, &patch)
            .map_err(|e| WriteAlert::new(WriteOp::UpdateLead, &e))
    }

    pub fn change_lead_status(&mut self, id: &str, status: LeadStatus) -> Result<(), WriteAlert> {
        self.update_lead(id, LeadUpdate::status(status))
    }

    /// Move a lead to the next kanban column. `Ok(None)` when it is already
    /// in the last column (or unknown).
    pub fn advance_lead(&mut self, id: &str) -> Result<Option<LeadStatus>, WriteAlert> {
        let Some(next) = self.lead(id).and_then(|l| l.status.next()) else {
            return Ok(None);
        };
        self.change_lead_status(id, next)?;
        Ok(Some(next))
    }

    pub fn delete_lead(&mut self, id: &str) -> Result<(), WriteAlert> {
        self.leads.retain(|l| l.id != id);
        self.store
            .delete_lead(&self.owner, id)
            .map_err(|e| WriteAlert::new(WriteOp::DeleteLead, &e))
    }

    // ── properties ─────────────────────────────────────────

    /// Add a new listing at the front of the portfolio and return its id.
    ///
    /// A missing id, or one already used by another listing, is replaced with
    /// a fresh one; existing listings are never overwritten here.
    pub fn add_property(&mut self, mut record: PropertyRecord) -> Result<String, WriteAlert> {
        let taken = self.property_ids();
        if record.property_id.trim().is_empty() || taken.contains(&record.property_id) {
            let fresh = generate_property_id(&taken);
            tracing::warn!(
                requested = %record.property_id,
                assigned = %fresh,
                "Property id already in use, re-keyed"
            );
            record.property_id = fresh;
        }

        let id = record.property_id.clone();
        let row = PropertyRow::from_record(&self.owner, &record);
        self.properties.insert(0, record);
        row.and_then(|row| self.store.insert_property(&row))
            .map_err(|e| WriteAlert::new(WriteOp::AddProperty, &e))?;
        Ok(id)
    }

    /// Save edits to a listing. Listings never stored before (the seeds, or
    /// one whose insert failed) are created in the backend.
    pub fn update_property(&mut self, record: PropertyRecord) -> Result<(), WriteAlert> {
        let row = PropertyRow::from_record(&self.owner, &record);
        match self
            .properties
            .iter_mut()
            .find(|p| p.property_id == record.property_id)
        {
            Some(slot) => *slot = record,
            None => self.properties.insert(0, record),
        }
        row.and_then(|row| self.store.upsert_property(&row))
            .map_err(|e| WriteAlert::new(WriteOp::UpdateProperty, &e))
    }

    pub fn delete_property(&mut self, property_id: &str) -> Result<(), WriteAlert> {
        self.properties.retain(|p| p.property_id != property_id);
        self.store
            .delete_property(&self.owner, property_id)
            .map_err(|e| WriteAlert::new(WriteOp::DeleteProperty, &e))
    }

    // ── settings ───────────────────────────────────────────

    pub fn save_settings(&mut self, settings: AgentSettings) -> Result<(), WriteAlert> {
        let row = SettingsRow::from_settings(&self.owner, &settings);
        self.settings = settings;
        self.store
            .upsert_settings(&row)
            .map_err(|e| WriteAlert::new(WriteOp::SaveSettings, &e))
    }

    pub fn clear_notifications(&mut self) {
        self.notifications = 0;
    }
}

/// Stored records first, then seeds whose id is not already taken.
pub fn merge_with_seeds(stored: Vec<PropertyRecord>) -> Vec<PropertyRecord> {
    let mut combined: Vec<PropertyRecord> = Vec::with_capacity(stored.len() + 2);
    for record in stored.into_iter().chain(seed_portfolio()) {
        if !combined.iter().any(|p| p.property_id == record.property_id) {
            combined.push(record);
        }
    }
    combined
}
