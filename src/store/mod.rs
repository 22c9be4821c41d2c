//! Durable storage for leads, properties and agent settings.
//!
//! `BackendStore` is the seam between session state and the backend. The
//! remote implementation speaks PostgREST; the SQLite one serves offline use
//! and tests. Every operation is scoped by the owning user id.

pub mod rest;
pub mod rows;
pub mod sqlite;

pub use rest::RestStore;
pub use rows::{LeadPatch, LeadRow, NewLeadRow, PropertyRow, SettingsRow};
pub use sqlite::SqliteStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Backend request failed: {0}")]
    Http(String),

    #[error("Backend returned error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not authenticated: an owner id and access token are required")]
    NotAuthenticated,

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },
}

/// Row CRUD over the `leads`, `properties` and `agent_settings` tables.
pub trait BackendStore {
    /// Leads owned by `owner`, newest first.
    fn list_leads(&self, owner: &str) -> Result<Vec<LeadRow>, StoreError>;

    /// Insert and return the confirmed row (backend-assigned id and timestamp).
    fn insert_lead(&self, lead: &NewLeadRow) -> Result<LeadRow, StoreError>;

    fn update_lead(&self, owner: &str, id: &str, patch: &LeadPatch) -> Result<(), StoreError>;

    fn delete_lead(&self, owner: &str, id: &str) -> Result<(), StoreError>;

    /// Properties owned by `owner`, newest first.
    fn list_properties(&self, owner: &str) -> Result<Vec<PropertyRow>, StoreError>;

    fn insert_property(&self, property: &PropertyRow) -> Result<(), StoreError>;

    /// Insert the row, or replace the stored one with the same
    /// (owner, property_id). Editing a never-stored listing creates it.
    fn upsert_property(&self, property: &PropertyRow) -> Result<(), StoreError>;

    fn delete_property(&self, owner: &str, property_id: &str) -> Result<(), StoreError>;

    fn load_settings(&self, owner: &str) -> Result<Option<SettingsRow>, StoreError>;

    /// Insert or replace the owner's settings row.
    fn upsert_settings(&self, settings: &SettingsRow) -> Result<(), StoreError>;
}
