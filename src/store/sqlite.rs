use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::rows::{LeadPatch, LeadRow, NewLeadRow, PropertyRow, SettingsRow};
use super::{BackendStore, StoreError};

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(
        1,
        include_str!("../../resources/migrations/001_initial.sql"),
    )];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| StoreError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn lead_from_row(row: &Row<'_>) -> rusqlite::Result<LeadRow> {
    Ok(LeadRow {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        phone: row.get("phone")?,
        email: row.get("email")?,
        financing_status: row.get("financing_status")?,
        property_address: row.get("property_address")?,
        property_id: row.get("property_id")?,
        chat_summary: row.get("chat_summary")?,
        status: row.get("status")?,
        created_at: parse_timestamp(row.get("created_at")?),
    })
}

const LEAD_COLUMNS: &str = "id, user_id, name, phone, email, financing_status, property_address, \
     property_id, chat_summary, status, created_at";

/// Local `BackendStore` on SQLite. Ids are UUID v4; timestamps RFC 3339.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::from_connection(open_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::from_connection(open_memory_database()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves SQLite itself consistent.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn get_lead(conn: &Connection, id: &str) -> Result<LeadRow, StoreError> {
        conn.query_row(
            &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
            params![id],
            lead_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound {
            entity_type: "Lead".into(),
            id: id.to_string(),
        })
    }
}

impl BackendStore for SqliteStore {
    fn list_leads(&self, owner: &str) -> Result<Vec<LeadRow>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![owner], lead_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_lead(&self, lead: &NewLeadRow) -> Result<LeadRow, StoreError> {
        let conn = self.conn();
        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO leads (id, user_id, name, phone, email, property_address, property_id,
                                chat_summary, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                lead.user_id,
                lead.name,
                lead.phone,
                lead.email,
                lead.property_address,
                lead.property_id,
                lead.chat_summary,
                lead.status,
                now_timestamp(),
            ],
        )?;
        Self::get_lead(&conn, &id)
    }

    fn update_lead(&self, owner: &str, id: &str, patch: &LeadPatch) -> Result<(), StoreError> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE leads SET
                name = COALESCE(?3, name),
                phone = COALESCE(?4, phone),
                email = COALESCE(?5, email),
                financing_status = COALESCE(?6, financing_status),
                property_address = COALESCE(?7, property_address),
                status = COALESCE(?8, status),
                chat_summary = COALESCE(?9, chat_summary)
             WHERE id = ?1 AND user_id = ?2",
            params![
                id,
                owner,
                patch.name,
                patch.phone,
                patch.email,
                patch.financing_status,
                patch.property_address,
                patch.status,
                patch.chat_summary,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity_type: "Lead".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn delete_lead(&self, owner: &str, id: &str) -> Result<(), StoreError> {
        self.conn().execute(
            "DELETE FROM leads WHERE id = ?1 AND user_id = ?2",
            params![id, owner],
        )?;
        Ok(())
    }

    fn list_properties(&self, owner: &str) -> Result<Vec<PropertyRow>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT property_id, user_id, address, price, status, category, transaction_type, data
             FROM properties WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![owner], |row| {
            Ok((
                PropertyRow {
                    property_id: row.get(0)?,
                    user_id: row.get(1)?,
                    address: row.get(2)?,
                    price: row.get(3)?,
                    status: row.get(4)?,
                    category: row.get(5)?,
                    transaction_type: row.get(6)?,
                    data: serde_json::Value::Null,
                },
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut properties = Vec::new();
        for row in rows {
            let (mut property, data) = row?;
            property.data = serde_json::from_str(&data)?;
            properties.push(property);
        }
        Ok(properties)
    }

    fn insert_property(&self, property: &PropertyRow) -> Result<(), StoreError> {
        let owner = property.user_id.as_deref().ok_or(StoreError::NotAuthenticated)?;
        self.conn().execute(
            "INSERT INTO properties (property_id, user_id, address, price, status, category,
                                     transaction_type, data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                property.property_id,
                owner,
                property.address,
                property.price,
                property.status,
                property.category,
                property.transaction_type,
                serde_json::to_string(&property.data)?,
                now_timestamp(),
            ],
        )?;
        Ok(())
    }

    fn upsert_property(&self, property: &PropertyRow) -> Result<(), StoreError> {
        let owner = property.user_id.as_deref().ok_or(StoreError::NotAuthenticated)?;
        self.conn().execute(
            "INSERT INTO properties (property_id, user_id, address, price, status, category,
                                     transaction_type, data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT (user_id, property_id) DO UPDATE SET
                address = excluded.address,
                price = excluded.price,
                status = excluded.status,
                category = excluded.category,
                transaction_type = excluded.transaction_type,
                data = excluded.data",
            params![
                property.property_id,
                owner,
                property.address,
                property.price,
                property.status,
                property.category,
                property.transaction_type,
                serde_json::to_string(&property.data)?,
                now_timestamp(),
            ],
        )?;
        Ok(())
    }

    fn delete_property(&self, owner: &str, property_id: &str) -> Result<(), StoreError> {
        self.conn().execute(
            "DELETE FROM properties WHERE property_id = ?1 AND user_id = ?2",
            params![property_id, owner],
        )?;
        Ok(())
    }

    fn load_settings(&self, owner: &str) -> Result<Option<SettingsRow>, StoreError> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT user_id, business_name, primary_color, concierge_intro, api_key,
                        high_security_mode, terms_and_conditions, privacy_policy, nda,
                        location_hours, service_areas, commission_rates, marketing_strategy,
                        team_members, awards, legal_disclaimer
                 FROM agent_settings WHERE user_id = ?1",
                params![owner],
                |row| {
                    Ok(SettingsRow {
                        user_id: row.get(0)?,
                        business_name: row.get(1)?,
                        primary_color: row.get(2)?,
                        concierge_intro: row.get(3)?,
                        api_key: row.get(4)?,
                        high_security_mode: row.get(5)?,
                        terms_and_conditions: row.get(6)?,
                        privacy_policy: row.get(7)?,
                        nda: row.get(8)?,
                        location_hours: row.get(9)?,
                        service_areas: row.get(10)?,
                        commission_rates: row.get(11)?,
                        marketing_strategy: row.get(12)?,
                        team_members: row.get(13)?,
                        awards: row.get(14)?,
                        legal_disclaimer: row.get(15)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn upsert_settings(&self, s: &SettingsRow) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT INTO agent_settings (user_id, business_name, primary_color, concierge_intro,
                    api_key, high_security_mode, terms_and_conditions, privacy_policy, nda,
                    location_hours, service_areas, commission_rates, marketing_strategy,
                    team_members, awards, legal_disclaimer)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
             ON CONFLICT(user_id) DO UPDATE SET
                business_name = excluded.business_name,
                primary_color = excluded.primary_color,
                concierge_intro = excluded.concierge_intro,
                api_key = excluded.api_key,
                high_security_mode = excluded.high_security_mode,
                terms_and_conditions = excluded.terms_and_conditions,
                privacy_policy = excluded.privacy_policy,
                nda = excluded.nda,
                location_hours = excluded.location_hours,
                service_areas = excluded.service_areas,
                commission_rates = excluded.commission_rates,
                marketing_strategy = excluded.marketing_strategy,
                team_members = excluded.team_members,
                awards = excluded.awards,
                legal_disclaimer = excluded.legal_disclaimer,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
            params![
                s.user_id,
                s.business_name,
                s.primary_color,
                s.concierge_intro,
                s.api_key,
                s.high_security_mode,
                s.terms_and_conditions,
                s.privacy_policy,
                s.nda,
                s.location_hours,
                s.service_areas,
                s.commission_rates,
                s.marketing_strategy,
                s.team_members,
                s.awards,
                s.legal_disclaimer,
            ],
        )?;
        Ok(())
    }
}
