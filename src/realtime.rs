//! Backend change notifications.
//!
//! The websocket transport lives outside this crate; whatever receives the
//! provider's JSON payloads hands them to a `ChangeSender`, and session state
//! drains the matching `ChangeFeed`.

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::store::LeadRow;

pub const LEADS_TABLE: &str = "leads";

#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("Undecodable change payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Change feed closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row change as pushed by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "eventType")]
    pub kind: ChangeKind,
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub new: serde_json::Value,
    #[serde(default)]
    pub old: serde_json::Value,
}

impl ChangeEvent {
    pub fn decode(payload: &str) -> Result<Self, RealtimeError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// The inserted lead row, if this is a `leads` insert owned by `owner`.
    pub fn lead_insert_for(&self, owner: &str) -> Option<LeadRow> {
        if self.kind != ChangeKind::Insert || self.table != LEADS_TABLE {
            return None;
        }
        let row: LeadRow = match serde_json::from_value(self.new.clone()) {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed lead insert event");
                return None;
            }
        };
        (row.user_id.as_deref() == Some(owner)).then_some(row)
    }
}

/// Producer half, owned by the transport.
#[derive(Clone)]
pub struct ChangeSender {
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

impl ChangeSender {
    pub fn send(&self, event: ChangeEvent) -> Result<(), RealtimeError> {
        self.tx.send(event).map_err(|_| RealtimeError::Closed)
    }

    /// Decode a raw provider payload and forward it.
    pub fn send_raw(&self, payload: &str) -> Result<(), RealtimeError> {
        self.send(ChangeEvent::decode(payload)?)
    }
}

/// Consumer half, drained by the workspace.
pub struct ChangeFeed {
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl ChangeFeed {
    pub fn channel() -> (ChangeSender, ChangeFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChangeSender { tx }, ChangeFeed { rx })
    }

    /// Everything queued right now, without waiting.
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Wait for the next event; `None` once every sender is gone.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSERT: &str = r#"{
        "schema": "public",
        "table": "leads",
        "eventType": "INSERT",
        "new": {"id": "real-7", "user_id": "owner-1", "name": "Ava", "status": "New"},
        "old": {}
    }"#;

    #[test]
    fn decodes_provider_payload() {
        let event = ChangeEvent::decode(INSERT).unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.table, "leads");
        assert_eq!(event.schema.as_deref(), Some("public"));
    }

    #[test]
    fn only_own_lead_inserts_apply() {
        let event = ChangeEvent::decode(INSERT).unwrap();
        assert_eq!(event.lead_insert_for("owner-1").unwrap().id, "real-7");
        assert!(event.lead_insert_for("owner-2").is_none());

        let mut update = event.clone();
        update.kind = ChangeKind::Update;
        assert!(update.lead_insert_for("owner-1").is_none());

        let mut other_table = event;
        other_table.table = "properties".into();
        assert!(other_table.lead_insert_for("owner-1").is_none());
    }

    #[test]
    fn garbage_payload_is_an_error() {
        assert!(matches!(
            ChangeEvent::decode("{\"eventType\": \"UPSERT\"}"),
            Err(RealtimeError::Decode(_))
        ));
    }

    #[test]
    fn feed_drains_in_order() {
        let (tx, mut feed) = ChangeFeed::channel();
        tx.send_raw(INSERT).unwrap();
        tx.send_raw(&INSERT.replace("real-7", "real-8")).unwrap();

        let ids: Vec<_> = feed
            .drain()
            .into_iter()
            .map(|e| e.new["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["real-7", "real-8"]);
        assert!(feed.drain().is_empty());
    }

    #[tokio::test]
    async fn next_ends_when_senders_drop() {
        let (tx, mut feed) = ChangeFeed::channel();
        tx.send_raw(INSERT).unwrap();
        drop(tx);
        assert!(feed.next().await.is_some());
        assert!(feed.next().await.is_none());
    }

    #[test]
    fn send_after_feed_dropped_is_closed() {
        let (tx, feed) = ChangeFeed::channel();
        drop(feed);
        assert!(matches!(tx.send_raw(INSERT), Err(RealtimeError::Closed)));
    }
}
