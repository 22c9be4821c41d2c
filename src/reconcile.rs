//! Converging optimistic leads with backend-confirmed ones.
//!
//! A captured lead can come back twice: as the write response and as a
//! realtime insert. Both paths go through these functions, which are keyed by
//! id only, so the final list is the same whichever arrives first.

use crate::models::Lead;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The temporary entry now carries the confirmed lead.
    Replaced,
    /// The confirmed id was already present; the temporary entry was removed.
    DroppedTemporary,
    /// Neither id was present; the confirmed lead was added.
    Inserted,
}

/// Add `incoming` at the front unless a lead with its id already exists.
pub fn merge_lead(leads: &mut Vec<Lead>, incoming: Lead) -> MergeOutcome {
    if leads.iter().any(|l| l.id == incoming.id) {
        return MergeOutcome::Duplicate;
    }
    leads.insert(0, incoming);
    MergeOutcome::Inserted
}

/// Swap the optimistic lead `temp_id` for its confirmed version.
pub fn confirm_lead(leads: &mut Vec<Lead>, temp_id: &str, confirmed: Lead) -> ConfirmOutcome {
    if leads.iter().any(|l| l.id == confirmed.id) {
        leads.retain(|l| l.id != temp_id);
        return ConfirmOutcome::DroppedTemporary;
    }

    match leads.iter_mut().find(|l| l.id == temp_id) {
        Some(slot) => {
            *slot = confirmed;
            ConfirmOutcome::Replaced
        }
        None => {
            leads.insert(0, confirmed);
            ConfirmOutcome::Inserted
        }
    }
}
