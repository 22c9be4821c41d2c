use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use crate::models::{Lead, LeadStatus, PropertyRecord, PropertyStatus, PropertyTier, PIPELINE_COLUMNS};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCount {
    /// Short weekday label ("Mon").
    pub name: String,
    pub date: NaiveDate,
    pub leads: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub portfolio_size: usize,
    pub active_listings: usize,
    pub elite_listings: usize,
    pub total_leads: usize,
    pub leads_this_month: usize,
    /// Closed leads over all leads, rounded to a whole percent.
    pub conversion_rate: u32,
    /// Oldest day first, ending with `today`.
    pub last_7_days: Vec<DayCount>,
}

/// Aggregate portfolio and pipeline metrics as of `today` (UTC dates).
pub fn summarize(properties: &[PropertyRecord], leads: &[Lead], today: NaiveDate) -> DashboardSummary {
    let last_7_days = (0..7u64)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|date| DayCount {
            name: date.format("%a").to_string(),
            date,
            leads: leads
                .iter()
                .filter(|l| l.timestamp.date_naive() == date)
                .count(),
        })
        .collect();

    let closed = leads
        .iter()
        .filter(|l| l.status == LeadStatus::Closed)
        .count();
    let conversion_rate = if leads.is_empty() {
        0
    } else {
        (closed as f64 / leads.len() as f64 * 100.0).round() as u32
    };

    DashboardSummary {
        portfolio_size: properties.len(),
        active_listings: properties
            .iter()
            .filter(|p| p.status == PropertyStatus::Active)
            .count(),
        elite_listings: properties
            .iter()
            .filter(|p| p.tier == PropertyTier::EliteGated)
            .count(),
        total_leads: leads.len(),
        leads_this_month: leads
            .iter()
            .filter(|l| {
                let d = l.timestamp.date_naive();
                d.year() == today.year() && d.month() == today.month()
            })
            .count(),
        conversion_rate,
        last_7_days,
    }
}

/// Properties whose address or status contains `term` (case-insensitive),
/// or whose price digits contain it. An empty term matches everything.
pub fn search_portfolio<'a>(properties: &'a [PropertyRecord], term: &str) -> Vec<&'a PropertyRecord> {
    let needle = term.trim().to_lowercase();
    properties
        .iter()
        .filter(|p| {
            needle.is_empty()
                || p.listing_details.address.to_lowercase().contains(&needle)
                || p.status.as_str().to_lowercase().contains(&needle)
                || p.listing_details.price.to_string().contains(term.trim())
        })
        .collect()
}

/// Leads grouped by kanban column, in pipeline order. Archived leads are
/// off the board.
pub fn pipeline_board(leads: &[Lead]) -> Vec<(LeadStatus, Vec<&Lead>)> {
    PIPELINE_COLUMNS
        .iter()
        .map(|column| {
            (
                *column,
                leads.iter().filter(|l| l.status == *column).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{seed_portfolio, FinancingStatus, GENERAL_PROPERTY};
    use chrono::{TimeZone, Utc};

    fn lead_on(id: &str, y: i32, m: u32, d: u32, status: LeadStatus) -> Lead {
        Lead {
            id: id.into(),
            name: "Prospect".into(),
            phone: "N/A".into(),
            email: None,
            financing_status: FinancingStatus::Unverified,
            property_id: GENERAL_PROPERTY.into(),
            property_address: "N/A".into(),
            status,
            timestamp: Utc.with_ymd_and_hms(y, m, d, 15, 30, 0).unwrap(),
            notes: vec![],
        }
    }

    #[test]
    fn weekly_counts_end_today() {
        // 2026-10-18 is a Sunday
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let leads = vec![
            lead_on("a", 2026, 10, 18, LeadStatus::New),
            lead_on("b", 2026, 10, 18, LeadStatus::Closed),
            lead_on("c", 2026, 10, 12, LeadStatus::New),
            lead_on("d", 2026, 10, 11, LeadStatus::New),
        ];

        let summary = summarize(&seed_portfolio(), &leads, today);
        let days = &summary.last_7_days;

        assert_eq!(days.len(), 7);
        assert_eq!(days[0].name, "Mon");
        assert_eq!(days[0].leads, 1);
        assert_eq!(days[6].name, "Sun");
        assert_eq!(days[6].date, today);
        assert_eq!(days[6].leads, 2);
        assert_eq!(days.iter().map(|d| d.leads).sum::<usize>(), 3);
    }

    #[test]
    fn metrics_over_portfolio_and_pipeline() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let leads = vec![
            lead_on("a", 2026, 10, 1, LeadStatus::Closed),
            lead_on("b", 2026, 9, 30, LeadStatus::New),
            lead_on("c", 2025, 10, 5, LeadStatus::Showing),
        ];

        let summary = summarize(&seed_portfolio(), &leads, today);
        assert_eq!(summary.portfolio_size, 2);
        assert_eq!(summary.active_listings, 2);
        assert_eq!(summary.elite_listings, 1);
        assert_eq!(summary.total_leads, 3);
        assert_eq!(summary.leads_this_month, 1);
        assert_eq!(summary.conversion_rate, 33);
    }

    #[test]
    fn no_leads_means_zero_conversion() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let summary = summarize(&[], &[], today);
        assert_eq!(summary.conversion_rate, 0);
        assert!(summary.last_7_days.iter().all(|d| d.leads == 0));
    }

    #[test]
    fn search_matches_address_status_and_price() {
        let portfolio = seed_portfolio();
        let ids = |term: &str| -> Vec<String> {
            search_portfolio(&portfolio, term)
                .into_iter()
                .map(|p| p.property_id.clone())
                .collect()
        };

        assert_eq!(ids("aspen"), vec!["EG-770"]);
        assert_eq!(ids("AUSTIN"), vec!["EG-212"]);
        assert_eq!(ids("4200"), vec!["EG-212"]);
        assert_eq!(ids("active").len(), 2);
        assert_eq!(ids("").len(), 2);
        assert!(ids("Tokyo").is_empty());
    }

    #[test]
    fn board_has_every_column_in_order() {
        let leads = vec![
            lead_on("a", 2026, 1, 1, LeadStatus::Showing),
            lead_on("b", 2026, 1, 1, LeadStatus::Archived),
            lead_on("c", 2026, 1, 1, LeadStatus::Showing),
        ];
        let board = pipeline_board(&leads);
        assert_eq!(board.len(), 6);
        assert_eq!(board[0].0, LeadStatus::New);
        assert_eq!(board[3].0, LeadStatus::Showing);
        assert_eq!(board[3].1.len(), 2);
        assert_eq!(board.iter().map(|(_, l)| l.len()).sum::<usize>(), 2);
    }
}
