use std::sync::LazyLock;

use regex::Regex;

use crate::models::PropertyRecord;

static BEDROOMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*-?\s*(?:bed(?:room)?s?|bd|br)\b").unwrap()
});
static BATHROOMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*-?\s*(?:bath(?:room)?s?|ba)\b").unwrap()
});
/// Only a dollar amount introduced by a price keyword counts; fees, deposits
/// and "homes under $X" links do not.
static PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:asking(?:\s+price)?|list(?:ing)?\s+price|listed\s+at|offered\s+at|priced\s+at|price)\s*(?:is|of|at)?\s*[:=-]?\s*\$\s?(\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{1,2})?",
    )
    .unwrap()
});
static SQ_FT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,3}(?:,\d{3})+|\d+)\s*(?:sq\.?\s*ft\.?|sqft|square\s+feet)").unwrap()
});

/// Specs stated literally in the source text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evidence {
    pub bedrooms: Option<f64>,
    pub bathrooms: Option<f64>,
    pub price: Option<f64>,
    pub sq_ft: Option<f64>,
}

fn first_number(re: &Regex, text: &str) -> Option<f64> {
    let caps = re.captures(text)?;
    caps.get(1)?.as_str().replace(',', "").parse().ok()
}

impl Evidence {
    pub fn scan(text: &str) -> Self {
        Self {
            bedrooms: first_number(&BEDROOMS, text),
            bathrooms: first_number(&BATHROOMS, text),
            price: first_number(&PRICE, text),
            sq_ft: first_number(&SQ_FT, text),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fill fields the model left at zero/null. Never overrides a value the
    /// model supplied. Returns the names of filled fields.
    pub fn backfill(&self, record: &mut PropertyRecord) -> Vec<&'static str> {
        let mut filled = Vec::new();
        let details = &mut record.listing_details;

        if details.price <= 0.0 {
            if let Some(price) = self.price {
                details.price = price;
                filled.push("price");
            }
        }

        let stats = &mut details.key_stats;
        for (name, slot, found) in [
            ("bedrooms", &mut stats.bedrooms, self.bedrooms),
            ("bathrooms", &mut stats.bathrooms, self.bathrooms),
            ("sq_ft", &mut stats.sq_ft, self.sq_ft),
        ] {
            let missing = slot.map_or(true, |v| v <= 0.0);
            if let (true, Some(v)) = (missing, found) {
                *slot = Some(v);
                filled.push(name);
            }
        }

        filled
    }
}
