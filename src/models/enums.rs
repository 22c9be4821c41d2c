use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string form is also the serde form, so rows and JSON blobs agree.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            /// Case-insensitive match used on loosely-typed model output.
            pub fn parse_loose(s: &str) -> Option<Self> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(PropertyCategory {
    Residential => "Residential",
    Commercial => "Commercial",
    Land => "Land",
});

str_enum!(TransactionType {
    Sale => "Sale",
    Rent => "Rent",
    Lease => "Lease",
});

str_enum!(PropertyStatus {
    Active => "Active",
    Pending => "Pending",
    Draft => "Draft",
});

str_enum!(PropertyTier {
    Standard => "Standard",
    EliteGated => "Estate Guard",
});

str_enum!(LeadStatus {
    New => "New",
    Discovery => "Discovery",
    Qualified => "Qualified",
    Showing => "Showing",
    Negotiation => "Negotiation",
    Closed => "Closed",
    Archived => "Archived",
});

str_enum!(FinancingStatus {
    Unverified => "Unverified",
    Cash => "Cash",
    PreApproved => "Pre-Approved",
    Mortgage => "Mortgage",
});

/// Kanban columns in pipeline order. `Archived` is terminal and off-board.
pub const PIPELINE_COLUMNS: [LeadStatus; 6] = [
    LeadStatus::New,
    LeadStatus::Discovery,
    LeadStatus::Qualified,
    LeadStatus::Showing,
    LeadStatus::Negotiation,
    LeadStatus::Closed,
];

impl LeadStatus {
    /// The column a lead advances to, if any.
    pub fn next(&self) -> Option<LeadStatus> {
        let idx = PIPELINE_COLUMNS.iter().position(|c| c == self)?;
        PIPELINE_COLUMNS.get(idx + 1).copied()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LeadStatus::Closed | LeadStatus::Archived)
    }
}

impl Default for LeadStatus {
    fn default() -> Self {
        LeadStatus::New
    }
}

impl Default for PropertyStatus {
    fn default() -> Self {
        PropertyStatus::Active
    }
}

impl Default for PropertyTier {
    fn default() -> Self {
        PropertyTier::Standard
    }
}

impl Default for PropertyCategory {
    fn default() -> Self {
        PropertyCategory::Residential
    }
}

impl Default for TransactionType {
    fn default() -> Self {
        TransactionType::Sale
    }
}

impl Default for FinancingStatus {
    fn default() -> Self {
        FinancingStatus::Unverified
    }
}
