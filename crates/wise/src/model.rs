//! Wise API data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ProfileId = i64;
pub type BalanceId = i64;

// ============================================================================
// Profiles
// ============================================================================

/// Profile type.
///
/// The API has used both lowercase and uppercase spellings over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    #[serde(alias = "PERSONAL")]
    Personal,
    #[serde(alias = "BUSINESS")]
    Business,
    /// Any profile type this client does not know about.
    #[serde(other)]
    Unknown,
}

impl ProfileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileType::Personal => "personal",
            ProfileType::Business => "business",
            ProfileType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ProfileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A profile (personal or business account identity) belonging to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    #[serde(rename = "type")]
    pub profile_type: ProfileType,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<ProfileAddress>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub obfuscated: bool,
    #[serde(default)]
    pub current_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileAddress {
    pub address_first_line: Option<String>,
    pub city: Option<String>,
    #[serde(rename = "countryIso2Code")]
    pub country_iso2_code: Option<String>,
    #[serde(rename = "countryIso3Code")]
    pub country_iso3_code: Option<String>,
    pub post_code: Option<String>,
    pub state_code: Option<String>,
}

// ============================================================================
// Balances
// ============================================================================

/// A currency balance within a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub id: BalanceId,
    pub currency: String,
    #[serde(rename = "type", default)]
    pub balance_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub amount: Option<BalanceAmount>,
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modification_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceAmount {
    pub value: f64,
    pub currency: String,
}

// ============================================================================
// Statements
// ============================================================================

/// Account statement layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementType {
    /// A single statement line per transaction.
    #[default]
    Compact,
    /// Accounting layout, fees on a separate line.
    Flat,
}

impl StatementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementType::Compact => "COMPACT",
            StatementType::Flat => "FLAT",
        }
    }
}

/// Request for a PDF statement of one balance.
///
/// The API rejects intervals longer than 455 days.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementRequest {
    pub profile_id: ProfileId,
    pub balance_id: BalanceId,
    pub interval_start: DateTime<Utc>,
    pub interval_end: DateTime<Utc>,
    pub statement_type: StatementType,
}
