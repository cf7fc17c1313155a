use serde::{Deserialize, Deserializer, Serialize};

use crate::fields::Field;

/// A canonical token-change record.
///
/// Deserializes from any JSON object through the field resolution table, so
/// legacy names (`tokenChange`, `component`, `status`, ...) land in their
/// canonical slots. Values are trimmed; blank values are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sage_team: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srp_ad_use_case: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_ad_components: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sds_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_sds_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upcoming_sds_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sds_launch_target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub le_target_launch_quarter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aff_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sds_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sds_poc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sds_launch_doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub le_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_key: Option<String>,
}

impl TokenRecord {
    /// Resolved value of a canonical field.
    pub fn get(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::TokenType => &self.token_type,
            Field::SageTeam => &self.sage_team,
            Field::SrpAdUseCase => &self.srp_ad_use_case,
            Field::TextAdComponents => &self.text_ad_components,
            Field::TokenCategory => &self.token_category,
            Field::SdsToken => &self.sds_token,
            Field::Surface => &self.surface,
            Field::Theme => &self.theme,
            Field::CurrentSdsValue => &self.current_sds_value,
            Field::UpcomingSdsValue => &self.upcoming_sds_value,
            Field::SdsLaunchTarget => &self.sds_launch_target,
            Field::LeTargetLaunchQuarter => &self.le_target_launch_quarter,
            Field::AffStatus => &self.aff_status,
            Field::SdsStatus => &self.sds_status,
            Field::SdsPoc => &self.sds_poc,
            Field::SdsLaunchDoc => &self.sds_launch_doc,
            Field::LeName => &self.le_name,
            Field::LastUpdated => &self.last_updated,
            Field::UniqueKey => &self.unique_key,
        };
        value.as_deref()
    }

    pub(crate) fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::TokenType => &mut self.token_type,
            Field::SageTeam => &mut self.sage_team,
            Field::SrpAdUseCase => &mut self.srp_ad_use_case,
            Field::TextAdComponents => &mut self.text_ad_components,
            Field::TokenCategory => &mut self.token_category,
            Field::SdsToken => &mut self.sds_token,
            Field::Surface => &mut self.surface,
            Field::Theme => &mut self.theme,
            Field::CurrentSdsValue => &mut self.current_sds_value,
            Field::UpcomingSdsValue => &mut self.upcoming_sds_value,
            Field::SdsLaunchTarget => &mut self.sds_launch_target,
            Field::LeTargetLaunchQuarter => &mut self.le_target_launch_quarter,
            Field::AffStatus => &mut self.aff_status,
            Field::SdsStatus => &mut self.sds_status,
            Field::SdsPoc => &mut self.sds_poc,
            Field::SdsLaunchDoc => &mut self.sds_launch_doc,
            Field::LeName => &mut self.le_name,
            Field::LastUpdated => &mut self.last_updated,
            Field::UniqueKey => &mut self.unique_key,
        }
    }

    /// Builder used by tests and fixtures.
    pub fn with(mut self, field: Field, value: &str) -> Self {
        let trimmed = value.trim();
        *self.slot_mut(field) = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn status(&self) -> LeStatus {
        self.aff_status
            .as_deref()
            .map(LeStatus::parse)
            .unwrap_or(LeStatus::Unknown)
    }

    /// Component names, split on newlines and commas.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.text_ad_components
            .as_deref()
            .unwrap_or_default()
            .split(['\n', ','])
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

impl<'de> Deserialize<'de> for TokenRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let object = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        Ok(crate::normalize::normalize_object(&object))
    }
}

/// Lifecycle status of a launch entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeStatus {
    #[serde(rename = "LE Planning")]
    Planning,
    #[serde(rename = "LE in Progress")]
    InProgress,
    #[serde(rename = "LCs being validated")]
    Validating,
    #[serde(rename = "Recently launched")]
    RecentlyLaunched,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl LeStatus {
    /// Exact, case-sensitive match against the sheet's status labels.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "LE Planning" => LeStatus::Planning,
            "LE in Progress" => LeStatus::InProgress,
            "LCs being validated" => LeStatus::Validating,
            "Recently launched" => LeStatus::RecentlyLaunched,
            _ => LeStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeStatus::Planning => "LE Planning",
            LeStatus::InProgress => "LE in Progress",
            LeStatus::Validating => "LCs being validated",
            LeStatus::RecentlyLaunched => "Recently launched",
            LeStatus::Unknown => "Unknown",
        }
    }

    /// Card ordering priority (lower sorts first).
    pub fn priority(&self) -> u8 {
        match self {
            LeStatus::Validating => 1,
            LeStatus::RecentlyLaunched => 2,
            LeStatus::InProgress => 3,
            LeStatus::Planning => 4,
            LeStatus::Unknown => 5,
        }
    }
}

/// Coarse impact classification from component breadth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

impl ImpactLevel {
    pub fn from_component_count(count: usize) -> Self {
        if count >= 5 {
            ImpactLevel::High
        } else if count >= 3 {
            ImpactLevel::Medium
        } else {
            ImpactLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactLevel::Low => "Low",
            ImpactLevel::Medium => "Medium",
            ImpactLevel::High => "High",
        }
    }
}

/// One marker on the four-stage status timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentState {
    Inactive,
    Planning,
    Progress,
    Validating,
    Launched,
}

pub type StatusSegments = [SegmentState; 4];

/// Timeline labels, one per segment slot.
pub const STATUS_LABELS: [&str; 4] = [
    "LE Planning",
    "LE in Progress",
    "Validating LC",
    "Recently Launched",
];

/// Which stage of the chain produced the current record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOrigin {
    BigqueryJson,
    BigqueryStructured,
    Local,
}

impl SourceOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceOrigin::BigqueryJson => "bigquery_json",
            SourceOrigin::BigqueryStructured => "bigquery_structured",
            SourceOrigin::Local => "local",
        }
    }
}
