//! Dashboard View Models
//!
//! Structured payloads for the overview cards, the details table and the
//! group modal. Clients render these; no markup is produced here.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::fields::Field;
use crate::grouping::{group, visible_groups, LaunchEntityGroup};
use crate::models::{ImpactLevel, SourceOrigin, StatusSegments, TokenRecord, STATUS_LABELS};

const MISSING: &str = "-";
const DEFAULT_AD_FORMAT: &str = "Text Ad";
const UNKNOWN_TYPE: &str = "Unknown";

/// Overview card for one launch entity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCard {
    pub name: String,
    pub impact_level: ImpactLevel,
    pub impact_label: String,
    pub tokens_count: usize,
    pub components_count: usize,
    pub ad_formats_affected: usize,
    pub status_segments: StatusSegments,
    pub status_labels: [&'static str; 4],
    pub priority: u8,
}

impl From<&LaunchEntityGroup> for GroupCard {
    fn from(group: &LaunchEntityGroup) -> Self {
        let impact_level = group.impact_level();
        Self {
            name: group.name.clone(),
            impact_level,
            impact_label: format!("{} Impact", impact_level.as_str()),
            tokens_count: group.tokens_count(),
            components_count: group.unique_components_count(),
            ad_formats_affected: 1,
            status_segments: group.status_segments(),
            status_labels: STATUS_LABELS,
            priority: group.priority(),
        }
    }
}

/// A color or free-text value. Hex colors carry a swatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueDisplay {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swatch: Option<String>,
}

pub fn format_value(value: Option<&str>) -> ValueDisplay {
    match value {
        None => ValueDisplay {
            text: MISSING.to_string(),
            swatch: None,
        },
        Some(v) => ValueDisplay {
            text: v.to_string(),
            swatch: v.starts_with('#').then(|| v.to_string()),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeBadge {
    Color,
    Font,
}

/// CSS-style class for a status badge.
pub fn status_class(status: Option<&str>) -> &'static str {
    let Some(status) = status else {
        return "";
    };
    let lower = status.to_lowercase();
    if lower.contains("recently launched") {
        "recently-launched"
    } else if lower.contains("lcs being validated") {
        "validating-lc"
    } else if lower.contains("unlaunched") {
        "unlaunched"
    } else {
        ""
    }
}

/// One row of the details table (also used by the group modal).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub token_type: String,
    pub type_badge: TypeBadge,
    pub ad_format: String,
    pub components: Vec<String>,
    pub category: String,
    pub token: String,
    pub surface: String,
    pub theme: String,
    pub old_value: ValueDisplay,
    pub new_value: ValueDisplay,
    pub launch_target: String,
    pub status: String,
    pub status_class: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

fn or_missing(value: Option<&str>) -> String {
    value.unwrap_or(MISSING).to_string()
}

impl From<&TokenRecord> for TableRow {
    fn from(record: &TokenRecord) -> Self {
        let token_type = record.get(Field::TokenType).unwrap_or(UNKNOWN_TYPE);
        let type_badge = if token_type.to_lowercase().contains("color") {
            TypeBadge::Color
        } else {
            TypeBadge::Font
        };
        let components = record.components().map(str::to_string).collect();
        let status = record.get(Field::AffStatus);

        Self {
            token_type: token_type.to_string(),
            type_badge,
            ad_format: record
                .get(Field::SrpAdUseCase)
                .unwrap_or(DEFAULT_AD_FORMAT)
                .to_string(),
            components,
            category: or_missing(record.get(Field::TokenCategory)),
            token: or_missing(record.get(Field::SdsToken)),
            surface: or_missing(record.get(Field::Surface)),
            theme: or_missing(record.get(Field::Theme)),
            old_value: format_value(record.get(Field::CurrentSdsValue)),
            new_value: format_value(record.get(Field::UpcomingSdsValue)),
            launch_target: or_missing(record.get(Field::LeTargetLaunchQuarter)),
            status: or_missing(status),
            status_class: status_class(status),
            doc: record.get(Field::SdsLaunchDoc).map(str::to_string),
        }
    }
}

pub fn table_rows(records: &[TokenRecord]) -> Vec<TableRow> {
    records.iter().map(TableRow::from).collect()
}

/// Modal payload for one group.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetails {
    #[serde(flatten)]
    pub card: GroupCard,
    pub components: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl From<&LaunchEntityGroup> for GroupDetails {
    fn from(group: &LaunchEntityGroup) -> Self {
        Self {
            card: GroupCard::from(group),
            components: group.unique_components(),
            rows: table_rows(&group.records),
        }
    }
}

/// Details for the named group, searched across all groups (old ones too).
pub fn group_details(records: &[TokenRecord], name: &str) -> Option<GroupDetails> {
    group(records)
        .iter()
        .find(|g| g.name == name)
        .map(GroupDetails::from)
}

/// Where the current record set came from and how fresh it is.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Freshness {
    pub last_updated: Option<DateTime<Utc>>,
    pub origin: Option<SourceOrigin>,
    pub record_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewView {
    pub groups: Vec<GroupCard>,
    pub hidden_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_notice: Option<String>,
    pub freshness: Freshness,
}

pub fn overview_view(
    records: &[TokenRecord],
    now: DateTime<Utc>,
    freshness: Freshness,
) -> OverviewView {
    let overview = visible_groups(records, now);
    let hidden_notice = match overview.hidden_count {
        0 => None,
        1 => Some("1 older LE hidden (more than 1 quarter old)".to_string()),
        n => Some(format!("{n} older LEs hidden (more than 1 quarter old)")),
    };

    OverviewView {
        groups: overview.groups.iter().map(GroupCard::from).collect(),
        hidden_count: overview.hidden_count,
        hidden_notice,
        freshness,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SegmentState;
    use crate::normalize::normalize_all;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_format_value_swatch() {
        assert_eq!(
            format_value(Some("#1a73e8")),
            ValueDisplay {
                text: "#1a73e8".to_string(),
                swatch: Some("#1a73e8".to_string())
            }
        );
        assert_eq!(format_value(Some("Google Sans")).swatch, None);
        assert_eq!(format_value(None).text, "-");
    }

    #[test]
    fn test_status_class() {
        assert_eq!(status_class(Some("Recently launched")), "recently-launched");
        assert_eq!(status_class(Some("LCs being validated")), "validating-lc");
        assert_eq!(status_class(Some("Unlaunched")), "unlaunched");
        assert_eq!(status_class(Some("LE Planning")), "");
        assert_eq!(status_class(None), "");
    }

    #[test]
    fn test_table_row_defaults() {
        let records = normalize_all(&[json!({
            "tokenChange": "Font weight",
            "component": "Headline\nDescription",
            "sdsLaunchTarget": "2025 Q2",
        })]);
        let row = TableRow::from(&records[0]);
        assert_eq!(row.token_type, "Font weight");
        assert_eq!(row.type_badge, TypeBadge::Font);
        assert_eq!(row.ad_format, "Text Ad");
        assert_eq!(row.components, vec!["Headline", "Description"]);
        assert_eq!(row.launch_target, "2025 Q2");
        assert_eq!(row.status, "-");
        assert!(row.doc.is_none());

        let row = TableRow::from(&TokenRecord::default());
        assert_eq!(row.token_type, "Unknown");
    }

    #[test]
    fn test_overview_view_single_local_record() {
        let records = normalize_all(&[json!({
            "sdsToken": "a.b.c",
            "surface": "Search",
            "tokenType": "Color",
            "affStatus": "LE Planning",
        })]);
        let view = overview_view(&records, now(), Freshness::default());
        assert_eq!(view.groups.len(), 1);
        let card = &view.groups[0];
        assert_eq!(card.name, "Color Changes - c (Search)");
        assert_eq!(card.impact_level, ImpactLevel::Low);
        assert_eq!(card.impact_label, "Low Impact");
        assert_eq!(
            card.status_segments,
            [
                SegmentState::Planning,
                SegmentState::Inactive,
                SegmentState::Inactive,
                SegmentState::Inactive
            ]
        );
        assert!(view.hidden_notice.is_none());
    }

    #[test]
    fn test_hidden_notice_pluralizes() {
        let records = normalize_all(&[
            json!({"leName": "A", "leTargetLaunchQuarter": "2023 Q1"}),
            json!({"leName": "B", "leTargetLaunchQuarter": "2023 Q2"}),
        ]);
        let view = overview_view(&records, now(), Freshness::default());
        assert!(view.groups.is_empty());
        assert_eq!(
            view.hidden_notice.as_deref(),
            Some("2 older LEs hidden (more than 1 quarter old)")
        );
    }

    #[test]
    fn test_group_details_includes_old_groups() {
        let records = normalize_all(&[json!({
            "leName": "Old",
            "leTargetLaunchQuarter": "2023 Q1",
            "textAdComponents": "Headline, Sitelink",
        })]);
        let details = group_details(&records, "Old").unwrap();
        assert_eq!(details.components, vec!["Headline", "Sitelink"]);
        assert_eq!(details.rows.len(), 1);
        assert!(group_details(&records, "Missing").is_none());
    }
}
