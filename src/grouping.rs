//! Grouping & Classification Engine
//!
//! Turns a flat record set into launch-entity groups: recency filtering,
//! status-priority ordering, impact classification and timeline segments.
//! Everything here is a pure function of the records and `now`.

use chrono::{DateTime, Months, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::fields::Field;
use crate::models::{ImpactLevel, LeStatus, SegmentState, StatusSegments, TokenRecord};
use crate::normalize::group_key_of;

lazy_static! {
    static ref YEAR_RE: Regex = Regex::new(r"(\d{4})").unwrap();
    static ref QUARTER_RE: Regex = Regex::new(r"(?i)Q(\d)").unwrap();
}

/// Year strings accepted without an explicit quarter marker.
const YEAR_ONLY_HINTS: [&str; 2] = ["2024", "2025"];

/// How far back a launch target may sit and still count as recent.
const RECENCY_WINDOW_MONTHS: u32 = 3;

/// Records sharing one launch-entity name, in source order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchEntityGroup {
    pub name: String,
    pub records: Vec<TokenRecord>,
}

impl LaunchEntityGroup {
    pub fn tokens_count(&self) -> usize {
        self.records.len()
    }

    /// Distinct component names across members, first-seen order.
    pub fn unique_components(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .flat_map(TokenRecord::components)
            .filter(|c| seen.insert(*c))
            .map(str::to_string)
            .collect()
    }

    pub fn unique_components_count(&self) -> usize {
        self.unique_components().len()
    }

    pub fn impact_level(&self) -> ImpactLevel {
        ImpactLevel::from_component_count(self.unique_components_count())
    }

    fn has_status(&self, status: LeStatus) -> bool {
        self.records.iter().any(|r| r.status() == status)
    }

    /// Best (lowest) status priority among members.
    pub fn priority(&self) -> u8 {
        self.records
            .iter()
            .map(|r| r.status().priority())
            .min()
            .unwrap_or(LeStatus::Unknown.priority())
    }

    /// Four-slot timeline; every stage seen among members is lit.
    pub fn status_segments(&self) -> StatusSegments {
        let mut segments = [SegmentState::Inactive; 4];
        if self.has_status(LeStatus::Planning) {
            segments[0] = SegmentState::Planning;
        }
        if self.has_status(LeStatus::InProgress) {
            segments[1] = SegmentState::Progress;
        }
        if self.has_status(LeStatus::Validating) {
            segments[2] = SegmentState::Validating;
        }
        if self.has_status(LeStatus::RecentlyLaunched) {
            segments[3] = SegmentState::Launched;
        }
        segments
    }

    /// True if any member lacks a launch target or targets a quarter that
    /// starts no earlier than `RECENCY_WINDOW_MONTHS` before `now`.
    pub fn is_recent(&self, now: DateTime<Utc>) -> bool {
        let cutoff = now
            .checked_sub_months(Months::new(RECENCY_WINDOW_MONTHS))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        self.records
            .iter()
            .any(|record| match record.get(Field::LeTargetLaunchQuarter) {
                None => true,
                Some(raw) => parse_quarter(raw, now) >= cutoff,
            })
    }
}

/// Group records by launch-entity name, keeping first-seen key order and
/// input order within each group.
pub fn group(records: &[TokenRecord]) -> Vec<LaunchEntityGroup> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<LaunchEntityGroup> = Vec::new();

    for record in records {
        let name = group_key_of(record);
        match index.get(&name) {
            Some(&slot) => groups[slot].records.push(record.clone()),
            None => {
                index.insert(name.clone(), groups.len());
                groups.push(LaunchEntityGroup {
                    name,
                    records: vec![record.clone()],
                });
            }
        }
    }

    groups
}

/// Parse a human-entered quarter ("2025 Q1", "Q3 2024", "q2-2025").
///
/// Unparseable input maps to `now` so it is never treated as old.
pub fn parse_quarter(raw: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let text = raw.trim();
    let year = YEAR_RE
        .captures(text)
        .and_then(|c| c[1].parse::<i64>().ok());
    let quarter = QUARTER_RE
        .captures(text)
        .and_then(|c| c[1].parse::<i64>().ok());

    match (year, quarter) {
        (Some(year), Some(quarter)) => month_start(year * 12 + (quarter - 1) * 3).unwrap_or(now),
        (Some(year), None) if YEAR_ONLY_HINTS.iter().any(|hint| text.contains(hint)) => {
            month_start(year * 12).unwrap_or(now)
        }
        _ => now,
    }
}

/// First instant of the month `months` after year 0, rolling quarter
/// overflow into neighbouring years.
fn month_start(months: i64) -> Option<DateTime<Utc>> {
    let year = i32::try_from(months.div_euclid(12)).ok()?;
    let month = u32::try_from(months.rem_euclid(12)).ok()? + 1;
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}

/// Groups visible on the overview plus how many were hidden as old.
#[derive(Debug, Clone)]
pub struct Overview {
    pub groups: Vec<LaunchEntityGroup>,
    pub hidden_count: usize,
}

/// Recent groups, stably sorted by ascending status priority.
pub fn visible_groups(records: &[TokenRecord], now: DateTime<Utc>) -> Overview {
    let all = group(records);
    let total = all.len();

    let mut groups: Vec<LaunchEntityGroup> =
        all.into_iter().filter(|g| g.is_recent(now)).collect();
    groups.sort_by_key(LaunchEntityGroup::priority);

    Overview {
        hidden_count: total - groups.len(),
        groups,
    }
}
