//! Filter Engine
//!
//! Derives distinct values per filterable field and narrows the record set by
//! a single active field/value pair.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::fields::Field;
use crate::models::TokenRecord;

/// Fields offered as dashboard filters, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterField {
    LeTargetLaunchQuarter,
    AffStatus,
    TextAdComponents,
    TokenType,
    Surface,
    Theme,
}

impl FilterField {
    pub const ALL: [FilterField; 6] = [
        FilterField::LeTargetLaunchQuarter,
        FilterField::AffStatus,
        FilterField::TextAdComponents,
        FilterField::TokenType,
        FilterField::Surface,
        FilterField::Theme,
    ];

    pub fn field(&self) -> Field {
        match self {
            FilterField::LeTargetLaunchQuarter => Field::LeTargetLaunchQuarter,
            FilterField::AffStatus => Field::AffStatus,
            FilterField::TextAdComponents => Field::TextAdComponents,
            FilterField::TokenType => Field::TokenType,
            FilterField::Surface => Field::Surface,
            FilterField::Theme => Field::Theme,
        }
    }

    pub fn key(&self) -> &'static str {
        self.field().key()
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilterField::LeTargetLaunchQuarter => "LE Target Launch Quarter",
            FilterField::AffStatus => "LE Status",
            FilterField::TextAdComponents => "Text Ad Component",
            FilterField::TokenType => "Token Type",
            FilterField::Surface => "Surface",
            FilterField::Theme => "Theme",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        FilterField::ALL.iter().copied().find(|f| f.key() == key)
    }
}

/// The single active filter. An empty value means "cleared".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveFilter {
    pub field: FilterField,
    pub value: String,
}

impl ActiveFilter {
    pub fn new(field: FilterField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.value.is_empty()
    }

    pub fn apply(&self, records: &[TokenRecord]) -> Vec<TokenRecord> {
        apply_filter(records, self.field, &self.value)
    }
}

/// Sorted, de-duplicated, non-blank values of `field` across `records`.
pub fn distinct_values(records: &[TokenRecord], field: FilterField) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.get(field.field()))
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Records whose resolved `field` contains `value` (case-sensitive).
/// An empty `value` returns every record.
pub fn apply_filter(records: &[TokenRecord], field: FilterField, value: &str) -> Vec<TokenRecord> {
    if value.is_empty() {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|r| r.get(field.field()).is_some_and(|v| v.contains(value)))
        .cloned()
        .collect()
}

/// One filter dropdown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterMenu {
    pub key: &'static str,
    pub label: &'static str,
    pub all_label: String,
    pub values: Vec<String>,
}

/// Menus for every filterable field, built from the full record set.
pub fn filter_menus(records: &[TokenRecord]) -> Vec<FilterMenu> {
    FilterField::ALL
        .iter()
        .map(|field| FilterMenu {
            key: field.key(),
            label: field.label(),
            all_label: format!("All {}", field.label()),
            values: distinct_values(records, *field),
        })
        .collect()
}
