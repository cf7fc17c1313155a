//! Field Resolution Table
//!
//! Upstream exports (sheet exports, BigQuery tables, hand-edited JSON) disagree
//! on field names. Every canonical field is resolved from an ordered list of
//! source aliases; the first alias holding a non-blank value wins. Nothing
//! else in the crate reads raw field names.

use serde::{Deserialize, Serialize};

/// Canonical fields of a token record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    TokenType,
    SageTeam,
    SrpAdUseCase,
    TextAdComponents,
    TokenCategory,
    SdsToken,
    Surface,
    Theme,
    CurrentSdsValue,
    UpcomingSdsValue,
    SdsLaunchTarget,
    LeTargetLaunchQuarter,
    AffStatus,
    SdsStatus,
    SdsPoc,
    SdsLaunchDoc,
    LeName,
    LastUpdated,
    UniqueKey,
}

/// `canonical field -> ordered source aliases`.
pub const FIELD_TABLE: &[(Field, &[&str])] = &[
    (Field::TokenType, &["tokenType", "tokenChange"]),
    (Field::SageTeam, &["sageTeam"]),
    (Field::SrpAdUseCase, &["srpAdUseCase"]),
    (
        Field::TextAdComponents,
        &["textAdComponents", "component", "components"],
    ),
    (Field::TokenCategory, &["tokenCategory"]),
    (Field::SdsToken, &["sdsToken"]),
    (Field::Surface, &["surface"]),
    (Field::Theme, &["theme"]),
    (Field::CurrentSdsValue, &["currentSdsValue"]),
    (Field::UpcomingSdsValue, &["upcomingSdsValue"]),
    (Field::SdsLaunchTarget, &["sdsLaunchTarget"]),
    (
        Field::LeTargetLaunchQuarter,
        &["leTargetLaunchQuarter", "sdsLaunchTarget"],
    ),
    (Field::AffStatus, &["affStatus", "status"]),
    (Field::SdsStatus, &["sdsStatus"]),
    (Field::SdsPoc, &["sdsPoc"]),
    (Field::SdsLaunchDoc, &["sdsLaunchDoc"]),
    (Field::LeName, &["leName"]),
    (Field::LastUpdated, &["lastUpdated"]),
    (Field::UniqueKey, &["uniqueKey"]),
];

impl Field {
    pub const ALL: [Field; 19] = [
        Field::TokenType,
        Field::SageTeam,
        Field::SrpAdUseCase,
        Field::TextAdComponents,
        Field::TokenCategory,
        Field::SdsToken,
        Field::Surface,
        Field::Theme,
        Field::CurrentSdsValue,
        Field::UpcomingSdsValue,
        Field::SdsLaunchTarget,
        Field::LeTargetLaunchQuarter,
        Field::AffStatus,
        Field::SdsStatus,
        Field::SdsPoc,
        Field::SdsLaunchDoc,
        Field::LeName,
        Field::LastUpdated,
        Field::UniqueKey,
    ];

    /// Canonical (camelCase) key; also the first alias.
    pub fn key(&self) -> &'static str {
        self.aliases()[0]
    }

    /// Ordered source aliases for this field.
    pub fn aliases(&self) -> &'static [&'static str] {
        FIELD_TABLE
            .iter()
            .find(|(field, _)| field == self)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[])
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Field::ALL.iter().copied().find(|f| f.key() == key)
    }
}
