//! Report export collaborator
//!
//! Serializes the current audit snapshot verbatim as indented JSON for user
//! download. No durable storage exists anywhere else in the core.

use crate::models::AuditSnapshot;
use crate::Result;
use chrono::{SecondsFormat, Utc};

/// A downloadable report: the filename embeds an ISO-8601 UTC timestamp
#[derive(Debug, Clone)]
pub struct ExportedReport {
    pub filename: String,
    pub contents: String,
}

pub fn export_report(snapshot: &AuditSnapshot) -> Result<ExportedReport> {
    let contents = serde_json::to_string_pretty(snapshot)?;
    let filename = format!(
        "financial-report-{}.json",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    );

    Ok(ExportedReport { filename, contents })
}
