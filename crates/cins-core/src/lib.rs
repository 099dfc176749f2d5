//! Core domain model for CINS canonical campaign documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "cins-core";

/// Canonical timestamp rendering: millisecond precision, asserted UTC.
pub const ISO_MILLIS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format(ISO_MILLIS_FORMAT).to_string()
}

/// Substitution values for job fields absent from both the nested `job`
/// object and the record's top level.
pub mod defaults {
    pub const TITLE: &str = "Untitled Position";
    pub const COMPANY: &str = "Unknown Company";
    pub const LOCATION: &str = "Remote";
    pub const CONTRACT_TYPE: &str = "Full-time";
    pub const WORK_MODE: &str = "Hybrid";
    pub const DESCRIPTION: &str = "No description available";
    pub const COMPANY_DESCRIPTION: &str = "No company description available";
    pub const SALARY_CURRENCY: &str = "USD";
}

/// A single required skill; `mastery` is meaningful when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub mastery: Option<String>,
}

/// Flattened job sub-record merging top-level and nested `job.*` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetails {
    pub title: String,
    pub company: String,
    pub location: String,
    pub contract_type: String,
    pub work_mode: String,
    pub seniority: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: String,
    pub description: String,
    pub company_description: String,
    pub application_link: Option<String>,
    pub department: Option<String>,
    pub skills: Vec<Skill>,
    pub languages: Vec<String>,
    pub benefits: Vec<String>,
    pub requirements: Vec<String>,
    pub responsibilities: Vec<String>,
}

impl JobDetails {
    /// Sentinel sub-record for batches where a single record failed to
    /// transform; the batch itself continues.
    pub fn error_placeholder() -> Self {
        Self {
            title: "Error".to_string(),
            company: "Unknown".to_string(),
            location: "Unknown".to_string(),
            contract_type: "Unknown".to_string(),
            work_mode: "Unknown".to_string(),
            seniority: None,
            salary_min: None,
            salary_max: None,
            salary_currency: "Unknown".to_string(),
            description: "Error".to_string(),
            company_description: "Unknown".to_string(),
            application_link: None,
            department: None,
            skills: Vec::new(),
            languages: Vec::new(),
            benefits: Vec::new(),
            requirements: Vec::new(),
            responsibilities: Vec::new(),
        }
    }
}

/// Normalized output entity, independent of whichever upstream shape
/// originated it. `campaign_raw` preserves the serialized source record
/// for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalCampaign {
    pub campaign_id: String,
    pub campaign_raw: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub job: JobDetails,
}
