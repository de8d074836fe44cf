//! The structured job record produced by extraction.
//!
//! Field names and nesting are part of the public JSON contract: the same
//! shape is sent to the model as a strict schema and returned to callers.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{JoblensError, Result};

/// A job posting reduced to a fixed-shape record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    /// Company name.
    pub company: String,
    /// Job title.
    pub title: String,
    /// Where the job is located.
    pub location: Location,
    /// Employment type and dates.
    pub employment: Employment,
    /// Every technical skill, tool, language and platform mentioned.
    pub technical_keywords: Vec<String>,
    /// Sponsorship, compensation and key dates.
    pub important_info: ImportantInfo,
    /// Seniority, department and key requirement tags.
    pub role_tags: Vec<String>,
    /// The full description restructured as Markdown.
    pub markdown_description: String,
    /// Provenance of the record.
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Location {
    /// City where the job is located.
    pub city: Option<String>,
    /// State or province.
    pub state: Option<String>,
    /// Country.
    pub country: Option<String>,
    /// Remote work arrangement, if stated.
    pub remote_status: Option<RemoteStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum RemoteStatus {
    Remote,
    Hybrid,
    #[serde(rename = "On-site")]
    OnSite,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Employment {
    /// Type of employment.
    #[serde(rename = "type")]
    pub kind: Option<EmploymentType>,
    /// Term for internships and co-ops, e.g. `Fall_2025`.
    pub term: Option<String>,
    /// Expected start date, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Expected end date, `YYYY-MM-DD`.
    pub end_date: Option<String>,
    /// Duration of the engagement if stated.
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Internship,
    #[serde(rename = "coop")]
    Coop,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImportantInfo {
    /// Whether visa sponsorship is offered.
    pub visa_sponsorship: Option<bool>,
    /// Yearly salary range.
    pub salary_range: SalaryRange,
    /// Posting date, `YYYY-MM-DD`.
    pub posted_date: Option<String>,
    /// Application deadline, `YYYY-MM-DD`.
    pub application_deadline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SalaryRange {
    /// Minimum yearly amount.
    pub min: Option<f64>,
    /// Maximum yearly amount.
    pub max: Option<f64>,
    /// ISO currency code.
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for SalaryRange {
    fn default() -> Self {
        Self { min: None, max: None, currency: default_currency() }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Metadata {
    /// When the page was processed, RFC 3339. Set by the pipeline.
    #[serde(default)]
    pub scraping_timestamp: String,
    /// Confidence in the extracted values, between 0 and 1.
    pub confidence_score: f64,
    /// URL the record was extracted from. Set by the pipeline.
    #[serde(default)]
    pub source_url: String,
}

impl JobRecord {
    /// Checks the invariants serde cannot express.
    ///
    /// Identity fields and the description must be non-blank and the
    /// confidence score must lie in `[0, 1]`. Out-of-range scores are rejected
    /// rather than clamped.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("company", &self.company),
            ("title", &self.title),
            ("markdown_description", &self.markdown_description),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(JoblensError::invalid_response(format!("`{field}` is blank"), None));
            }
        }

        let score = self.metadata.confidence_score;
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(JoblensError::invalid_response(
                format!("confidence_score {score} is outside [0, 1]"),
                None,
            ));
        }

        Ok(())
    }

    /// Drops repeated technical keywords, keeping the first spelling of each.
    /// Comparison ignores case and surrounding whitespace.
    pub fn dedup_keywords(&mut self) {
        let mut seen = HashSet::new();
        self.technical_keywords.retain(|keyword| seen.insert(keyword.trim().to_lowercase()));
    }
}
