//! Tolerant line-oriented parser for classifier output.
//!
//! The classifier returns free text that usually follows a `Key: Value`
//! convention, but nothing is guaranteed. The parser never fails: missing
//! keys leave fields empty (defaulting to "Unknown" happens at persistence
//! time, not here), unrecognized lines are ignored, and fully malformed
//! input yields an all-empty field map.

use crate::status::Status;

/// Field values extracted from one classifier response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedFields {
    pub company: String,
    pub job_title: String,
    pub location: String,
    pub status: Option<Status>,
}

impl ClassifiedFields {
    /// True when nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.company.is_empty()
            && self.job_title.is_empty()
            && self.location.is_empty()
            && self.status.is_none()
    }
}

/// Sentinel responses the classifier uses to reject non-job mail.
const NOT_JOB_MARKERS: &[&str] = &["not job application", "not_job_email"];

/// Parses `Key: Value` lines with case-insensitive keys among `Company`,
/// `Job Title`, `Location`, and `Status`. Status values pass through
/// [`Status::normalize`].
pub fn parse_classification(output: &str) -> ClassifiedFields {
    let mut fields = ClassifiedFields::default();

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_lowercase().as_str() {
            "company" => fields.company = value.to_string(),
            "job title" => fields.job_title = value.to_string(),
            "location" => fields.location = value.to_string(),
            "status" => {
                if !value.is_empty() {
                    fields.status = Some(Status::normalize(value));
                }
            }
            _ => {}
        }
    }

    fields
}

/// Guards the pipeline against classifier refusals and irrelevant text:
/// output that does not begin with a recognizable `Company:` header, or that
/// matches a "not a job application" sentinel, is negative.
pub fn looks_like_job_application(output: &str) -> bool {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return false;
    }

    let lowered = trimmed.to_lowercase();
    if NOT_JOB_MARKERS.iter().any(|marker| lowered == *marker) {
        return false;
    }

    trimmed
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_lowercase().starts_with("company:"))
        .unwrap_or(false)
}
