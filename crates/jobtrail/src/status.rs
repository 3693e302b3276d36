//! Job application lifecycle states and free-text status normalization.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

/// Closed set of application lifecycle states.
///
/// `Applied`, `Screening`, `Interviewing`, and `Offer` reflect the usual
/// forward progression; `Accepted`, `Declined`, and `Withdrawn` are terminal.
/// Progression is not enforced — a later email may legitimately report
/// `Declined` from any prior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Applied,
    Screening,
    Interviewing,
    Offer,
    Accepted,
    Declined,
    Withdrawn,
}

/// Keyword table in tie-break order: the first status whose keyword appears
/// in the input wins. Rejection keywords are checked before interview
/// keywords so a declined-after-interview email is not read as still
/// interviewing.
const STATUS_KEYWORDS: &[(Status, &[&str])] = &[
    (
        Status::Declined,
        &[
            "declined",
            "rejected",
            "not selected",
            "not moving forward",
            "unfortunately",
            "regret",
            "will not be",
            "decided not to",
        ],
    ),
    (Status::Withdrawn, &["withdrawn", "withdrew", "withdraw"]),
    (Status::Accepted, &["accepted"]),
    (
        Status::Offer,
        &["offer", "congratulations", "pleased to offer"],
    ),
    (
        Status::Interviewing,
        &["interview", "meet with", "on-site", "onsite"],
    ),
    (
        Status::Screening,
        &[
            "screening",
            "phone screen",
            "phone call",
            "recruiter call",
            "initial review",
        ],
    ),
    (
        Status::Applied,
        &[
            "applied",
            "submitted",
            "application received",
            "thank you for applying",
            "confirming receipt",
            "received",
        ],
    ),
];

impl Status {
    /// Maps arbitrary classifier text to a status. Total over all strings:
    /// unmatched or empty input defaults to `Applied` and is logged for
    /// keyword-table tuning, never raised as an error.
    pub fn normalize(raw: &str) -> Status {
        let lowered = raw.trim().to_lowercase();

        if !lowered.is_empty() {
            for (status, keywords) in STATUS_KEYWORDS {
                if keywords.iter().any(|kw| lowered.contains(kw)) {
                    return *status;
                }
            }
            if lowered != "unknown" {
                debug!(raw = %raw, "Unrecognized status text, defaulting to Applied");
            }
        }

        Status::Applied
    }

    /// Canonical string form used for storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Applied => "Applied",
            Status::Screening => "Screening",
            Status::Interviewing => "Interviewing",
            Status::Offer => "Offer",
            Status::Accepted => "Accepted",
            Status::Declined => "Declined",
            Status::Withdrawn => "Withdrawn",
        }
    }

    /// Whether the application can progress no further.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Accepted | Status::Declined | Status::Withdrawn)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for strings that are not a canonical status name.
///
/// Only used for round-tripping stored values; free text goes through
/// [`Status::normalize`] instead.
#[derive(Debug, Error)]
#[error("unknown status '{0}'")]
pub struct ParseStatusError(pub String);

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "applied" => Ok(Status::Applied),
            "screening" => Ok(Status::Screening),
            "interviewing" => Ok(Status::Interviewing),
            "offer" => Ok(Status::Offer),
            "accepted" => Ok(Status::Accepted),
            "declined" => Ok(Status::Declined),
            "withdrawn" => Ok(Status::Withdrawn),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rejection_phrases() {
        assert_eq!(Status::normalize("declined"), Status::Declined);
        assert_eq!(
            Status::normalize("We regret to inform you"),
            Status::Declined
        );
        assert_eq!(Status::normalize("not selected"), Status::Declined);
    }

    #[test]
    fn test_declined_wins_over_interview_keywords() {
        // A rejection-after-interview email must not read as Interviewing.
        assert_eq!(
            Status::normalize("Unfortunately, we will not be moving forward with interviews"),
            Status::Declined
        );
        assert_eq!(
            Status::normalize("after your interview we have decided not to proceed"),
            Status::Declined
        );
    }

    #[test]
    fn test_normalize_forward_states() {
        assert_eq!(Status::normalize("Interview scheduled"), Status::Interviewing);
        assert_eq!(Status::normalize("phone screening"), Status::Screening);
        assert_eq!(
            Status::normalize("Pleased to offer you the position"),
            Status::Offer
        );
        assert_eq!(Status::normalize("application received"), Status::Applied);
    }

    #[test]
    fn test_normalize_is_case_insensitive_and_trims() {
        assert_eq!(Status::normalize("  DECLINED  "), Status::Declined);
        assert_eq!(Status::normalize("\tOffer\n"), Status::Offer);
    }

    #[test]
    fn test_normalize_defaults_to_applied() {
        assert_eq!(Status::normalize(""), Status::Applied);
        assert_eq!(Status::normalize("   "), Status::Applied);
        assert_eq!(Status::normalize("Unknown"), Status::Applied);
        assert_eq!(Status::normalize("some unrelated text"), Status::Applied);
    }

    #[test]
    fn test_accepted_beats_offer() {
        assert_eq!(Status::normalize("I accepted the offer"), Status::Accepted);
    }

    #[test]
    fn test_as_str_round_trip() {
        for status in [
            Status::Applied,
            Status::Screening,
            Status::Interviewing,
            Status::Offer,
            Status::Accepted,
            Status::Declined,
            Status::Withdrawn,
        ] {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
        }
    }

    #[test]
    fn test_from_str_rejects_free_text() {
        assert!("we will not be moving forward".parse::<Status>().is_err());
    }

    #[test]
    fn test_is_terminal() {
        assert!(Status::Declined.is_terminal());
        assert!(Status::Withdrawn.is_terminal());
        assert!(Status::Accepted.is_terminal());
        assert!(!Status::Interviewing.is_terminal());
    }
}
