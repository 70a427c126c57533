//! Post lifecycle states and the transition table

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Published,
    Failed,
    Archived,
}

impl PostStatus {
    pub const ALL: [PostStatus; 5] = [
        PostStatus::Draft,
        PostStatus::Scheduled,
        PostStatus::Published,
        PostStatus::Failed,
        PostStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Published => "published",
            PostStatus::Failed => "failed",
            PostStatus::Archived => "archived",
        }
    }

    /// States reachable from this one, identity excluded
    pub fn allowed_transitions(&self) -> &'static [PostStatus] {
        use PostStatus::*;
        match self {
            Draft => &[Scheduled, Published, Archived],
            Scheduled => &[Draft, Published, Failed, Archived],
            Published => &[Archived],
            Failed => &[Draft, Scheduled, Archived],
            Archived => &[Draft],
        }
    }

    /// Whether moving to `to` is legal. Staying put is always legal.
    pub fn can_transition_to(&self, to: PostStatus) -> bool {
        *self == to || self.allowed_transitions().contains(&to)
    }

    pub fn validate_transition(&self, to: PostStatus) -> Result<(), TransitionError> {
        if self.can_transition_to(to) {
            Ok(())
        } else {
            Err(TransitionError { from: *self, to })
        }
    }

    /// Outcome states of a publish pass
    pub fn is_terminal(&self) -> bool {
        matches!(self, PostStatus::Published | PostStatus::Failed)
    }
}

/// Free-function form of [`PostStatus::can_transition_to`]
pub fn can_transition(from: PostStatus, to: PostStatus) -> bool {
    from.can_transition_to(to)
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(PostStatus::Draft),
            "scheduled" => Ok(PostStatus::Scheduled),
            "published" => Ok(PostStatus::Published),
            "failed" => Ok(PostStatus::Failed),
            "archived" => Ok(PostStatus::Archived),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A requested status change the table does not allow
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid status transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: PostStatus,
    pub to: PostStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown status: {0}")]
pub struct UnknownStatus(pub String);

#[cfg(test)]
mod tests {
    use super::PostStatus::*;
    use super::*;

    const LEGAL: &[(PostStatus, PostStatus)] = &[
        (Draft, Scheduled),
        (Draft, Published),
        (Draft, Archived),
        (Scheduled, Draft),
        (Scheduled, Published),
        (Scheduled, Failed),
        (Scheduled, Archived),
        (Published, Archived),
        (Failed, Draft),
        (Failed, Scheduled),
        (Failed, Archived),
        (Archived, Draft),
    ];

    #[test]
    fn test_every_listed_transition_is_allowed() {
        for (from, to) in LEGAL {
            assert!(can_transition(*from, *to), "{from} -> {to} should be legal");
        }
    }

    #[test]
    fn test_identity_transition_is_allowed() {
        for status in PostStatus::ALL {
            assert!(can_transition(status, status));
        }
    }

    #[test]
    fn test_unlisted_transitions_are_rejected() {
        for from in PostStatus::ALL {
            for to in PostStatus::ALL {
                if from == to || LEGAL.contains(&(from, to)) {
                    continue;
                }
                assert!(!can_transition(from, to), "{from} -> {to} should be rejected");
                assert_eq!(
                    from.validate_transition(to),
                    Err(TransitionError { from, to })
                );
            }
        }
    }

    #[test]
    fn test_published_is_only_archivable() {
        assert!(!can_transition(Published, Draft));
        assert!(!can_transition(Published, Scheduled));
        assert!(!can_transition(Published, Failed));
        assert!(can_transition(Published, Archived));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Scheduled".parse::<PostStatus>().unwrap(), Scheduled);
        assert!("pending".parse::<PostStatus>().is_err());
    }

    #[test]
    fn test_transition_error_message() {
        let error = Archived.validate_transition(Published).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Invalid status transition: archived -> published"
        );
    }
}
