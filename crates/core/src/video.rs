//! Video classification, priority and status.

use serde::{Deserialize, Serialize};

/// Content classification for uploaded videos.
///
/// A fixed enumeration; anything else a client sends is normalized to
/// [`Classification::Other`] rather than rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Music,
    News,
    Sports,
    Entertainment,
    Education,
    #[default]
    Other,
}

impl Classification {
    /// Normalize a client-supplied value; unknown inputs become `Other`.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "music" => Self::Music,
            "news" => Self::News,
            "sports" => Self::Sports,
            "entertainment" => Self::Entertainment,
            "education" => Self::Education,
            _ => Self::Other,
        }
    }

    /// Canonical lowercase name, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Music => "music",
            Self::News => "news",
            Self::Sports => "sports",
            Self::Entertainment => "entertainment",
            Self::Education => "education",
            Self::Other => "other",
        }
    }
}

/// Upload priority, a small bounded integer.
///
/// Client input outside `1..=5` (or unparsable input) resets to the
/// default of 3; priority is never a reason to reject a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(i32);

impl Priority {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;
    pub const DEFAULT: i32 = 3;

    /// Build from a raw client value.
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.and_then(|s| s.trim().parse::<i32>().ok()) {
            Some(v) if (Self::MIN..=Self::MAX).contains(&v) => Self(v),
            _ => Self(Self::DEFAULT),
        }
    }

    pub fn get(&self) -> i32 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Status of a durable video record. Videos become visible only once
/// assembly and settlement both succeeded, so `ready` is the sole state
/// a row is ever created in.
pub const VIDEO_STATUS_READY: &str = "ready";
