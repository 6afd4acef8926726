//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Score at or above which a prediction is reported as high confidence
pub const HIGH_CONFIDENCE_SCORE: f64 = 80.0;

/// Score at or above which a prediction is reported as medium confidence
pub const MEDIUM_CONFIDENCE_SCORE: f64 = 60.0;

/// Confidence category shown next to a predicted yield
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Bucket a percent confidence score (0..=100)
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_CONFIDENCE_SCORE {
            Confidence::High
        } else if score >= MEDIUM_CONFIDENCE_SCORE {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Bucket a fractional score (0..=1), as sent in `confidence_score`
    pub fn from_fraction(fraction: f64) -> Self {
        Self::from_score(fraction * 100.0)
    }

    /// Parse a category label (case-insensitive)
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" | "moderate" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure taxonomy surfaced to the UI
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or malformed input, caught before any network call
    #[serde(rename = "validation")]
    Validation,
    /// Transport failure: unreachable host, DNS, timeout
    #[serde(rename = "network")]
    Network,
    /// 4xx with a nested `detail` object
    #[serde(rename = "http-4xx-structured")]
    HttpStructured,
    /// 4xx with a plain string `detail`
    #[serde(rename = "http-4xx-flat")]
    HttpFlat,
    #[serde(rename = "http-5xx")]
    HttpServer,
    /// 2xx whose body could not be normalized
    #[serde(rename = "invalid-response")]
    InvalidResponse,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Network => "network",
            ErrorKind::HttpStructured => "http-4xx-structured",
            ErrorKind::HttpFlat => "http-4xx-flat",
            ErrorKind::HttpServer => "http-5xx",
            ErrorKind::InvalidResponse => "invalid-response",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
