//! Gated Features

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::EntitlementError;

/// Actions an account can be allowed or denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Generate a property report (metered)
    Report,
    /// Ask the AI assistant a question (metered)
    AiQuestion,
    /// Save a property to the portfolio
    SaveProperty,
    /// Export a report as PDF
    ExportPdf,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::Report,
        Feature::AiQuestion,
        Feature::SaveProperty,
        Feature::ExportPdf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Report => "report",
            Feature::AiQuestion => "ai_question",
            Feature::SaveProperty => "save_property",
            Feature::ExportPdf => "export_pdf",
        }
    }

    /// Whether this feature has a per-period counter that consumption increments
    pub fn is_consumable(&self) -> bool {
        matches!(self, Feature::Report | Feature::AiQuestion)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = EntitlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "report" => Ok(Feature::Report),
            "ai_question" => Ok(Feature::AiQuestion),
            "save_property" => Ok(Feature::SaveProperty),
            "export_pdf" => Ok(Feature::ExportPdf),
            other => Err(EntitlementError::InvalidFeature(other.to_string())),
        }
    }
}
