//! Supported summary styles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use paperhub_core::error::AppError;

/// Presentation style requested for a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "summary_style", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SummaryStyle {
    /// Concise bullet list.
    BulletPoints,
    /// Narrative paragraphs.
    Paragraph,
    /// Sectioned analysis.
    Detailed,
    /// Bottom line and takeaways.
    Executive,
    /// Abstract/methods/results layout.
    Academic,
}

/// Descriptive metadata for a style, used by style pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleInfo {
    /// Style identifier.
    pub id: SummaryStyle,
    /// Display name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Example of the output shape.
    pub example_output: &'static str,
}

impl SummaryStyle {
    /// Every supported style in display order.
    pub const ALL: [SummaryStyle; 5] = [
        Self::BulletPoints,
        Self::Paragraph,
        Self::Detailed,
        Self::Executive,
        Self::Academic,
    ];

    /// Return the style identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BulletPoints => "bullet_points",
            Self::Paragraph => "paragraph",
            Self::Detailed => "detailed",
            Self::Executive => "executive",
            Self::Academic => "academic",
        }
    }

    /// Descriptive metadata for this style.
    pub fn info(&self) -> StyleInfo {
        let (name, description, example_output) = match self {
            Self::BulletPoints => (
                "Bullet Points",
                "Concise bullet-point format highlighting key information",
                "• Key finding 1\n• Key finding 2\n• Key finding 3",
            ),
            Self::Paragraph => (
                "Paragraph",
                "Flowing paragraph narrative for easy reading",
                "This document discusses... The main points include...",
            ),
            Self::Detailed => (
                "Detailed Analysis",
                "Comprehensive detailed analysis with sections",
                "## Overview\n...\n## Key Findings\n...\n## Methodology\n...",
            ),
            Self::Executive => (
                "Executive Summary",
                "Brief executive summary with key takeaways for quick decisions",
                "**Bottom Line:** ...\n**Key Takeaways:**\n1. ...\n2. ...",
            ),
            Self::Academic => (
                "Academic Style",
                "Academic/research style with structured sections",
                "**Abstract:** ...\n**Methods:** ...\n**Results:** ...\n**Conclusion:** ...",
            ),
        };
        StyleInfo {
            id: *self,
            name,
            description,
            example_output,
        }
    }

    /// Metadata for every style.
    pub fn catalog() -> Vec<StyleInfo> {
        Self::ALL.iter().map(SummaryStyle::info).collect()
    }
}

impl fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryStyle {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|style| style.as_str() == s)
            .ok_or_else(|| AppError::invalid_style(s))
    }
}
