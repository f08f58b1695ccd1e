/*!
 * Debug report: per-segment snapshots of every pipeline stage.
 *
 * Observational only; building or skipping it never changes the output.
 */

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::translation::document::{Document, PlaceholderMap, Segment, SegmentKind};
use crate::translation::glossary::GlossaryMatch;
use crate::translation::registry::TranslationStrategy;
use crate::validation::markers::MarkerValidationResult;

use super::orchestrator::{SegmentIssue, SegmentSummary, TextSource, ValidationStatus};

/// Snapshot of one segment
#[derive(Debug, Clone, Serialize)]
pub struct SegmentSnapshot {
    pub id: usize,
    pub kind: SegmentKind,
    pub raw_text: String,
    pub protected_text: String,
    pub placeholder_map: PlaceholderMap,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub glossary_matches: Vec<GlossaryMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mt_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postedit_text: Option<String>,
    pub postedit_attempts: u32,
    pub final_text: String,
    pub text_source: TextSource,
    pub validation_status: ValidationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_check: Option<MarkerValidationResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<SegmentIssue>,
}

impl SegmentSnapshot {
    pub fn new(
        segment: &Segment,
        summary: &SegmentSummary,
        glossary_matches: Vec<GlossaryMatch>,
        marker_check: Option<MarkerValidationResult>,
    ) -> Self {
        Self {
            id: segment.id,
            kind: segment.kind,
            raw_text: segment.raw_text.clone(),
            protected_text: segment.protected_text.clone(),
            placeholder_map: segment.placeholders.clone(),
            glossary_matches,
            strategy: summary.strategy.clone(),
            mt_text: summary.mt_text.clone(),
            postedit_text: summary.postedit_text.clone(),
            postedit_attempts: summary.postedit_attempts,
            final_text: summary.final_text.clone(),
            text_source: summary.text_source,
            validation_status: summary.validation_status,
            marker_check,
            issues: summary.issues.clone(),
        }
    }
}

/// Full debug report of a run
#[derive(Debug, Clone, Serialize)]
pub struct DebugReport {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Hex SHA-256 of the source text
    pub source_sha256: String,
    pub source_language: String,
    pub target_language: String,
    pub strategy: TranslationStrategy,
    pub postedit_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postedit_generator: Option<String>,
    pub segments: Vec<SegmentSnapshot>,
}

impl DebugReport {
    pub fn new(
        document: &Document,
        target_language: &str,
        strategy: TranslationStrategy,
        postedit_generator: Option<String>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            source_sha256: sha256_hex(document.text()),
            source_language: document.source_language().to_string(),
            target_language: target_language.to_string(),
            strategy,
            postedit_enabled: postedit_generator.is_some(),
            postedit_generator,
            segments: Vec::new(),
        }
    }

    pub fn push(&mut self, snapshot: SegmentSnapshot) {
        self.segments.push(snapshot);
    }

    /// Segments flagged with at least one issue
    pub fn flagged_segments(&self) -> impl Iterator<Item = &SegmentSnapshot> {
        self.segments.iter().filter(|s| !s.issues.is_empty())
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub fn sha256_hex(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}
