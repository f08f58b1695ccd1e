/*!
 * Marker validation for translated segments.
 *
 * Every `__PH<n>__` and `__GL<n>__` marker sent to a model must come back
 * exactly once and in the same relative order. A text whose markers are all
 * present exactly once can still be restored even when they were reordered,
 * so the result tells apart "valid" from merely "restorable".
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

/// Any marker
static MARKER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__(?:PH|GL)\d+__").expect("Invalid marker regex"));

/// Markers in `text`, left to right
pub fn extract_markers(text: &str) -> Vec<String> {
    MARKER_REGEX.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Marker validation result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarkerValidationResult {
    /// Whether all markers are present
    pub all_present: bool,
    /// Expected markers that were not found
    pub missing: Vec<String>,
    /// Expected markers found more than once
    pub duplicated: Vec<String>,
    /// Markers that were never sent
    pub unexpected: Vec<String>,
    /// Markers found out of order
    pub out_of_order: bool,
    /// Error message if validation failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl MarkerValidationResult {
    /// Check if validation passed (all markers present once and in order)
    pub fn passed(&self) -> bool {
        self.restorable() && !self.out_of_order
    }

    /// Every expected marker exactly once and nothing else
    pub fn restorable(&self) -> bool {
        self.all_present && self.duplicated.is_empty() && self.unexpected.is_empty()
    }
}

/// Marker validator for translated segments
pub struct MarkerValidator;

impl MarkerValidator {
    /// Validate the markers of `text` against the expected sequence
    pub fn validate(expected: &[String], text: &str) -> MarkerValidationResult {
        let found = extract_markers(text);

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for marker in &found {
            *counts.entry(marker.as_str()).or_insert(0) += 1;
        }

        let missing: Vec<String> = expected
            .iter()
            .filter(|m| !counts.contains_key(m.as_str()))
            .cloned()
            .collect();
        let duplicated: Vec<String> = expected
            .iter()
            .filter(|m| counts.get(m.as_str()).is_some_and(|c| *c > 1))
            .cloned()
            .collect();
        let mut unexpected: Vec<String> = found
            .iter()
            .filter(|m| !expected.contains(m))
            .cloned()
            .collect();
        unexpected.dedup();

        let all_present = missing.is_empty();
        let out_of_order = all_present && duplicated.is_empty() && found.as_slice() != expected;

        let error_message = if !all_present {
            Some(format!("missing markers: {}", missing.join(", ")))
        } else if !duplicated.is_empty() {
            Some(format!("duplicated markers: {}", duplicated.join(", ")))
        } else if !unexpected.is_empty() {
            Some(format!("unexpected markers: {}", unexpected.join(", ")))
        } else if out_of_order {
            Some(format!("markers reordered: expected {}, found {}", expected.join(" "), found.join(" ")))
        } else {
            None
        };

        MarkerValidationResult {
            all_present,
            missing,
            duplicated,
            unexpected,
            out_of_order,
            error_message,
        }
    }
}
