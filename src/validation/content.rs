/*!
 * Content cross-checks between a source segment and its final text.
 *
 * Numbers and link targets are protected during translation, so any that
 * disappear point at a lost or mangled placeholder.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static NUMBER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)*").expect("Invalid number regex"));

static LINK_TARGET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\]\(\s*<?([^)\s>]+)|(?:https?|ftp)://[^\s<>()\[\]"'`]+"#).expect("Invalid link target regex")
});

/// Items of `expected` not matched one-for-one in `actual`
fn multiset_difference(expected: Vec<String>, mut actual: Vec<String>) -> Vec<String> {
    let mut missing = Vec::new();
    for item in expected {
        match actual.iter().position(|a| *a == item) {
            Some(pos) => {
                actual.swap_remove(pos);
            }
            None => missing.push(item),
        }
    }
    missing
}

fn numbers(text: &str) -> Vec<String> {
    NUMBER_REGEX.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

fn link_targets(text: &str) -> Vec<String> {
    LINK_TARGET_REGEX
        .captures_iter(text)
        .map(|caps| {
            caps.get(1)
                .map_or_else(|| caps[0].to_string(), |m| m.as_str().to_string())
                .trim_end_matches(['.', ',', ';', ':', '!', '?'])
                .to_string()
        })
        .collect()
}

/// Result of the content cross-check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContentCheckResult {
    pub missing_numbers: Vec<String>,
    pub missing_links: Vec<String>,
}

impl ContentCheckResult {
    pub fn passed(&self) -> bool {
        self.missing_numbers.is_empty() && self.missing_links.is_empty()
    }

    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.missing_numbers.is_empty() {
            parts.push(format!("numbers lost: {}", self.missing_numbers.join(", ")));
        }
        if !self.missing_links.is_empty() {
            parts.push(format!("link targets lost: {}", self.missing_links.join(", ")));
        }
        parts.join("; ")
    }
}

/// Checks that numbers and link targets survive translation
pub struct ContentValidator;

impl ContentValidator {
    pub fn check(source: &str, translated: &str) -> ContentCheckResult {
        ContentCheckResult {
            missing_numbers: multiset_difference(numbers(source), numbers(translated)),
            missing_links: multiset_difference(link_targets(source), link_targets(translated)),
        }
    }
}
