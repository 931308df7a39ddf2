// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Bad-word and URL detection for submitted messages.
//!
//! Matches here silently discard the entry (see `pipeline`), so the
//! filters only answer yes/no and never produce user-facing errors.

use crate::config::FilterConfig;
use regex::Regex;

/// Content filter built from an injectable denylist and TLD set.
pub struct ContentFilter {
    bad_words: Vec<String>,
    url_pattern: Regex,
}

impl ContentFilter {
    /// Build a filter from configuration.
    ///
    /// The URL pattern matches scheme prefixes, `www.` prefixes, and
    /// bare domains with one of the configured TLDs.
    pub fn new(config: &FilterConfig) -> Result<Self, regex::Error> {
        let tlds = config
            .url_tlds
            .iter()
            .map(|tld| regex::escape(tld))
            .collect::<Vec<_>>()
            .join("|");
        let url_pattern = Regex::new(&format!(
            r"(?i)(?:https?://|www\.|[a-z0-9-]+\.(?:{tlds}))"
        ))?;

        Ok(Self {
            bad_words: config
                .bad_words
                .iter()
                .map(|word| word.to_lowercase())
                .collect(),
            url_pattern,
        })
    }

    /// Case-insensitive substring match against the denylist.
    pub fn contains_bad_word(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.bad_words.iter().any(|word| lower.contains(word.as_str()))
    }

    /// Whether the text contains a URL-like substring.
    pub fn contains_url(&self, text: &str) -> bool {
        self.url_pattern.is_match(text)
    }
}
