use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration for filtering extracted item references
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefFilterConfig {
    /// Only references on this domain pass (None disables the check)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_domain: Option<String>,

    /// Regex patterns references must match (if empty, all references are
    /// included unless excluded)
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Regex patterns that reject references (these take precedence over
    /// include patterns)
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Filter deciding which extracted references enter the discovery set.
///
/// Grid cells can carry ad tiles and navigation anchors next to real
/// product links; this keeps the accumulator to the references the run
/// is actually after.
#[derive(Debug)]
pub struct RefFilter {
    config: RefFilterConfig,
    include_regexes: Vec<Regex>,
    exclude_regexes: Vec<Regex>,
}

impl Default for RefFilter {
    fn default() -> Self {
        Self::new(RefFilterConfig::default()).expect("empty pattern set should be valid")
    }
}

impl RefFilter {
    /// Create a new reference filter from configuration
    pub fn new(config: RefFilterConfig) -> Result<Self, regex::Error> {
        // Compile regex patterns
        let mut include_regexes = Vec::with_capacity(config.include_patterns.len());
        for pattern in &config.include_patterns {
            include_regexes.push(Regex::new(pattern)?);
        }

        let mut exclude_regexes = Vec::with_capacity(config.exclude_patterns.len());
        for pattern in &config.exclude_patterns {
            exclude_regexes.push(Regex::new(pattern)?);
        }

        Ok(Self {
            config,
            include_regexes,
            exclude_regexes,
        })
    }

    /// Determine if a reference passes all filtering rules
    pub fn accepts(&self, url: &Url) -> bool {
        // Check domain restriction
        if !self.is_in_domain_scope(url) {
            return false;
        }

        // Check regex exclusions (these take precedence)
        let url_str = url.as_str();
        for regex in &self.exclude_regexes {
            if regex.is_match(url_str) {
                return false;
            }
        }

        // If include patterns are specified, at least one must match
        if !self.include_regexes.is_empty() {
            let mut included = false;
            for regex in &self.include_regexes {
                if regex.is_match(url_str) {
                    included = true;
                    break;
                }
            }
            if !included {
                return false;
            }
        }

        true
    }

    /// Check if a reference is within the allowed domain scope
    fn is_in_domain_scope(&self, url: &Url) -> bool {
        match &self.config.required_domain {
            Some(required) => match url.domain() {
                Some(domain) => domain == required,
                // No domain in the URL but a domain is required
                None => false,
            },
            None => true,
        }
    }
}
