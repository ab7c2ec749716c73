use serde::Deserialize;

use crate::filtering::params::DEFAULT_CSV_SEPARATOR;
use crate::permissions::ORDER_BY_ANY_FIELD;

/// Process-wide listing settings. Entity-level knobs take precedence.
///
/// Every field has a default, so an empty document is a valid configuration:
///
/// ```rust
/// let config: listcrate::ListConfig = serde_json::from_str("{}").unwrap();
/// assert_eq!(config.max_page_size, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    pub default_page_size: u64,
    /// Upper bound for a requested `page_size`
    pub max_page_size: u64,
    pub default_per_line: u64,
    pub csv_separator: char,
    /// Capability that lifts the allowed-ordering restriction
    pub bypass_ordering_capability: String,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            default_page_size: 12,
            max_page_size: 500,
            default_per_line: 3,
            csv_separator: DEFAULT_CSV_SEPARATOR,
            bypass_ordering_capability: ORDER_BY_ANY_FIELD.to_string(),
        }
    }
}

impl ListConfig {
    /// Requested size clamped to `1..=max_page_size`, or the default.
    #[must_use]
    pub fn page_size(&self, requested: Option<u64>, entity_default: Option<u64>) -> u64 {
        requested
            .or(entity_default)
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: ListConfig =
            serde_json::from_str(r#"{"max_page_size": 100, "csv_separator": ";"}"#).unwrap();
        assert_eq!(config.max_page_size, 100);
        assert_eq!(config.csv_separator, ';');
        assert_eq!(config.default_page_size, 12);
        assert_eq!(config.bypass_ordering_capability, "order_by_any_field");
    }

    #[test]
    fn test_page_size_clamped() {
        let config = ListConfig::default();
        assert_eq!(config.page_size(None, None), 12);
        assert_eq!(config.page_size(None, Some(30)), 30);
        assert_eq!(config.page_size(Some(10_000), Some(30)), 500);
        assert_eq!(config.page_size(Some(0), None), 1);
    }
}
