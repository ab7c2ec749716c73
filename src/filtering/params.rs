//! Raw query parameters and their per-field normalization.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::spec::{EntityFilters, FieldFilterSpec, FieldKind};

/// Default separator for CSV-packed multi-values (`tags=a,b`)
pub const DEFAULT_CSV_SEPARATOR: char = ',';

/// A typed filter value, after parsing and `to_value` transforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// `Null`, an empty string and an empty list carry no filter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(text) => text.is_empty(),
            Self::List(values) => values.iter().all(Self::is_empty),
            Self::Bool(_) | Self::Int(_) => false,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Scalars become a one-element list; `Null` becomes an empty list.
    #[must_use]
    pub fn to_list(&self) -> Vec<FilterValue> {
        match self {
            Self::Null => Vec::new(),
            Self::List(values) => values.clone(),
            scalar => vec![scalar.clone()],
        }
    }

    /// Sorted, de-duplicated string form used to compare filter states.
    ///
    /// `"2"` and `2`, or `a` and `[a]`, compare equal.
    #[must_use]
    pub fn canonical(&self) -> Vec<String> {
        let mut items: Vec<String> = self
            .to_list()
            .iter()
            .filter(|value| !value.is_empty())
            .map(ToString::to_string)
            .collect();
        items.sort();
        items.dedup();
        items
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Int(number) => write!(f, "{number}"),
            Self::Text(text) => f.write_str(text),
            Self::List(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{value}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// Multi-valued query parameters in order of first appearance.
///
/// A key may legitimately repeat: `tags=a&tags=b`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, Vec<String>)>,
}

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.push(key, value);
        }
        params
    }

    /// Parse an `application/x-www-form-urlencoded` query string (without `?`).
    #[must_use]
    pub fn from_query_string(query: &str) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()).into_owned())
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    #[must_use]
    pub fn get_all(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, values)| values.as_slice())
    }

    /// Last value for `key`, as a form field would read it.
    #[must_use]
    pub fn get_last(&self, key: &str) -> Option<&str> {
        self.get_all(key)
            .and_then(<[String]>::last)
            .map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get_all(key).is_some()
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

/// Per-field normalized values for one request. Only active fields are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedValues(BTreeMap<String, FilterValue>);

impl NormalizedValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FilterValue> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FilterValue) -> Option<FilterValue> {
        self.0.insert(field.into(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<FilterValue> {
        self.0.remove(field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.0.iter().map(|(field, value)| (field.as_str(), value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, FilterValue)> for NormalizedValues {
    fn from_iter<I: IntoIterator<Item = (K, FilterValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Turns raw multi-valued strings into typed values, field by field.
#[derive(Debug, Clone, Copy)]
pub struct ParameterNormalizer {
    separator: char,
}

impl Default for ParameterNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_CSV_SEPARATOR)
    }
}

impl ParameterNormalizer {
    #[must_use]
    pub const fn new(separator: char) -> Self {
        Self { separator }
    }

    /// Normalize every declared field of `entity`.
    #[must_use]
    pub fn normalize(&self, entity: &EntityFilters, params: &QueryParams) -> NormalizedValues {
        let mut values = NormalizedValues::new();
        for spec in entity.fields() {
            if let Some(value) = self.normalize_field(spec, params.get_all(&spec.name)) {
                values.insert(spec.name.clone(), value);
            }
        }
        values
    }

    /// Normalize a single field. `None` means the field is inactive.
    #[must_use]
    pub fn normalize_field(&self, spec: &FieldFilterSpec, raw: Option<&[String]>) -> Option<FilterValue> {
        let Some(raw) = raw else {
            return spec.initial.clone();
        };

        let value = if spec.multiple {
            let entries: Vec<&str> = match raw {
                [single] if spec.allow_csv && single.contains(self.separator) => {
                    single.split(self.separator).collect()
                }
                _ => raw.iter().map(String::as_str).collect(),
            };
            let items: Vec<FilterValue> = entries
                .into_iter()
                .filter_map(|entry| parse_scalar(spec, entry))
                .collect();
            if items.is_empty() {
                return None;
            }
            FilterValue::List(items)
        } else {
            parse_scalar(spec, raw.last()?)?
        };

        let value = match &spec.to_value {
            Some(to_value) => to_value(value),
            None => value,
        };
        (!value.is_empty()).then_some(value)
    }
}

fn parse_scalar(spec: &FieldFilterSpec, raw: &str) -> Option<FilterValue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match spec.kind {
        FieldKind::Integer => match trimmed.parse::<i64>() {
            Ok(number) => Some(FilterValue::Int(number)),
            Err(_) => {
                tracing::debug!(field = %spec.name, value = %trimmed, "Ignoring malformed integer filter value");
                None
            }
        },
        FieldKind::NullBoolean => parse_null_boolean(trimmed).map(FilterValue::Bool),
        FieldKind::Boolean => parse_checkbox(trimmed).map(FilterValue::Bool),
        FieldKind::Text | FieldKind::Choice | FieldKind::MultipleChoice => {
            Some(FilterValue::Text(trimmed.to_string()))
        }
    }
}

/// Tri-state select: `2` is yes, `3` is no, anything else is "unknown".
#[must_use]
pub fn parse_null_boolean(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "2" | "true" | "yes" => Some(true),
        "3" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[must_use]
pub fn parse_checkbox(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Some(true),
        "off" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtering::spec::{EntityFilters, FieldFilterSpec, MultipleOperator};

    fn entity() -> EntityFilters {
        EntityFilters::builder("cards")
            .field(
                FieldFilterSpec::builder("tags")
                    .kind(FieldKind::MultipleChoice)
                    .operator_for_multiple(MultipleOperator::OrContains),
            )
            .field(FieldFilterSpec::builder("status").multiple(false))
            .field(FieldFilterSpec::builder("ids").kind(FieldKind::Integer))
            .field(FieldFilterSpec::builder("has_art").kind(FieldKind::NullBoolean).multiple(false))
            .field(FieldFilterSpec::builder("quote").allow_csv(false))
            .field(
                FieldFilterSpec::builder("language")
                    .multiple(false)
                    .initial(FilterValue::from("en")),
            )
            .build()
            .unwrap()
    }

    fn normalize(pairs: &[(&str, &str)]) -> NormalizedValues {
        ParameterNormalizer::default().normalize(&entity(), &QueryParams::from_pairs(pairs.iter().copied()))
    }

    #[test]
    fn test_csv_packed_equals_repeated_keys() {
        let packed = normalize(&[("tags", "a,b")]);
        let repeated = normalize(&[("tags", "a"), ("tags", "b")]);
        assert_eq!(packed, repeated);
        assert_eq!(
            packed.get("tags"),
            Some(&FilterValue::List(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn test_csv_not_split_when_disallowed() {
        let values = normalize(&[("quote", "hello, world")]);
        assert_eq!(
            values.get("quote"),
            Some(&FilterValue::List(vec!["hello, world".into()]))
        );
    }

    #[test]
    fn test_scalar_field_stays_scalar() {
        let values = normalize(&[("status", "open"), ("status", "closed")]);
        assert_eq!(values.get("status"), Some(&FilterValue::from("closed")));
    }

    #[test]
    fn test_malformed_integer_degrades_per_value() {
        let values = normalize(&[("ids", "1,x,3")]);
        assert_eq!(
            values.get("ids"),
            Some(&FilterValue::List(vec![FilterValue::Int(1), FilterValue::Int(3)]))
        );
        let values = normalize(&[("ids", "x")]);
        assert!(values.get("ids").is_none());
    }

    #[test]
    fn test_null_boolean_tri_state() {
        assert_eq!(normalize(&[("has_art", "2")]).get("has_art"), Some(&FilterValue::Bool(true)));
        assert_eq!(normalize(&[("has_art", "3")]).get("has_art"), Some(&FilterValue::Bool(false)));
        assert!(normalize(&[("has_art", "1")]).get("has_art").is_none());
        assert!(normalize(&[("has_art", "")]).get("has_art").is_none());
    }

    #[test]
    fn test_initial_only_when_absent() {
        assert_eq!(normalize(&[]).get("language"), Some(&FilterValue::from("en")));
        assert!(normalize(&[("language", "")]).get("language").is_none());
    }

    #[test]
    fn test_query_string_parsing() {
        let params = QueryParams::from_query_string("tags=a&tags=b%2Cc&search=hello+world");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get_all("tags").unwrap(), ["a", "b,c"]);
        assert_eq!(params.get_last("search"), Some("hello world"));
    }

    #[test]
    fn test_canonical_form() {
        assert_eq!(FilterValue::Int(2).canonical(), FilterValue::from("2").canonical());
        assert_eq!(
            FilterValue::from(vec!["b", "a"]).canonical(),
            FilterValue::from(vec!["a", "b", "a"]).canonical()
        );
    }
}
