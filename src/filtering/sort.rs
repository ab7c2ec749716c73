use sea_orm::sea_query::Order;
use std::fmt;

use super::predicate::Predicate;

// Shared default values
const DEFAULT_SORT_COLUMN: &str = "id";
const MAX_COLUMN_NAME_LENGTH: usize = 100;

/// Column names accepted from callers who may order by any field
fn is_valid_column_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_COLUMN_NAME_LENGTH
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

/// One sort key: `"level"` or `"-level"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub column: String,
    pub descending: bool,
}

impl OrderKey {
    #[must_use]
    pub fn parse(key: &str) -> Self {
        let key = key.trim();
        match key.strip_prefix('-') {
            Some(column) => Self {
                column: column.to_string(),
                descending: true,
            },
            None => Self {
                column: key.to_string(),
                descending: false,
            },
        }
    }

    #[must_use]
    pub fn flipped(&self) -> Self {
        Self {
            column: self.column.clone(),
            descending: !self.descending,
        }
    }

    #[must_use]
    pub fn order(&self) -> Order {
        if self.descending {
            Order::Desc
        } else {
            Order::Asc
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            f.write_str("-")?;
        }
        f.write_str(&self.column)
    }
}

fn parse_keys(ordering: &str) -> Vec<OrderKey> {
    ordering
        .split(',')
        .filter(|key| !key.trim().is_empty())
        .map(OrderKey::parse)
        .collect()
}

/// Flip every key when `reverse` is set.
#[must_use]
pub fn apply_reverse(keys: &[OrderKey], reverse: bool) -> Vec<OrderKey> {
    keys.iter()
        .map(|key| if reverse { key.flipped() } else { key.clone() })
        .collect()
}

/// Comma-joined form of a key list, as carried in the `ordering` parameter.
#[must_use]
pub fn join_keys(keys: &[OrderKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Allowed and default orderings of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingSpec {
    /// `(key, label)`; a key may itself be comma-composite
    pub allowed: Vec<(String, String)>,
    /// Signed keys, primary first
    pub default_ordering: Vec<String>,
    /// Whether the default ordering is shown reversed
    pub default_reverse: bool,
}

impl Default for OrderingSpec {
    fn default() -> Self {
        Self::new([DEFAULT_SORT_COLUMN])
    }
}

impl OrderingSpec {
    pub fn new<I, S>(default_ordering: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Vec::new(),
            default_ordering: default_ordering.into_iter().map(Into::into).collect(),
            default_reverse: false,
        }
    }

    #[must_use]
    pub fn allow(mut self, key: impl Into<String>, label: impl Into<String>) -> Self {
        self.allowed.push((key.into(), label.into()));
        self
    }

    #[must_use]
    pub fn default_reverse(mut self, reverse: bool) -> Self {
        self.default_reverse = reverse;
        self
    }

    fn is_allowed_key(&self, key: &str) -> bool {
        self.allowed.iter().any(|(allowed, _)| allowed == key)
    }

    /// The whole composite key is declared, or every part of it is.
    fn allows(&self, ordering: &str) -> bool {
        self.is_allowed_key(ordering)
            || parse_keys(ordering)
                .iter()
                .all(|key| self.is_allowed_key(&key.column))
    }

    fn default_keys(&self) -> Vec<OrderKey> {
        self.default_ordering
            .iter()
            .map(|key| OrderKey::parse(key))
            .collect()
    }

    /// Keys the default ordering sorts by, after its own reverse.
    #[must_use]
    pub fn effective_default(&self) -> Vec<OrderKey> {
        apply_reverse(&self.default_keys(), self.default_reverse)
    }
}

/// Final ordering of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOrdering {
    /// Keys as handed to the store, reverse already applied
    pub keys: Vec<OrderKey>,
    pub reverse: bool,
    pub is_default: bool,
    /// Plain column names worth annotating in the list, empty for the default ordering
    pub relevant_fields: Vec<String>,
}

impl ResolvedOrdering {
    /// Keys without the reverse flag, as they would be written in the `ordering` parameter.
    #[must_use]
    pub fn requested_keys(&self) -> Vec<OrderKey> {
        apply_reverse(&self.keys, self.reverse)
    }
}

/// Resolve the ordering of a request.
///
/// `requested_reverse` is `None` when the caller left the direction open, in
/// which case the declared default direction is used. A key outside the allowed list is
/// honoured only when `can_bypass` is set; otherwise the whole request falls
/// back to the default ordering.
#[must_use]
pub fn resolve_ordering(
    requested: Option<&str>,
    requested_reverse: Option<bool>,
    spec: &OrderingSpec,
    can_bypass: bool,
) -> ResolvedOrdering {
    let requested = requested.map(str::trim).filter(|ordering| !ordering.is_empty());

    let (base, reverse) = match requested {
        Some(ordering)
            if spec.allows(ordering)
                || (can_bypass
                    && parse_keys(ordering)
                        .iter()
                        .all(|key| is_valid_column_name(&key.column))) =>
        {
            (
                parse_keys(ordering),
                requested_reverse.unwrap_or(spec.default_reverse),
            )
        }
        Some(ordering) => {
            tracing::debug!(ordering = %ordering, can_bypass, "Ignoring disallowed ordering, using default");
            (spec.default_keys(), spec.default_reverse)
        }
        None => (spec.default_keys(), spec.default_reverse),
    };

    let base = if base.is_empty() {
        vec![OrderKey::parse(DEFAULT_SORT_COLUMN)]
    } else {
        base
    };
    let keys = apply_reverse(&base, reverse);
    let is_default = keys == spec.effective_default();
    let relevant_fields = if is_default {
        Vec::new()
    } else {
        base.iter().map(|key| key.column.clone()).collect()
    };

    ResolvedOrdering {
        keys,
        reverse,
        is_default,
        relevant_fields,
    }
}

/// Hide rows whose single ascending ordering column is null while other filters are active.
#[must_use]
pub fn null_hiding_predicate(ordering: &ResolvedOrdering, other_active_filters: usize) -> Option<Predicate> {
    match ordering.keys.as_slice() {
        [key] if !key.descending && other_active_filters > 0 => {
            Some(Predicate::is_null(key.column.as_str(), false))
        }
        _ => None,
    }
}
