//! Free-text search and translation-aware matching.
//!
//! Translated text is stored sharded: the base column holds the default
//! language, a few languages own a dedicated column (`korean_name`), and every
//! other language lives in a JSON object column named `d_<field>s`
//! (`{"ja":"...","fr":"..."}`). [`ShardedTranslations`] builds the leaves for
//! that layout; other layouts plug in through [`TranslationProvider`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use super::compiler::CompileContext;
use super::params::FilterValue;
use super::predicate::{LeafOp, Predicate};
use super::spec::PredicateFn;

/// Default query parameter holding the search terms
pub const DEFAULT_SEARCH_PARAMETER: &str = "search";

/// Language stored in the base column of translated fields
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    Exact,
    #[default]
    Contains,
    StartsWith,
    EndsWith,
}

impl MatchMode {
    #[must_use]
    pub const fn op(self) -> LeafOp {
        match self {
            Self::Exact => LeafOp::Exact,
            Self::Contains => LeafOp::Contains,
            Self::StartsWith => LeafOp::StartsWith,
            Self::EndsWith => LeafOp::EndsWith,
        }
    }
}

/// Builds predicates matching a term against the translations of a field.
pub trait TranslationProvider: Send + Sync {
    /// Predicate matching rows where `field`, in `language` (any language
    /// when `None`), matches `term` under `mode`.
    fn translated_leaves(
        &self,
        field: &str,
        term: &str,
        mode: MatchMode,
        language: Option<&str>,
    ) -> Predicate;
}

/// Language codes such as `ja` or `zh-hans`.
fn is_language_code(language: &str) -> bool {
    !language.is_empty()
        && language
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Base column, per-language columns, and a `d_<field>s` JSON column.
#[derive(Debug, Clone)]
pub struct ShardedTranslations {
    default_language: String,
    own_columns: HashMap<String, BTreeMap<String, String>>,
}

impl Default for ShardedTranslations {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

impl ShardedTranslations {
    #[must_use]
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            default_language: default_language.into(),
            own_columns: HashMap::new(),
        }
    }

    /// `language` values of `field` are stored in `column` instead of the JSON column.
    #[must_use]
    pub fn own_column(
        mut self,
        field: impl Into<String>,
        language: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.own_columns
            .entry(field.into())
            .or_default()
            .insert(language.into(), column.into());
        self
    }

    fn json_column(field: &str) -> String {
        format!("d_{field}s")
    }

    fn json_leaf(field: &str, term: &str, mode: MatchMode, language: &str) -> Predicate {
        if !is_language_code(language) {
            tracing::debug!(language = %language, "Ignoring malformed search language");
            return Predicate::any(Vec::new());
        }
        Predicate::json_leaf(Self::json_column(field), language, mode.op(), term)
    }

    fn any_json_leaf(field: &str, term: &str, mode: MatchMode) -> Predicate {
        let column = Self::json_column(field);
        let quoted = serde_json::Value::String(term.to_string()).to_string();
        let bare = &quoted[1..quoted.len() - 1];
        match mode {
            MatchMode::Exact => Predicate::contains(column, format!(":{quoted}")),
            MatchMode::StartsWith => Predicate::contains(column, format!(":\"{bare}")),
            MatchMode::EndsWith => Predicate::contains(column, format!("{bare}\"")),
            MatchMode::Contains => Predicate::contains(column, bare),
        }
    }
}

impl TranslationProvider for ShardedTranslations {
    fn translated_leaves(
        &self,
        field: &str,
        term: &str,
        mode: MatchMode,
        language: Option<&str>,
    ) -> Predicate {
        let own = self.own_columns.get(field);
        match language {
            Some(language) if language == self.default_language => {
                Predicate::leaf(field, mode.op(), term)
            }
            Some(language) => match own.and_then(|columns| columns.get(language)) {
                Some(column) => Predicate::leaf(column.as_str(), mode.op(), term),
                None => Self::json_leaf(field, term, mode, language),
            },
            None => {
                let mut parts = vec![Predicate::leaf(field, mode.op(), term)];
                parts.extend(
                    own.into_iter()
                        .flat_map(BTreeMap::values)
                        .map(|column| Predicate::leaf(column.as_str(), mode.op(), term)),
                );
                parts.push(Self::any_json_leaf(field, term, mode));
                Predicate::any(parts)
            }
        }
    }
}

/// Fields searched by the free-text search parameter.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub parameter: String,
    /// Case-insensitive substring match
    pub fields: Vec<String>,
    /// Case-insensitive whole-value match
    pub exact_fields: Vec<String>,
    /// Matched through the translation provider
    pub translated_fields: Vec<String>,
    labels: BTreeMap<String, String>,
    localized_labels: HashMap<String, BTreeMap<String, String>>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            parameter: DEFAULT_SEARCH_PARAMETER.to_string(),
            fields: Vec::new(),
            exact_fields: Vec::new(),
            translated_fields: Vec::new(),
            labels: BTreeMap::new(),
            localized_labels: HashMap::new(),
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = parameter.into();
        self
    }

    #[must_use]
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    #[must_use]
    pub fn exact_field(mut self, field: impl Into<String>) -> Self {
        self.exact_fields.push(field.into());
        self
    }

    #[must_use]
    pub fn translated_field(mut self, field: impl Into<String>) -> Self {
        self.translated_fields.push(field.into());
        self
    }

    #[must_use]
    pub fn label(mut self, field: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(field.into(), label.into());
        self
    }

    #[must_use]
    pub fn localized_label(
        mut self,
        language: impl Into<String>,
        field: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        self.localized_labels
            .entry(language.into())
            .or_default()
            .insert(field.into(), label.into());
        self
    }

    fn label_for(&self, field: &str, language: Option<&str>) -> String {
        language
            .and_then(|language| self.localized_labels.get(language))
            .and_then(|labels| labels.get(field))
            .or_else(|| self.labels.get(field))
            .cloned()
            .unwrap_or_else(|| field.replace('_', " "))
    }

    /// Comma-separated labels of every searched field, without duplicates.
    #[must_use]
    pub fn help_text(&self, language: Option<&str>) -> String {
        let mut labels: Vec<String> = Vec::new();
        for field in self
            .fields
            .iter()
            .chain(&self.exact_fields)
            .chain(&self.translated_fields)
        {
            let label = self.label_for(field, language);
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels.join(", ")
    }

    /// Whitespace-separated terms are ANDed; each term matches any configured field.
    #[must_use]
    pub fn predicate(&self, terms: &str, ctx: &CompileContext<'_>) -> Predicate {
        Predicate::all(terms.split_whitespace().map(|term| {
            let mut parts: Vec<Predicate> = self
                .fields
                .iter()
                .map(|field| Predicate::contains(field.as_str(), term))
                .collect();
            parts.extend(
                self.exact_fields
                    .iter()
                    .map(|field| Predicate::iexact(field.as_str(), term)),
            );
            parts.extend(self.translated_fields.iter().map(|field| {
                ctx.translations
                    .translated_leaves(field, term, MatchMode::Contains, ctx.language)
            }));
            Predicate::any(parts)
        }))
    }
}

/// Custom rule for the search field, ANDed onto the accumulator.
#[must_use]
pub fn search_rule(config: Arc<SearchConfig>) -> PredicateFn {
    Arc::new(move |acc: Predicate, value: &FilterValue, ctx: &CompileContext<'_>| {
        acc.and(config.predicate(&value.to_string(), ctx))
    })
}

/// Per (entity, language) search help text, computed once and kept for the
/// life of the process.
#[derive(Debug, Default)]
pub struct SearchHelpTextCache {
    entries: Mutex<HashMap<(String, String), Arc<str>>>,
}

impl SearchHelpTextCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute<F>(&self, entity: &str, language: Option<&str>, compute: F) -> Arc<str>
    where
        F: FnOnce() -> String,
    {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Search help text cache mutex was poisoned, recovering data");
                poisoned.into_inner()
            }
        };
        let key = (entity.to_string(), language.unwrap_or_default().to_string());
        Arc::clone(
            entries
                .entry(key)
                .or_insert_with(|| Arc::from(compute())),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
