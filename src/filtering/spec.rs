//! Declarative per-field filter metadata.
//!
//! Each listed entity is described once, at startup, by an [`EntityFilters`]
//! value: an ordered list of [`FieldFilterSpec`]s, the set of text-like
//! columns, named presets, the allowed orderings and the list-view knobs.
//! The description is immutable afterwards and shared between requests behind
//! an `Arc` in a [`FilterSpecRegistry`].
//!
//! ```rust,ignore
//! let cards = EntityFilters::builder("cards")
//!     .text_columns(["name", "description"])
//!     .field(FieldFilterSpec::builder("rarity").kind(FieldKind::Integer))
//!     .field(
//!         FieldFilterSpec::builder("tags")
//!             .kind(FieldKind::MultipleChoice)
//!             .operator_for_multiple(MultipleOperator::And),
//!     )
//!     .build()?;
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use super::compiler::CompileContext;
use super::params::FilterValue;
use super::predicate::Predicate;
use super::presets::PresetDefinition;
use super::search::{MatchMode, SearchConfig, search_rule};
use super::sort::OrderingSpec;
use crate::errors::ConfigError;

/// Custom predicate: receives the accumulated predicate and the field's value,
/// returns the new accumulator.
pub type PredicateFn =
    Arc<dyn Fn(Predicate, &FilterValue, &CompileContext<'_>) -> Predicate + Send + Sync>;

/// Value transform applied to an active normalized value.
pub type ValueFn = Arc<dyn Fn(FilterValue) -> FilterValue + Send + Sync>;

/// Column name used by the generic `ids` filter when none is configured
pub const DEFAULT_ID_COLUMN: &str = "id";

/// How raw strings for a field are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKind {
    /// Free text, kept verbatim (trimmed)
    #[default]
    Text,
    /// Whole numbers; malformed entries are dropped one by one
    Integer,
    /// One value from a fixed set of choices
    Choice,
    /// A set-encoded column where each row holds several choices
    MultipleChoice,
    /// Tri-state select: unknown, yes (`2`) or no (`3`)
    NullBoolean,
    /// Checkbox
    Boolean,
}

impl FieldKind {
    /// Kinds whose value is a single yes/no flag.
    #[must_use]
    pub const fn is_flag(self) -> bool {
        matches!(self, Self::NullBoolean | Self::Boolean)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Exact,
    /// `column__isnull`: the value is a flag, `true` meaning "has no value"
    IsNull,
}

/// A column addressed by a predicate leaf, with its lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub column: String,
    pub lookup: Lookup,
}

impl Selector {
    #[must_use]
    pub fn exact(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            lookup: Lookup::Exact,
        }
    }

    #[must_use]
    pub fn is_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            lookup: Lookup::IsNull,
        }
    }
}

impl From<&str> for Selector {
    fn from(value: &str) -> Self {
        match value.strip_suffix("__isnull") {
            Some(column) => Self::is_null(column),
            None => Self::exact(value),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lookup {
            Lookup::Exact => f.write_str(&self.column),
            Lookup::IsNull => write!(f, "{}__isnull", self.column),
        }
    }
}

/// Combination of the values of a multi-valued field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultipleOperator {
    /// Any value is contained in the column
    OrContains,
    /// The column equals one of the values
    OrExact,
    /// Every value is contained in the column
    And,
}

/// Combination of the leaves of one field's selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectorOperator {
    #[default]
    Or,
    And,
}

impl SelectorOperator {
    #[must_use]
    pub const fn inverted(self) -> Self {
        match self {
            Self::Or => Self::And,
            Self::And => Self::Or,
        }
    }

    #[must_use]
    pub fn combine(self, parts: Vec<Predicate>) -> Predicate {
        match self {
            Self::Or => Predicate::any(parts),
            Self::And => Predicate::all(parts),
        }
    }
}

/// How a field turns its value into a predicate.
#[derive(Clone)]
pub enum FilterRule {
    Auto {
        selectors: Vec<Selector>,
        operator_for_multiple: Option<MultipleOperator>,
        operator_for_selectors: SelectorOperator,
    },
    Custom(PredicateFn),
    /// Delegated to the translation provider
    Translated { field: String, mode: MatchMode },
}

impl fmt::Debug for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto {
                selectors,
                operator_for_multiple,
                operator_for_selectors,
            } => f
                .debug_struct("Auto")
                .field("selectors", selectors)
                .field("operator_for_multiple", operator_for_multiple)
                .field("operator_for_selectors", operator_for_selectors)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::Translated { field, mode } => f
                .debug_struct("Translated")
                .field("field", field)
                .field("mode", mode)
                .finish(),
        }
    }
}

/// Filter metadata for one declared field.
#[derive(Clone)]
pub struct FieldFilterSpec {
    pub name: String,
    pub kind: FieldKind,
    pub rule: FilterRule,
    pub to_value: Option<ValueFn>,
    pub multiple: bool,
    pub allow_csv: bool,
    pub distinct: bool,
    /// Parsed and kept in the filter state but never compiled
    pub noop: bool,
    /// Substituted when the field is absent from the request
    pub initial: Option<FilterValue>,
}

impl fmt::Debug for FieldFilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldFilterSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("rule", &self.rule)
            .field("to_value", &self.to_value.as_ref().map(|_| ".."))
            .field("multiple", &self.multiple)
            .field("allow_csv", &self.allow_csv)
            .field("distinct", &self.distinct)
            .field("noop", &self.noop)
            .field("initial", &self.initial)
            .finish()
    }
}

impl FieldFilterSpec {
    pub fn builder(name: impl Into<String>) -> FieldSpecBuilder {
        FieldSpecBuilder::new(name)
    }

    /// Spec used for fields nobody declared: exact match on the column of the
    /// same name, single value, not distinct.
    #[must_use]
    pub fn implicit(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            rule: FilterRule::Auto {
                selectors: vec![Selector::from(name.as_str())],
                operator_for_multiple: None,
                operator_for_selectors: SelectorOperator::Or,
            },
            name,
            kind: FieldKind::Text,
            to_value: None,
            multiple: false,
            allow_csv: false,
            distinct: false,
            noop: false,
            initial: None,
        }
    }

    /// Operator for multi-valued input, falling back to the kind's default.
    #[must_use]
    pub fn multiple_operator(&self) -> MultipleOperator {
        match &self.rule {
            FilterRule::Auto {
                operator_for_multiple: Some(operator),
                ..
            } => *operator,
            _ if self.kind == FieldKind::MultipleChoice => MultipleOperator::OrContains,
            _ => MultipleOperator::OrExact,
        }
    }

    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self.rule, FilterRule::Custom(_))
    }
}

/// Builder for [`FieldFilterSpec`]; conflicting options are reported by [`build`](Self::build).
pub struct FieldSpecBuilder {
    name: String,
    kind: FieldKind,
    selectors: Option<Vec<Selector>>,
    operator_for_multiple: Option<MultipleOperator>,
    operator_for_selectors: Option<SelectorOperator>,
    custom: Option<PredicateFn>,
    translated: Option<(String, MatchMode)>,
    to_value: Option<ValueFn>,
    multiple: Option<bool>,
    allow_csv: bool,
    distinct: bool,
    noop: bool,
    initial: Option<FilterValue>,
}

impl FieldSpecBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
            selectors: None,
            operator_for_multiple: None,
            operator_for_selectors: None,
            custom: None,
            translated: None,
            to_value: None,
            multiple: None,
            allow_csv: true,
            distinct: false,
            noop: false,
            initial: None,
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    /// Add a selector; `"col__isnull"` declares a null test.
    #[must_use]
    pub fn selector(mut self, selector: impl Into<Selector>) -> Self {
        self.selectors.get_or_insert_with(Vec::new).push(selector.into());
        self
    }

    #[must_use]
    pub fn selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Selector>,
    {
        self.selectors
            .get_or_insert_with(Vec::new)
            .extend(selectors.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn operator_for_multiple(mut self, operator: MultipleOperator) -> Self {
        self.operator_for_multiple = Some(operator);
        self
    }

    #[must_use]
    pub fn operator_for_selectors(mut self, operator: SelectorOperator) -> Self {
        self.operator_for_selectors = Some(operator);
        self
    }

    #[must_use]
    pub fn custom<F>(self, predicate: F) -> Self
    where
        F: Fn(Predicate, &FilterValue, &CompileContext<'_>) -> Predicate + Send + Sync + 'static,
    {
        self.custom_rule(Arc::new(predicate))
    }

    #[must_use]
    pub fn custom_rule(mut self, predicate: PredicateFn) -> Self {
        self.custom = Some(predicate);
        self
    }

    /// Match against translated values of `field` through the translation provider.
    #[must_use]
    pub fn translated(mut self, field: impl Into<String>, mode: MatchMode) -> Self {
        self.translated = Some((field.into(), mode));
        self
    }

    #[must_use]
    pub fn to_value<F>(mut self, transform: F) -> Self
    where
        F: Fn(FilterValue) -> FilterValue + Send + Sync + 'static,
    {
        self.to_value = Some(Arc::new(transform));
        self
    }

    #[must_use]
    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = Some(multiple);
        self
    }

    #[must_use]
    pub fn allow_csv(mut self, allow_csv: bool) -> Self {
        self.allow_csv = allow_csv;
        self
    }

    #[must_use]
    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    #[must_use]
    pub fn noop(mut self, noop: bool) -> Self {
        self.noop = noop;
        self
    }

    #[must_use]
    pub fn initial(mut self, initial: impl Into<FilterValue>) -> Self {
        self.initial = Some(initial.into());
        self
    }

    /// Validate the options and freeze them into a [`FieldFilterSpec`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConflictingRule`] when a custom or translated rule
    /// is combined with options only automatic compilation understands, and
    /// [`ConfigError::EmptySelectors`] for an explicitly empty selector list.
    pub fn build(self) -> Result<FieldFilterSpec, ConfigError> {
        if matches!(&self.selectors, Some(selectors) if selectors.is_empty()) {
            return Err(ConfigError::EmptySelectors { field: self.name });
        }

        let conflict = |reason: &'static str| ConfigError::ConflictingRule {
            field: self.name.clone(),
            reason,
        };

        let rule = match (self.custom.clone(), self.translated.clone()) {
            (Some(_), Some(_)) => {
                return Err(conflict("a custom predicate cannot also be translated"));
            }
            (Some(predicate), None) => {
                if self.selectors.is_some() {
                    return Err(conflict("a custom predicate cannot declare selectors"));
                }
                if self.operator_for_multiple.is_some() {
                    return Err(conflict(
                        "a custom predicate cannot declare an operator for multiple values",
                    ));
                }
                if self.operator_for_selectors.is_some() {
                    return Err(conflict(
                        "a custom predicate cannot declare an operator for selectors",
                    ));
                }
                FilterRule::Custom(predicate)
            }
            (None, Some((field, mode))) => {
                if self.selectors.is_some() {
                    return Err(conflict("a translated field cannot declare selectors"));
                }
                FilterRule::Translated { field, mode }
            }
            (None, None) => FilterRule::Auto {
                selectors: self
                    .selectors
                    .unwrap_or_else(|| vec![Selector::from(self.name.as_str())]),
                operator_for_multiple: self.operator_for_multiple,
                operator_for_selectors: self.operator_for_selectors.unwrap_or_default(),
            },
        };

        // Checkboxes and tri-states always carry a single flag
        let multiple = !self.kind.is_flag()
            && self
                .multiple
                .unwrap_or(!matches!(rule, FilterRule::Custom(_)));

        Ok(FieldFilterSpec {
            name: self.name,
            kind: self.kind,
            rule,
            to_value: self.to_value,
            multiple,
            allow_csv: self.allow_csv,
            distinct: self.distinct,
            noop: self.noop,
            initial: self.initial,
        })
    }
}

/// Complete, immutable filter description of one entity.
#[derive(Debug)]
pub struct EntityFilters {
    name: String,
    fields: Vec<FieldFilterSpec>,
    text_columns: BTreeSet<String>,
    presets: Vec<PresetDefinition>,
    ordering: OrderingSpec,
    id_column: String,
    search: Option<Arc<SearchConfig>>,
    page_size: Option<u64>,
    per_line: Option<u64>,
    show_group_headers: bool,
}

impl EntityFilters {
    pub fn builder(name: impl Into<String>) -> EntityFiltersBuilder {
        EntityFiltersBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields, in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldFilterSpec] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldFilterSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    #[must_use]
    pub fn is_text_column(&self, column: &str) -> bool {
        self.text_columns.contains(column)
    }

    #[must_use]
    pub fn presets(&self) -> &[PresetDefinition] {
        &self.presets
    }

    #[must_use]
    pub fn preset(&self, slug: &str) -> Option<&PresetDefinition> {
        self.presets.iter().find(|preset| preset.slug == slug)
    }

    #[must_use]
    pub fn ordering(&self) -> &OrderingSpec {
        &self.ordering
    }

    #[must_use]
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    #[must_use]
    pub fn search(&self) -> Option<&Arc<SearchConfig>> {
        self.search.as_ref()
    }

    #[must_use]
    pub fn page_size(&self) -> Option<u64> {
        self.page_size
    }

    #[must_use]
    pub fn per_line(&self) -> Option<u64> {
        self.per_line
    }

    #[must_use]
    pub fn show_group_headers(&self) -> bool {
        self.show_group_headers
    }
}

pub struct EntityFiltersBuilder {
    name: String,
    fields: Vec<FieldSpecBuilder>,
    text_columns: BTreeSet<String>,
    presets: Vec<PresetDefinition>,
    ordering: OrderingSpec,
    id_column: String,
    search: Option<Arc<SearchConfig>>,
    page_size: Option<u64>,
    per_line: Option<u64>,
    show_group_headers: bool,
}

impl EntityFiltersBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            text_columns: BTreeSet::new(),
            presets: Vec::new(),
            ordering: OrderingSpec::default(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            search: None,
            page_size: None,
            per_line: None,
            show_group_headers: false,
        }
    }

    #[must_use]
    pub fn field(mut self, field: FieldSpecBuilder) -> Self {
        self.fields.push(field);
        self
    }

    /// Mark text-like columns, where "no value" covers both NULL and `''`.
    #[must_use]
    pub fn text_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_columns.extend(columns.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn preset(mut self, preset: PresetDefinition) -> Self {
        self.presets.push(preset);
        self
    }

    #[must_use]
    pub fn ordering(mut self, ordering: OrderingSpec) -> Self {
        self.ordering = ordering;
        self
    }

    #[must_use]
    pub fn id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    /// Declare the free-text search field, compiled as a custom rule at this
    /// position in the field order.
    #[must_use]
    pub fn search(mut self, config: SearchConfig) -> Self {
        let config = Arc::new(config);
        self.fields.push(
            FieldFilterSpec::builder(config.parameter.clone())
                .custom_rule(search_rule(Arc::clone(&config)))
                .multiple(false),
        );
        self.search = Some(config);
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    #[must_use]
    pub fn per_line(mut self, per_line: u64) -> Self {
        self.per_line = Some(per_line);
        self
    }

    #[must_use]
    pub fn show_group_headers(mut self, show: bool) -> Self {
        self.show_group_headers = show;
        self
    }

    /// Validate every field and preset.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found: an invalid field, a field
    /// declared twice, a duplicate preset slug, or a preset that sets a value
    /// for an undeclared field.
    pub fn build(self) -> Result<EntityFilters, ConfigError> {
        let mut fields: Vec<FieldFilterSpec> = Vec::with_capacity(self.fields.len());
        for builder in self.fields {
            let spec = builder.build()?;
            if fields.iter().any(|existing| existing.name == spec.name) {
                return Err(ConfigError::DuplicateField {
                    entity: self.name,
                    field: spec.name,
                });
            }
            fields.push(spec);
        }

        for (i, preset) in self.presets.iter().enumerate() {
            if self.presets[..i].iter().any(|other| other.slug == preset.slug) {
                return Err(ConfigError::DuplicatePreset {
                    entity: self.name,
                    slug: preset.slug.clone(),
                });
            }
            if let Some(field) = preset
                .field_values
                .keys()
                .find(|field| !fields.iter().any(|spec| &spec.name == *field))
            {
                return Err(ConfigError::UnknownPresetField {
                    preset: preset.slug.clone(),
                    field: field.clone(),
                });
            }
        }

        Ok(EntityFilters {
            name: self.name,
            fields,
            text_columns: self.text_columns,
            presets: self.presets,
            ordering: self.ordering,
            id_column: self.id_column,
            search: self.search,
            page_size: self.page_size,
            per_line: self.per_line,
            show_group_headers: self.show_group_headers,
        })
    }
}

/// Entity name to filter description.
#[derive(Debug, Default, Clone)]
pub struct FilterSpecRegistry {
    entities: HashMap<String, Arc<EntityFilters>>,
}

impl FilterSpecRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateEntity`] if the name is already taken.
    pub fn register(&mut self, entity: EntityFilters) -> Result<Arc<EntityFilters>, ConfigError> {
        if self.entities.contains_key(entity.name()) {
            return Err(ConfigError::DuplicateEntity {
                entity: entity.name().to_string(),
            });
        }
        let entity = Arc::new(entity);
        self.entities
            .insert(entity.name().to_string(), Arc::clone(&entity));
        Ok(entity)
    }

    #[must_use]
    pub fn entity(&self, name: &str) -> Option<Arc<EntityFilters>> {
        self.entities.get(name).cloned()
    }

    /// Spec for `field` of `entity`. Unknown entities and fields get the
    /// implicit exact-match spec.
    #[must_use]
    pub fn get(&self, entity: &str, field: &str) -> FieldFilterSpec {
        self.entities
            .get(entity)
            .and_then(|filters| filters.field(field))
            .cloned()
            .unwrap_or_else(|| FieldFilterSpec::implicit(field))
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_parses_isnull_suffix() {
        assert_eq!(Selector::from("c_tags__isnull"), Selector::is_null("c_tags"));
        assert_eq!(Selector::from("status"), Selector::exact("status"));
        assert_eq!(Selector::is_null("art").to_string(), "art__isnull");
    }

    #[test]
    fn test_multiple_defaults_follow_rule() {
        let auto = FieldFilterSpec::builder("tags").build().unwrap();
        assert!(auto.multiple);
        assert!(auto.allow_csv);

        let custom = FieldFilterSpec::builder("owner")
            .custom(|acc, _, _| acc)
            .build()
            .unwrap();
        assert!(!custom.multiple);

        let custom_multiple = FieldFilterSpec::builder("owner")
            .custom(|acc, _, _| acc)
            .multiple(true)
            .build()
            .unwrap();
        assert!(custom_multiple.multiple);
    }

    #[test]
    fn test_flag_kinds_are_always_single_valued() {
        let tri_state = FieldFilterSpec::builder("has_art")
            .kind(FieldKind::NullBoolean)
            .selector("art__isnull")
            .build()
            .unwrap();
        assert!(!tri_state.multiple);

        let checkbox = FieldFilterSpec::builder("is_promo")
            .kind(FieldKind::Boolean)
            .multiple(true)
            .build()
            .unwrap();
        assert!(!checkbox.multiple);
    }

    #[test]
    fn test_default_selector_is_field_name() {
        let spec = FieldFilterSpec::builder("status").build().unwrap();
        match spec.rule {
            FilterRule::Auto { selectors, .. } => assert_eq!(selectors, vec![Selector::exact("status")]),
            other => panic!("unexpected rule {other:?}"),
        }
    }

    #[test]
    fn test_multiple_operator_defaults_by_kind() {
        let tags = FieldFilterSpec::builder("tags")
            .kind(FieldKind::MultipleChoice)
            .build()
            .unwrap();
        assert_eq!(tags.multiple_operator(), MultipleOperator::OrContains);
        let rarity = FieldFilterSpec::builder("rarity").build().unwrap();
        assert_eq!(rarity.multiple_operator(), MultipleOperator::OrExact);
    }

    #[test]
    fn test_custom_with_selectors_is_rejected() {
        let err = FieldFilterSpec::builder("owner")
            .selector("owner_id")
            .custom(|acc, _, _| acc)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingRule { .. }));

        let err = FieldFilterSpec::builder("owner")
            .operator_for_multiple(MultipleOperator::And)
            .custom(|acc, _, _| acc)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingRule { .. }));
    }

    #[test]
    fn test_empty_selectors_rejected() {
        let err = FieldFilterSpec::builder("status")
            .selectors(Vec::<&str>::new())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::EmptySelectors {
                field: "status".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = EntityFilters::builder("cards")
            .field(FieldFilterSpec::builder("status"))
            .field(FieldFilterSpec::builder("status"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateField { .. }));
    }

    #[test]
    fn test_preset_with_undeclared_field_rejected() {
        let err = EntityFilters::builder("cards")
            .field(FieldFilterSpec::builder("rarity"))
            .preset(PresetDefinition::new("shiny").value("shiny", "yes"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPresetField { .. }));
    }

    #[test]
    fn test_registry_get_never_fails() {
        let mut registry = FilterSpecRegistry::new();
        registry
            .register(
                EntityFilters::builder("cards")
                    .field(FieldFilterSpec::builder("tags").distinct(true))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        assert!(registry.get("cards", "tags").distinct);

        let unknown = registry.get("cards", "colour");
        assert!(!unknown.multiple);
        assert!(!unknown.distinct);
        assert!(matches!(unknown.rule, FilterRule::Auto { .. }));

        let unknown_entity = registry.get("events", "status");
        assert_eq!(unknown_entity.name, "status");
    }

    #[test]
    fn test_registry_rejects_duplicate_entity() {
        let mut registry = FilterSpecRegistry::new();
        registry
            .register(EntityFilters::builder("cards").build().unwrap())
            .unwrap();
        let err = registry
            .register(EntityFilters::builder("cards").build().unwrap())
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEntity { .. }));
    }
}
