//! Folds normalized filter values into a single predicate.
//!
//! Fields are visited in declaration order. A custom rule receives the
//! accumulated predicate and replaces it, so the fold is order-sensitive and
//! must stay sequential. Automatic and translated rules AND their contribution
//! onto the accumulator.

use super::params::{FilterValue, NormalizedValues};
use super::predicate::Predicate;
use super::search::{MatchMode, TranslationProvider};
use super::spec::{
    EntityFilters, FieldFilterSpec, FieldKind, FilterRule, Lookup, MultipleOperator, Selector,
    SelectorOperator,
};

/// Request-scoped collaborators available to compilation rules.
#[derive(Clone, Copy)]
pub struct CompileContext<'a> {
    /// Language of the request, for translated matching
    pub language: Option<&'a str>,
    pub translations: &'a dyn TranslationProvider,
}

impl<'a> CompileContext<'a> {
    #[must_use]
    pub fn new(translations: &'a dyn TranslationProvider) -> Self {
        Self {
            language: None,
            translations,
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: Option<&'a str>) -> Self {
        self.language = language;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    pub predicate: Predicate,
    /// Some active field may duplicate rows
    pub distinct: bool,
    /// Number of fields that contributed to the predicate
    pub active_filters: usize,
}

/// Compile `values` for `entity`, starting from an empty predicate.
#[must_use]
pub fn compile(
    entity: &EntityFilters,
    values: &NormalizedValues,
    ctx: &CompileContext<'_>,
) -> CompiledFilter {
    compile_from(Predicate::True, entity, values, ctx)
}

/// Compile `values` for `entity` onto `seed`, which custom rules will see as
/// their initial accumulator.
#[must_use]
pub fn compile_from(
    seed: Predicate,
    entity: &EntityFilters,
    values: &NormalizedValues,
    ctx: &CompileContext<'_>,
) -> CompiledFilter {
    let mut predicate = seed;
    let mut distinct = false;
    let mut active_filters = 0;

    for spec in entity.fields() {
        if spec.noop {
            continue;
        }
        let Some(value) = values.get(&spec.name).filter(|value| !value.is_empty()) else {
            continue;
        };

        predicate = match &spec.rule {
            FilterRule::Custom(rule) => rule(predicate, value, ctx),
            FilterRule::Translated { field, mode } => {
                predicate.and(translated(field, *mode, value, ctx))
            }
            FilterRule::Auto {
                selectors,
                operator_for_selectors,
                ..
            } => predicate.and(compile_auto(
                entity,
                spec,
                selectors,
                *operator_for_selectors,
                value,
            )),
        };
        distinct |= spec.distinct;
        active_filters += 1;
    }

    tracing::debug!(
        entity = entity.name(),
        active_filters,
        distinct,
        predicate = %predicate,
        "Compiled filter predicate"
    );

    CompiledFilter {
        predicate,
        distinct,
        active_filters,
    }
}

fn translated(field: &str, mode: MatchMode, value: &FilterValue, ctx: &CompileContext<'_>) -> Predicate {
    Predicate::any(value.to_list().iter().map(|term| {
        ctx.translations
            .translated_leaves(field, &term.to_string(), mode, ctx.language)
    }))
}

/// "Has no value" on `column`. Text-like columns treat `''` as no value.
fn null_test(entity: &EntityFilters, column: &str, is_null: bool) -> Predicate {
    match (entity.is_text_column(column), is_null) {
        (true, true) => Predicate::is_null(column, true).or(Predicate::exact(column, "")),
        (true, false) => {
            Predicate::is_null(column, false).and(Predicate::exact(column, "").negate())
        }
        (false, is_null) => Predicate::is_null(column, is_null),
    }
}

fn compile_auto(
    entity: &EntityFilters,
    spec: &FieldFilterSpec,
    selectors: &[Selector],
    operator: SelectorOperator,
    value: &FilterValue,
) -> Predicate {
    let mut parts = Vec::with_capacity(selectors.len());
    let mut tests_absence = false;

    for selector in selectors {
        let column = selector.column.as_str();
        let part = match (spec.kind, selector.lookup) {
            (FieldKind::NullBoolean, lookup) => {
                let Some(flag) = value.as_bool() else {
                    tracing::debug!(field = %spec.name, value = %value, "Ignoring non-boolean value for tri-state field");
                    continue;
                };
                match lookup {
                    Lookup::Exact => Predicate::exact(column, flag),
                    Lookup::IsNull => {
                        // A transformed value already states the null test
                        // itself; a raw "yes" means "has a value".
                        let is_null = if spec.to_value.is_some() { flag } else { !flag };
                        tests_absence |= is_null;
                        null_test(entity, column, is_null)
                    }
                }
            }
            (_, Lookup::IsNull) => {
                let is_null = value.as_bool().unwrap_or(true);
                tests_absence |= is_null;
                null_test(entity, column, is_null)
            }
            (_, Lookup::Exact) if spec.multiple => {
                let values = value.to_list();
                match spec.multiple_operator() {
                    MultipleOperator::OrContains => Predicate::any(
                        values
                            .into_iter()
                            .map(|value| Predicate::contains(column, value)),
                    ),
                    MultipleOperator::OrExact => Predicate::is_in(column, values),
                    MultipleOperator::And => Predicate::all(
                        values
                            .into_iter()
                            .map(|value| Predicate::contains(column, value)),
                    ),
                }
            }
            (_, Lookup::Exact) => match value {
                FilterValue::List(values) => Predicate::is_in(column, values.clone()),
                scalar => Predicate::exact(column, scalar.clone()),
            },
        };
        parts.push(part);
    }

    // "No value in any alias column" is every alias being empty, so an
    // absence test combines its selectors with the opposite operator.
    let operator = if tests_absence {
        operator.inverted()
    } else {
        operator
    };
    operator.combine(parts)
}

/// Generic `ids=1,2,3` filter on the entity's id column.
///
/// Anything but digits and commas is ignored as a whole.
#[must_use]
pub fn ids_predicate(entity: &EntityFilters, raw: &str) -> Option<Predicate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if !raw.chars().all(|c| c.is_ascii_digit() || c == ',') || !raw.chars().any(|c| c.is_ascii_digit()) {
        tracing::debug!(entity = entity.name(), ids = %raw, "Ignoring malformed ids filter");
        return None;
    }
    let ids: Vec<FilterValue> = raw
        .split(',')
        .filter_map(|id| id.parse::<i64>().ok())
        .map(FilterValue::Int)
        .collect();
    if ids.is_empty() {
        return None;
    }
    Some(Predicate::is_in(entity.id_column(), ids))
}
