//! Named filter bundles.
//!
//! A preset is a fixed set of field values exposed as a shortcut and a
//! canonical URL (`/cards/rare/` instead of `/cards/?rarity=3`). Applying a
//! preset overwrites the fields it names; matching goes the other way and
//! recognizes an ad-hoc filter state that is exactly a preset.

use serde::Serialize;
use std::collections::BTreeMap;

use super::params::{FilterValue, NormalizedValues, ParameterNormalizer};
use super::spec::EntityFilters;
use crate::models::RESERVED_PARAMETERS;
use crate::permissions::{Caller, PermissionOracle};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresetDefinition {
    pub slug: String,
    pub field_values: BTreeMap<String, FilterValue>,
    pub label: Option<String>,
    pub icon: Option<String>,
    pub image: Option<String>,
    /// Hidden from callers without this capability
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_capability: Option<String>,
}

impl PresetDefinition {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            field_values: BTreeMap::new(),
            label: None,
            icon: None,
            image: None,
            required_capability: None,
        }
    }

    #[must_use]
    pub fn value(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.field_values.insert(field.into(), value.into());
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    #[must_use]
    pub fn requires(mut self, capability: impl Into<String>) -> Self {
        self.required_capability = Some(capability.into());
        self
    }
}

/// Applies and recognizes the presets of one entity.
#[derive(Debug, Clone, Copy)]
pub struct PresetResolver<'a> {
    entity: &'a EntityFilters,
    normalizer: ParameterNormalizer,
}

impl<'a> PresetResolver<'a> {
    #[must_use]
    pub fn new(entity: &'a EntityFilters, normalizer: ParameterNormalizer) -> Self {
        Self { entity, normalizer }
    }

    /// Presets in declaration order.
    #[must_use]
    pub fn presets(&self) -> &'a [PresetDefinition] {
        self.entity.presets()
    }

    /// Presets `caller` may see.
    #[must_use]
    pub fn visible(&self, caller: &Caller, oracle: &dyn PermissionOracle) -> Vec<&'a PresetDefinition> {
        self.presets()
            .iter()
            .filter(|preset| {
                preset
                    .required_capability
                    .as_deref()
                    .is_none_or(|capability| oracle.has_capability(caller, capability))
            })
            .collect()
    }

    /// The preset's own values, normalized like request input for the same fields.
    fn normalized(&self, field: &str, value: &FilterValue) -> Option<FilterValue> {
        let spec = self.entity.field(field)?;
        let raw: Vec<String> = value
            .to_list()
            .iter()
            .map(ToString::to_string)
            .collect();
        self.normalizer.normalize_field(spec, Some(raw.as_slice()))
    }

    /// Overwrite the preset's fields in `current`. An unknown slug changes nothing.
    #[must_use]
    pub fn apply(&self, slug: &str, current: &NormalizedValues) -> NormalizedValues {
        let mut values = current.clone();
        let Some(preset) = self.entity.preset(slug) else {
            tracing::debug!(entity = self.entity.name(), slug, "Ignoring unknown preset");
            return values;
        };
        for (field, value) in &preset.field_values {
            match self.normalized(field, value) {
                Some(value) => {
                    values.insert(field.clone(), value);
                }
                None => {
                    values.remove(field);
                }
            }
        }
        values
    }

    /// Slug of the first preset `current` is exactly equal to.
    #[must_use]
    pub fn matches(&self, current: &NormalizedValues) -> Option<&'a str> {
        self.matches_among(self.presets(), current)
            .map(|preset| preset.slug.as_str())
    }

    /// First preset of `presets` that `current` is exactly equal to.
    ///
    /// Fields outside the preset must be inactive, noop, reserved, or at their
    /// initial value.
    pub fn matches_among<I>(&self, presets: I, current: &NormalizedValues) -> Option<&'a PresetDefinition>
    where
        I: IntoIterator<Item = &'a PresetDefinition>,
    {
        presets.into_iter().find(|preset| self.is_exactly(preset, current))
    }

    fn is_exactly(&self, preset: &PresetDefinition, current: &NormalizedValues) -> bool {
        let own_fields_match = preset.field_values.iter().all(|(field, value)| {
            let expected = self.normalized(field, value).map(|v| v.canonical());
            let actual = current.get(field).map(FilterValue::canonical);
            expected == actual
        });
        if !own_fields_match {
            return false;
        }

        current.iter().all(|(field, value)| {
            if preset.field_values.contains_key(field) || RESERVED_PARAMETERS.contains(&field) {
                return true;
            }
            match self.entity.field(field) {
                None => true,
                Some(spec) if spec.noop => true,
                Some(spec) => spec
                    .initial
                    .as_ref()
                    .is_some_and(|initial| initial.canonical() == value.canonical()),
            }
        })
    }
}
