use serde::Serialize;
use utoipa::{IntoParams, ToSchema};

use crate::filtering::pagination::Page;
use crate::filtering::params::{QueryParams, parse_checkbox};
use crate::filtering::presets::PresetDefinition;

/// Query parameters that steer the list itself and are never filter fields.
pub const RESERVED_PARAMETERS: &[&str] = &[
    "ordering",
    "reverse_order",
    "page",
    "page_size",
    "view",
    "ids",
    "language",
];

/// Reserved list parameters.
///
/// Every other query parameter is read as a filter field of the listed entity.
/// Multi-valued filters accept repeated keys (`tags=a&tags=b`) or a single
/// comma-separated value (`tags=a,b`).
#[derive(Debug, Clone, Default, PartialEq, Eq, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Comma-separated sort keys, `-` prefix for descending.
    ///
    /// Example: `level,-id`
    #[param(example = "level,-id")]
    pub ordering: Option<String>,
    /// Flip every sort key.
    ///
    /// A bare `?ordering=` link is always reversed. `None` keeps the entity's
    /// default direction.
    pub reverse_order: Option<bool>,
    /// Page number (1-based).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page, capped by the server.
    #[param(example = 12)]
    pub page_size: Option<u64>,
    /// Alternative view of the list; does not filter.
    pub view: Option<String>,
    /// Comma-separated ids to restrict the list to.
    #[param(example = "1,2,3")]
    pub ids: Option<String>,
    /// Language for translated search.
    #[param(example = "ja")]
    pub language: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_number(name: &str, value: Option<&str>) -> Option<u64> {
    let raw = value.map(str::trim).filter(|raw| !raw.is_empty())?;
    match raw.parse() {
        Ok(number) => Some(number),
        Err(_) => {
            tracing::debug!(parameter = name, value = %raw, "Ignoring malformed list parameter");
            None
        }
    }
}

impl ListParams {
    /// Read the reserved parameters out of a raw query.
    #[must_use]
    pub fn from_query(params: &QueryParams) -> Self {
        let ordering = non_empty(params.get_last("ordering"));
        let reverse_order = match params.get_last("reverse_order") {
            Some(raw) => Some(parse_checkbox(raw.trim()).unwrap_or(!raw.trim().is_empty())),
            None if ordering.is_some() && params.len() == 1 => Some(true),
            None => Some(false),
        };
        Self {
            ordering,
            reverse_order,
            page: parse_number("page", params.get_last("page")).filter(|page| *page > 0),
            page_size: parse_number("page_size", params.get_last("page_size")),
            view: non_empty(params.get_last("view")),
            ids: non_empty(params.get_last("ids")),
            language: non_empty(params.get_last("language")),
        }
    }

    /// 0-based page index.
    #[must_use]
    pub fn page_index(&self) -> u64 {
        self.page.unwrap_or(1).saturating_sub(1)
    }
}

/// A preset as shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PresetSummary {
    pub slug: String,
    pub label: Option<String>,
    pub icon: Option<String>,
    pub image: Option<String>,
}

impl From<&PresetDefinition> for PresetSummary {
    fn from(preset: &PresetDefinition) -> Self {
        Self {
            slug: preset.slug.clone(),
            label: preset.label.clone(),
            icon: preset.icon.clone(),
            image: preset.image.clone(),
        }
    }
}

/// Everything about a list response except the items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageMeta {
    pub total_results: u64,
    pub total_pages: u64,
    /// 1-based page number
    pub page: u64,
    pub page_size: u64,
    pub is_last_page: bool,
    /// Resolved sort keys, reverse applied
    pub ordering: Vec<String>,
    pub reverse_order: bool,
    pub is_default_ordering: bool,
    /// Fields to annotate on each item when the ordering is not the default
    pub relevant_fields: Vec<String>,
    /// One flag per item, empty when group headers are off
    pub group_headers: Vec<bool>,
    pub active_filters: usize,
    /// Slug of the preset whose values were applied
    pub preset: Option<String>,
    /// Preset this filter state is exactly equal to
    pub canonical_preset: Option<String>,
    pub presets: Vec<PresetSummary>,
    pub search_help_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> ListResponse<T> {
    pub fn new(page: Page<T>, meta: PageMeta) -> Self {
        Self {
            items: page.items,
            meta,
        }
    }
}
