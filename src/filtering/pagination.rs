use axum::http::header::HeaderMap;
use sea_orm::DbErr;
use serde::Serialize;

use crate::store::{CompiledQuery, DataStore};

/// Group key of an item; `None` items never get a header.
pub type GroupKeyFn<T> = dyn Fn(&T) -> Option<String> + Send + Sync;

/// Which window of the ordered query to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 0-based
    pub index: u64,
    pub size: u64,
    /// Items per grid row
    pub per_line: u64,
    pub show_group_headers: bool,
    /// No filter is active and the ordering is the default one
    pub default_filters: bool,
}

impl PageRequest {
    #[must_use]
    pub const fn new(index: u64, size: u64) -> Self {
        Self {
            index,
            size,
            per_line: 1,
            show_group_headers: false,
            default_filters: true,
        }
    }

    /// Page size actually used: rounded up to a whole number of grid rows
    /// unless group headers are shown or the filter state is not the default.
    #[must_use]
    pub fn effective_size(&self) -> u64 {
        let size = self.size.max(1);
        if self.show_group_headers || !self.default_filters || self.per_line <= 1 {
            return size;
        }
        size.div_ceil(self.per_line) * self.per_line
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.index.saturating_mul(self.effective_size())
    }
}

/// `ceil(total / size)`, 0 for an empty result.
#[must_use]
pub fn total_pages(total_results: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_results.div_ceil(page_size)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_results: u64,
    pub total_pages: u64,
    pub page_index: u64,
    pub page_size: u64,
    pub is_last_page: bool,
    /// One flag per item when group headers are shown, empty otherwise
    pub group_headers: Vec<bool>,
}

impl<T> Page<T> {
    /// Offset of the first item in the unsliced query.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.page_index.saturating_mul(self.page_size)
    }

    /// Apply `f` to every item, keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_results: self.total_results,
            total_pages: self.total_pages,
            page_index: self.page_index,
            page_size: self.page_size,
            is_last_page: self.is_last_page,
            group_headers: self.group_headers,
        }
    }
}

/// Header flags for `items`. `boundary` is the group key of the row just
/// before the window, `None` on the first page.
pub fn group_header_flags<T>(
    items: &[T],
    boundary: Option<Option<String>>,
    group_key: &GroupKeyFn<T>,
) -> Vec<bool> {
    let mut previous = boundary;
    items
        .iter()
        .map(|item| {
            let key = group_key(item);
            let header = key.is_some() && previous.as_ref() != Some(&key);
            previous = Some(key);
            header
        })
        .collect()
}

/// Count once, fetch the window, and compute group headers across the page
/// boundary with a single extra one-row fetch.
///
/// # Errors
///
/// Returns the store's `DbErr` unchanged.
pub async fn paginate<S>(
    store: &S,
    query: &CompiledQuery,
    request: &PageRequest,
    group_key: Option<&GroupKeyFn<S::Item>>,
) -> Result<Page<S::Item>, DbErr>
where
    S: DataStore + ?Sized,
{
    let page_size = request.effective_size();
    let offset = request.offset();
    let total_results = store.count(query).await?;

    let items = if offset < total_results {
        store.fetch(query, offset, page_size).await?
    } else {
        tracing::debug!(page = request.index, total_results, "Requested page is past the last result");
        Vec::new()
    };

    let group_headers = match group_key {
        Some(group_key) if request.show_group_headers => {
            let boundary = if request.index > 0 && !items.is_empty() {
                let previous = store.fetch(query, offset - 1, 1).await?;
                Some(previous.first().and_then(|item| group_key(item)))
            } else {
                None
            };
            group_header_flags(&items, boundary, group_key)
        }
        _ => Vec::new(),
    };

    let total_pages = total_pages(total_results, page_size);
    Ok(Page {
        items,
        total_results,
        total_pages,
        page_index: request.index,
        page_size,
        is_last_page: request.index.saturating_add(1) >= total_pages,
        group_headers,
    })
}

/// Sanitize resource name by removing control characters for HTTP headers
fn sanitize_resource_name(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii() && !c.is_ascii_control()).collect()
}

/// Build the `Content-Range` header for a page.
///
/// `items 24-35/100` for a non-empty window, `items */100` otherwise. Control
/// characters are stripped from the resource name.
#[must_use]
pub fn calculate_content_range(
    offset: u64,
    returned: u64,
    total_count: u64,
    resource_name: &str,
) -> HeaderMap {
    let safe_name = sanitize_resource_name(resource_name);
    let safe_name = if safe_name.trim().is_empty() {
        "items".to_string()
    } else {
        safe_name
    };

    let content_range = if returned == 0 {
        format!("{safe_name} */{total_count}")
    } else {
        let last = offset + returned - 1;
        format!("{safe_name} {offset}-{last}/{total_count}")
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = content_range.parse() {
        headers.insert("Content-Range", value);
    }
    headers
}
