//! Fixed-size pagination and navigation links.
//!
//! Pages are 1-based. A page past the end is not an error: it is returned
//! empty with the correct total so clients can still navigate back.

use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::API_PAGE_SIZE;
use crate::filtering::FilterQuery;
use crate::filtering::params::PAGE_PARAM;
use crate::routing::{RequestContext, UrlGenerator};
use crate::source::QuerySource;

/// One window of query results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub page_number: u64,
    pub page_size: u64,
    pub total_count: u64,
    pub records: Vec<T>,
}

impl<T> Page<T> {
    /// Index of the first record of this page in the full result.
    #[must_use]
    pub fn offset(&self) -> u64 {
        page_offset(self.page_number, self.page_size)
    }

    /// Number of pages, at least 1 even for an empty result.
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.total_count.div_ceil(self.page_size.max(1)).max(1)
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page_number.saturating_mul(self.page_size) < self.total_count
    }

    /// Convert the records, keeping the page position.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            page_number: self.page_number,
            page_size: self.page_size,
            total_count: self.total_count,
            records: self.records.into_iter().map(f).collect(),
        }
    }
}

fn page_offset(page_number: u64, page_size: u64) -> u64 {
    page_number.saturating_sub(1).saturating_mul(page_size)
}

/// The `page` query value, 1 when missing or not a positive integer.
#[must_use]
pub fn parse_page_number(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|page| *page >= 1)
        .unwrap_or(1)
}

/// Runs a [`FilterQuery`] against a source one page at a time.
pub struct Paginator<'s, S: QuerySource + ?Sized> {
    source: &'s S,
    page_size: u64,
}

impl<'s, S: QuerySource + ?Sized> Paginator<'s, S> {
    pub fn new(source: &'s S) -> Self {
        Self {
            source,
            page_size: API_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Count the matching records and fetch the requested page.
    ///
    /// # Errors
    ///
    /// Returns the data source's error when counting or fetching fails.
    pub async fn paginate(&self, query: &FilterQuery, page_number: u64) -> Result<Page<S::Record>, DbErr> {
        let page_number = page_number.max(1);
        let total_count = self.source.count(query).await?;
        let offset = page_offset(page_number, self.page_size);

        let records = if offset >= total_count {
            Vec::new()
        } else {
            self.source.fetch(query, offset, self.page_size).await?
        };

        Ok(Page {
            page_number,
            page_size: self.page_size,
            total_count,
            records,
        })
    }
}

/// `_links` of a list response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NavigationLinks {
    #[serde(rename = "self", skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

impl NavigationLinks {
    /// Paging links for `page`, empty when everything fits on one page.
    ///
    /// Each link is the current request's URL with `page` replaced. A link
    /// that can't be generated is left out.
    pub fn for_page<T, G: UrlGenerator + ?Sized>(page: &Page<T>, context: &RequestContext, router: &G) -> Self {
        let mut links = Self::default();
        if page.total_count <= page.page_size {
            return links;
        }

        let link = |number: u64| -> Option<String> {
            let overrides = [(PAGE_PARAM.to_string(), number.to_string())];
            match context.url_with(router, &overrides) {
                Ok(url) => Some(url),
                Err(error) => {
                    tracing::warn!(page = number, error = %error, "Failed to generate paging link");
                    None
                }
            }
        };

        if page.has_previous() {
            links.first = link(1);
            links.prev = link(page.page_number - 1);
        }
        if page.has_next() {
            links.next = link(page.page_number + 1);
        }
        links.last = link(page.total_pages());
        links
    }

    /// Set a link by name; unknown names are ignored and reported as `false`.
    pub fn set(&mut self, name: &str, href: String) -> bool {
        let slot = match name {
            "self" => &mut self.self_link,
            "first" => &mut self.first,
            "prev" => &mut self.prev,
            "next" => &mut self.next,
            "last" => &mut self.last,
            _ => return false,
        };
        *slot = Some(href);
        true
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.self_link.is_none()
            && self.first.is_none()
            && self.prev.is_none()
            && self.next.is_none()
            && self.last.is_none()
    }
}
