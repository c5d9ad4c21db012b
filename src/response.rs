use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::errors::ErrorDescriptor;
use crate::links::{LinkModel, LinkedRecord};
use crate::pagination::{NavigationLinks, Page};
use crate::routing::UrlGenerator;

/// Body of every list-shaped response.
///
/// ```json
/// {"total": 600, "count": 250, "offset": 250, "_links": {...}, "records": [...], "errors": []}
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope<T> {
    pub total: u64,
    pub count: usize,
    pub offset: u64,
    #[serde(rename = "_links")]
    pub links: NavigationLinks,
    pub records: Vec<T>,
    pub errors: Vec<ErrorDescriptor>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T> Default for ResponseEnvelope<T> {
    fn default() -> Self {
        Self {
            total: 0,
            count: 0,
            offset: 0,
            links: NavigationLinks::default(),
            records: Vec::new(),
            errors: Vec::new(),
            status: StatusCode::OK,
        }
    }
}

impl<T> ResponseEnvelope<T> {
    /// Envelope for a page of records, without links.
    pub fn from_page(page: Page<T>) -> Self {
        let offset = page.offset();
        let mut envelope = Self {
            total: page.total_count,
            offset,
            ..Self::default()
        };
        envelope.set_records(page.records);
        envelope
    }

    /// Envelope around records that are not part of a paginated query.
    pub fn from_records(records: Vec<T>) -> Self {
        let mut envelope = Self {
            total: records.len() as u64,
            ..Self::default()
        };
        envelope.set_records(records);
        envelope
    }

    /// Replace the records, keeping `count` in step.
    pub fn set_records(&mut self, records: Vec<T>) {
        self.count = records.len();
        self.records = records;
    }

    #[must_use]
    pub fn with_links(mut self, links: NavigationLinks) -> Self {
        self.links = links;
        self
    }

    /// Set one envelope link; names other than `self`, `first`, `prev`, `next` and `last` are ignored.
    pub fn add_link(&mut self, name: &str, href: impl Into<String>) {
        if !self.links.set(name, href.into()) {
            tracing::debug!(name, "Ignoring unknown envelope link");
        }
    }

    pub fn add_error(&mut self, error: impl Into<ErrorDescriptor>) {
        self.errors.push(error.into());
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Convert the records, recomputing `count`.
    pub fn map_records<U>(self, f: impl FnMut(T) -> U) -> ResponseEnvelope<U> {
        let records: Vec<U> = self.records.into_iter().map(f).collect();
        ResponseEnvelope {
            total: self.total,
            count: records.len(),
            offset: self.offset,
            links: self.links,
            records,
            errors: self.errors,
            status: self.status,
        }
    }
}

impl<T: LinkedRecord> ResponseEnvelope<T> {
    /// Wrap each record in a [`LinkModel`] with its links resolved.
    pub fn apply_models<G: UrlGenerator + ?Sized>(self, router: &G) -> ResponseEnvelope<LinkModel<T>> {
        self.map_records(|record| LinkModel::linked(record, router))
    }
}

impl<T: Serialize> IntoResponse for ResponseEnvelope<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
