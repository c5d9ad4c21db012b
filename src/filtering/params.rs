use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Page number, consumed by the paginator.
pub const PAGE_PARAM: &str = "page";
/// Lower bound (exclusive) on the update timestamp, as Unix seconds.
pub const SINCE_PARAM: &str = "since";
/// Upper bound (exclusive) on the update timestamp, as Unix seconds.
pub const UNTIL_PARAM: &str = "until";
/// Field to sort by.
pub const ORDER_BY_PARAM: &str = "orderBy";
/// `ASC` or `DESC`, applies to `orderBy`.
pub const ORDER_BY_SORT_PARAM: &str = "orderBySort";

/// Keys that never become field filters.
pub const RESERVED_PARAMS: [&str; 5] = [
    PAGE_PARAM,
    SINCE_PARAM,
    UNTIL_PARAM,
    ORDER_BY_PARAM,
    ORDER_BY_SORT_PARAM,
];

/// Suffix on a filter key that negates the comparison.
pub const NEGATION_SUFFIX: char = '!';

/// One incoming filter, e.g. `status!=done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterParam {
    pub key: String,
    pub raw_value: String,
    pub negated: bool,
}

impl FilterParam {
    #[must_use]
    pub fn parse(key: &str, value: &str) -> Self {
        let (key, negated) = match key.strip_suffix(NEGATION_SUFFIX) {
            Some(stripped) => (stripped, true),
            None => (key, false),
        };

        Self {
            key: key.to_string(),
            raw_value: value.to_string(),
            negated,
        }
    }

    /// Blank values are ignored by the filter builder.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.raw_value.trim().is_empty()
    }
}

#[must_use]
pub fn is_reserved(key: &str) -> bool {
    RESERVED_PARAMS.contains(&key)
}

/// Merge caller-supplied filters over the request's query parameters.
///
/// An extra filter with the same key replaces the query value in place;
/// new keys are appended in the order given.
#[must_use]
pub fn merge_params(query: &[(String, String)], extra: &[(String, String)]) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = Vec::with_capacity(query.len() + extra.len());

    for (key, value) in query.iter().chain(extra) {
        if let Some(existing) = merged.iter_mut().find(|(k, _)| k == key) {
            existing.1.clone_from(value);
        } else {
            merged.push((key.clone(), value.clone()));
        }
    }

    merged
}

/// Look up a parameter by key (last occurrence wins).
#[must_use]
pub fn param_value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Reserved query parameters understood by every list endpoint.
///
/// Any other query key is treated as a field filter:
/// - `name=foo` matches records whose `name` contains `foo`
/// - `priority=3,4` matches records whose `priority` is 3 or 4
/// - `status!=done` matches records whose `status` is not `done`
/// - `owner_name=alice` filters on the `name` column of the joined `owner` relation
///
/// Used for OpenAPI parameter docs only; handlers read the raw query pairs.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 1-based page number. Invalid or missing values select page 1.
    #[param(example = "1")]
    pub page: Option<String>,
    /// Only records updated after this Unix timestamp.
    #[param(example = "1000000000")]
    pub since: Option<String>,
    /// Only records updated before this Unix timestamp.
    #[param(example = "2000000000")]
    pub until: Option<String>,
    /// Field to sort by; ignored when the field doesn't exist.
    #[serde(rename = "orderBy")]
    #[param(example = "name")]
    pub order_by: Option<String>,
    /// `ASC` (default) or `DESC`.
    #[serde(rename = "orderBySort")]
    #[param(example = "DESC")]
    pub order_by_sort: Option<String>,
}
