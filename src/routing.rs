//! Named routes and absolute URL generation.
//!
//! Links in responses are never hard-coded: they are generated from a route
//! name and a parameter list. Parameters that fill a `{placeholder}` in the
//! route's template go into the path, the rest become the query string.
//!
//! ```rust,ignore
//! let routes = RouteTable::new("https://api.example.com")?
//!     .register_resource("Item", "/items");
//!
//! let url = routes.generate("api_item_getsinglerecord", &[("recordId".into(), "7".into())])?;
//! assert_eq!(url, "https://api.example.com/items/7");
//! ```

use axum::http::Uri;
use std::fmt;
use url::Url;

use crate::config::ApiConfig;
use crate::links::{list_route_name, single_route_name};

/// Placeholder every single-record route uses for the record's identity.
pub const RECORD_ID_PARAM: &str = "recordId";

/// Route matched for an incoming path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub route_name: String,
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Base URL cannot carry a path
    InvalidBaseUrl(String),
    /// No route registered under this name
    UnknownRoute(String),
    /// Template placeholder without a value
    MissingParameter { route: String, param: String },
    /// Path matches no registered route
    NoMatch(String),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBaseUrl(url) => write!(f, "invalid base url '{url}'"),
            Self::UnknownRoute(name) => write!(f, "unknown route '{name}'"),
            Self::MissingParameter { route, param } => {
                write!(f, "route '{route}' requires parameter '{param}'")
            }
            Self::NoMatch(path) => write!(f, "no route matches '{path}'"),
        }
    }
}

impl std::error::Error for RouteError {}

impl From<RouteError> for crate::errors::ApiError {
    fn from(err: RouteError) -> Self {
        Self::internal("Failed to generate link", Some(err.to_string()))
    }
}

/// Link generation and reverse routing.
pub trait UrlGenerator: Send + Sync {
    /// Absolute URL for a named route.
    ///
    /// # Errors
    ///
    /// Fails when the route is unknown or a path placeholder has no value.
    fn generate(&self, route_name: &str, params: &[(String, String)]) -> Result<String, RouteError>;

    /// Route and path parameters for a request path.
    fn match_path(&self, path: &str) -> Option<RouteMatch>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct Route {
    name: String,
    segments: Vec<Segment>,
}

impl Route {
    fn parse(name: &str, template: &str) -> Self {
        let segments = split_path(template)
            .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(param) => Segment::Param(param.to_string()),
                None => Segment::Literal(segment.to_string()),
            })
            .collect();

        Self {
            name: name.to_string(),
            segments,
        }
    }

    fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => params.push((name.clone(), part.to_string())),
            }
        }
        Some(params)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// In-memory route registry.
#[derive(Debug, Clone)]
pub struct RouteTable {
    base: Url,
    routes: Vec<Route>,
}

impl RouteTable {
    /// Create a table generating links below `base_url`.
    ///
    /// # Errors
    ///
    /// Fails when `base_url` is not an absolute URL that can carry a path.
    pub fn new(base_url: &str) -> Result<Self, RouteError> {
        let base = Url::parse(base_url).map_err(|_| RouteError::InvalidBaseUrl(base_url.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(RouteError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self {
            base,
            routes: Vec::new(),
        })
    }

    /// Create a table generating links below the configured base URL.
    ///
    /// # Errors
    ///
    /// Fails when `config.base_url` is not a valid base URL.
    pub fn from_config(config: &ApiConfig) -> Result<Self, RouteError> {
        Self::new(&config.base_url)
    }

    /// Register a named route; `{name}` segments are placeholders.
    #[must_use]
    pub fn register(mut self, name: &str, template: &str) -> Self {
        self.routes.retain(|route| route.name != name);
        self.routes.push(Route::parse(name, template));
        self
    }

    /// Register the list and single-record routes of an entity.
    ///
    /// `register_resource("Item", "/items")` adds `api_item_getlist` for
    /// `/items` and `api_item_getsinglerecord` for `/items/{recordId}`.
    #[must_use]
    pub fn register_resource(self, entity: &str, base_path: &str) -> Self {
        let base_path = base_path.trim_end_matches('/');
        let single = format!("{base_path}/{{{RECORD_ID_PARAM}}}");
        self.register(&list_route_name(entity), base_path)
            .register(&single_route_name(entity), &single)
    }

    #[must_use]
    pub fn has_route(&self, name: &str) -> bool {
        self.routes.iter().any(|route| route.name == name)
    }
}

impl UrlGenerator for RouteTable {
    fn generate(&self, route_name: &str, params: &[(String, String)]) -> Result<String, RouteError> {
        let route = self
            .routes
            .iter()
            .find(|route| route.name == route_name)
            .ok_or_else(|| RouteError::UnknownRoute(route_name.to_string()))?;

        let mut path: Vec<&str> = Vec::with_capacity(route.segments.len());
        let mut used: Vec<&str> = Vec::new();
        for segment in &route.segments {
            match segment {
                Segment::Literal(literal) => path.push(literal),
                Segment::Param(name) => {
                    let value = params
                        .iter()
                        .rev()
                        .find(|(key, _)| key == name)
                        .map(|(_, value)| value.as_str())
                        .ok_or_else(|| RouteError::MissingParameter {
                            route: route_name.to_string(),
                            param: name.clone(),
                        })?;
                    path.push(value);
                    used.push(name);
                }
            }
        }

        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| RouteError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(path);

        let query: Vec<&(String, String)> = params
            .iter()
            .filter(|(key, _)| !used.contains(&key.as_str()))
            .collect();
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url.into())
    }

    fn match_path(&self, path: &str) -> Option<RouteMatch> {
        self.routes.iter().find_map(|route| {
            route.matches(path).map(|params| RouteMatch {
                route_name: route.name.clone(),
                params,
            })
        })
    }
}

/// Path and query of the request being answered, used to rebuild links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, query: Vec<(String, String)>) -> Self {
        Self {
            path: path.into(),
            query,
        }
    }

    /// Split a request URI into its path and decoded query pairs.
    #[must_use]
    pub fn from_uri(uri: &Uri) -> Self {
        let query = uri
            .query()
            .map(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .map(|(key, value)| (key.into_owned(), value.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            path: uri.path().to_string(),
            query,
        }
    }

    /// URL of the current route with the current query, `overrides` replacing same-named keys.
    ///
    /// # Errors
    ///
    /// Fails when the request path matches no registered route.
    pub fn url_with<G: UrlGenerator + ?Sized>(
        &self,
        router: &G,
        overrides: &[(String, String)],
    ) -> Result<String, RouteError> {
        let matched = router
            .match_path(&self.path)
            .ok_or_else(|| RouteError::NoMatch(self.path.clone()))?;

        let mut params = matched.params;
        for (key, value) in self.query.iter().chain(overrides) {
            if let Some(existing) = params.iter_mut().find(|(k, _)| k == key) {
                existing.1.clone_from(value);
            } else {
                params.push((key.clone(), value.clone()));
            }
        }

        router.generate(&matched.route_name, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routes() -> RouteTable {
        RouteTable::new("https://api.example.com")
            .unwrap()
            .register_resource("Item", "/items")
            .register("api_owner_items", "/owners/{ownerId}/items")
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_generate_single_record() {
        let url = routes()
            .generate("api_item_getsinglerecord", &pairs(&[("recordId", "7")]))
            .unwrap();
        assert_eq!(url, "https://api.example.com/items/7");
    }

    #[test]
    fn test_extra_params_become_query() {
        let url = routes()
            .generate("api_item_getlist", &pairs(&[("name", "foo bar"), ("page", "2")]))
            .unwrap();
        assert_eq!(url, "https://api.example.com/items?name=foo+bar&page=2");
    }

    #[test]
    fn test_missing_placeholder() {
        let err = routes().generate("api_item_getsinglerecord", &[]).unwrap_err();
        assert!(matches!(err, RouteError::MissingParameter { .. }));
    }

    #[test]
    fn test_unknown_route() {
        let err = routes().generate("api_nothing_getlist", &[]).unwrap_err();
        assert_eq!(err, RouteError::UnknownRoute("api_nothing_getlist".into()));
    }

    #[test]
    fn test_base_path_prefix_is_kept() {
        let routes = RouteTable::new("https://example.com/api/v1/")
            .unwrap()
            .register_resource("Item", "/items");
        let url = routes.generate("api_item_getlist", &[]).unwrap();
        assert_eq!(url, "https://example.com/api/v1/items");
    }

    #[test]
    fn test_match_path() {
        let matched = routes().match_path("/owners/3/items").unwrap();
        assert_eq!(matched.route_name, "api_owner_items");
        assert_eq!(matched.params, pairs(&[("ownerId", "3")]));

        assert_eq!(routes().match_path("/items/").unwrap().route_name, "api_item_getlist");
        assert!(routes().match_path("/nowhere").is_none());
    }

    #[test]
    fn test_request_context_from_uri() {
        let uri: Uri = "/items?name=a%20b&page=2".parse().unwrap();
        let context = RequestContext::from_uri(&uri);
        assert_eq!(context.path, "/items");
        assert_eq!(context.query, pairs(&[("name", "a b"), ("page", "2")]));
    }

    #[test]
    fn test_url_with_overrides_page() {
        let context = RequestContext::new("/owners/3/items", pairs(&[("page", "1"), ("name", "x")]));
        let url = context
            .url_with(&routes(), &pairs(&[("page", "4")]))
            .unwrap();
        assert_eq!(url, "https://api.example.com/owners/3/items?page=4&name=x");
    }

    #[test]
    fn test_from_config() {
        let config = ApiConfig::default().with_base_url("https://api.example.com/v2");
        let routes = RouteTable::from_config(&config)
            .unwrap()
            .register_resource("Item", "/items");
        let url = routes.generate("api_item_getlist", &[]).unwrap();
        assert_eq!(url, "https://api.example.com/v2/items");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(RouteTable::new("not a url").is_err());
        assert!(RouteTable::new("mailto:someone@example.com").is_err());
    }
}
