//! Hypermedia links for individual records.
//!
//! A record declares its entity name, its identity and the related data it
//! wants linked. [`LinkModel`] wraps it for transport and resolves the
//! links through a [`UrlGenerator`] using the route naming convention
//! `api_<entity>_getsinglerecord` / `api_<entity>_getlist`.

use serde::{Serialize, Serializer};
use serde_with::{Map, serde_as};

use crate::routing::{RECORD_ID_PARAM, UrlGenerator};

/// Route name prefix shared by every resource.
#[must_use]
pub fn base_route_name(entity: &str) -> String {
    format!("api_{}", entity.to_lowercase())
}

#[must_use]
pub fn single_route_name(entity: &str) -> String {
    format!("{}_getsinglerecord", base_route_name(entity))
}

#[must_use]
pub fn list_route_name(entity: &str) -> String {
    format!("{}_getlist", base_route_name(entity))
}

/// A record that can be addressed through the API.
pub trait LinkedRecord {
    /// Short type name the routes are derived from, e.g. `Item`.
    fn entity_name(&self) -> &str;

    /// Persisted identifier, `None` before the record is stored.
    fn record_id(&self) -> Option<String>;

    /// Route parameters locating this record.
    fn route_params(&self) -> Vec<(String, String)> {
        self.record_id()
            .map(|id| vec![(RECORD_ID_PARAM.to_string(), id)])
            .unwrap_or_default()
    }

    /// Related data to link, in output order.
    fn relations(&self) -> Vec<Relation> {
        Vec::new()
    }
}

/// Entity and route parameters of a linked record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub entity: String,
    pub params: Vec<(String, String)>,
}

impl LinkTarget {
    pub fn of<R: LinkedRecord + ?Sized>(record: &R) -> Self {
        Self {
            entity: record.entity_name().to_string(),
            params: record.route_params(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RelationData {
    Single(Option<LinkTarget>),
    List(Vec<LinkTarget>),
}

/// Related data declared by a record, stored under `reference` in `_links`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub reference: String,
    data: RelationData,
}

impl Relation {
    /// To-one relation; `None` when nothing is related.
    pub fn single<R: LinkedRecord>(reference: impl Into<String>, related: Option<&R>) -> Self {
        Self {
            reference: reference.into(),
            data: RelationData::Single(related.map(LinkTarget::of)),
        }
    }

    /// To-many relation.
    pub fn list<'r, R: LinkedRecord + 'r>(
        reference: impl Into<String>,
        related: impl IntoIterator<Item = &'r R>,
    ) -> Self {
        Self {
            reference: reference.into(),
            data: RelationData::List(related.into_iter().map(LinkTarget::of).collect()),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.data {
            RelationData::Single(target) => target.is_none(),
            RelationData::List(targets) => targets.is_empty(),
        }
    }

    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self.data, RelationData::List(_))
    }

    /// The related record routes are generated from: the single target or the first element.
    #[must_use]
    pub fn representative(&self) -> Option<&LinkTarget> {
        match &self.data {
            RelationData::Single(target) => target.as_ref(),
            RelationData::List(targets) => targets.first(),
        }
    }
}

/// Named links in insertion order, serialized as a JSON object.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Links(#[serde_as(as = "Map<_, _>")] Vec<(String, String)>);

impl Links {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a link, replacing an existing one of the same name.
    pub fn insert(&mut self, name: impl Into<String>, href: impl Into<String>) {
        let name = name.into();
        let href = href.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = href,
            None => self.0.push((name, href)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, href)| href.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }
}

/// A record prepared for transport: its own fields plus `_links`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkModel<T> {
    pub record: T,
    pub links: Links,
}

impl<T> LinkModel<T> {
    pub fn new(record: T) -> Self {
        Self {
            record,
            links: Links::new(),
        }
    }

    pub fn into_inner(self) -> T {
        self.record
    }
}

impl<T: LinkedRecord> LinkModel<T> {
    /// Resolve `self` and relation links.
    ///
    /// `self` is only added for persisted records. Empty relations are
    /// skipped; list relations link to the related entity's list route, the
    /// others to its single-record route. Links that can't be generated are
    /// left out.
    pub fn apply_relation_links<G: UrlGenerator + ?Sized>(&mut self, router: &G) {
        if self.record.record_id().is_some() {
            let target = LinkTarget::of(&self.record);
            if let Some(href) = generate(router, &single_route_name(&target.entity), &target.params) {
                self.links.insert("self", href);
            }
        }

        for relation in self.record.relations() {
            let Some(target) = relation.representative() else {
                continue;
            };

            let href = if relation.is_list() {
                let params: Vec<(String, String)> = target
                    .params
                    .iter()
                    .filter(|(key, _)| key != RECORD_ID_PARAM)
                    .cloned()
                    .collect();
                generate(router, &list_route_name(&target.entity), &params)
            } else {
                generate(router, &single_route_name(&target.entity), &target.params)
            };

            if let Some(href) = href {
                self.links.insert(relation.reference, href);
            }
        }
    }

    /// Wrap a record and resolve its links in one step.
    pub fn linked<G: UrlGenerator + ?Sized>(record: T, router: &G) -> Self {
        let mut model = Self::new(record);
        model.apply_relation_links(router);
        model
    }
}

fn generate<G: UrlGenerator + ?Sized>(router: &G, route: &str, params: &[(String, String)]) -> Option<String> {
    router
        .generate(route, params)
        .map_err(|error| tracing::warn!(route, error = %error, "Failed to generate record link"))
        .ok()
}

impl<T: Serialize> Serialize for LinkModel<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Flattened<'a, T> {
            #[serde(flatten)]
            record: &'a T,
            #[serde(rename = "_links")]
            links: &'a Links,
        }

        Flattened {
            record: &self.record,
            links: &self.links,
        }
        .serialize(serializer)
    }
}
