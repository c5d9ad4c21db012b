pub mod bulk;
pub mod config;
pub mod errors;
pub mod filtering;
pub mod links;
pub mod pagination;
pub mod response;
pub mod routes;
pub mod routing;
pub mod source;
pub mod traits;

pub use config::ApiConfig;
pub use errors::{ApiError, ErrorDescriptor};
pub use filtering::{FieldTable, FilterQuery, QueryFilterBuilder};
pub use links::{LinkModel, LinkedRecord, Relation};
pub use pagination::{NavigationLinks, Page, Paginator};
pub use response::ResponseEnvelope;
pub use routes::{ApiState, resource_routes};
pub use routing::{RouteTable, UrlGenerator};
pub use serde_with;
pub use source::{EntitySource, QuerySource};
pub use traits::{ApiMethod, ApiResource, MergeIntoActiveModel, UpdateMode};
