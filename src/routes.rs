use axum::{
    Json, Router,
    body::Bytes,
    extract::{OriginalUri, Path, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header::LOCATION},
    routing::{get, post},
};
use sea_orm::{DatabaseConnection, DbErr};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::bulk::{BulkPayload, BulkReport};
use crate::config::ApiConfig;
use crate::errors::ApiError;
use crate::filtering::QueryFilterBuilder;
use crate::filtering::params::{PAGE_PARAM, param_value};
use crate::links::LinkModel;
use crate::pagination::{NavigationLinks, parse_page_number};
use crate::response::ResponseEnvelope;
use crate::routing::{RECORD_ID_PARAM, RequestContext, RouteTable};
use crate::traits::{ApiMethod, ApiResource, UpdateMode};

/// Path segment the bulk create endpoint is mounted under.
pub const BULK_PATH: &str = "_bulk";

/// Shared handler state: database, link router and settings.
#[derive(Clone)]
pub struct ApiState {
    pub db: DatabaseConnection,
    pub router: Arc<RouteTable>,
    pub config: Arc<ApiConfig>,
}

impl ApiState {
    pub fn new(db: DatabaseConnection, router: RouteTable, config: ApiConfig) -> Self {
        Self {
            db,
            router: Arc::new(router),
            config: Arc::new(config),
        }
    }
}

/// Axum routes for one resource mounted at `base_path`.
///
/// | Method | Path | Handler |
/// |---|---|---|
/// | GET | `base_path` | [`get_list`] |
/// | POST | `base_path` | [`create_one`] |
/// | POST | `base_path/_bulk` | [`create_bulk`] |
/// | GET | `base_path/{recordId}` | [`get_single`] |
/// | PUT, PATCH | `base_path/{recordId}` | [`update_one`] |
/// | DELETE | `base_path/{recordId}` | [`delete_one`] |
///
/// The same path has to be registered in the [`RouteTable`] with
/// [`RouteTable::register_resource`] for links to resolve.
pub fn resource_routes<R: ApiResource>(base_path: &str) -> Router<ApiState> {
    let base_path = base_path.trim_end_matches('/');
    Router::new()
        .route(base_path, get(get_list::<R>).post(create_one::<R>))
        .route(&format!("{base_path}/{BULK_PATH}"), post(create_bulk::<R>))
        .route(
            &format!("{base_path}/{{{RECORD_ID_PARAM}}}"),
            get(get_single::<R>)
                .put(update_one::<R>)
                .patch(update_one::<R>)
                .delete(delete_one::<R>),
        )
}

fn check_authorization<R: ApiResource>(method: ApiMethod, headers: &HeaderMap) -> Result<(), ApiError> {
    if R::authorize(method, headers) {
        Ok(())
    } else {
        tracing::warn!(api_method = %method, resource = R::RESOURCE_NAME, "Authorization check failed");
        Err(ApiError::not_authorized())
    }
}

fn parse_record_id<R: ApiResource>(record_id: &str) -> Result<i64, ApiError> {
    record_id
        .parse()
        .map_err(|_| ApiError::not_found(R::RESOURCE_NAME, Some(record_id.to_string())))
}

fn record_error<R: ApiResource>(err: DbErr, record_id: &str) -> ApiError {
    match err {
        DbErr::RecordNotFound(_) => ApiError::not_found(R::RESOURCE_NAME, Some(record_id.to_string())),
        err => ApiError::database(err),
    }
}

/// Decode a single-record body: malformed JSON is an `unexpected_value`,
/// JSON that doesn't fit the model is a validation error.
fn decode_record<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| ApiError::expected_valid_json())?;
    serde_json::from_value(value).map_err(|err| ApiError::validation_failed(vec![err.to_string()]))
}

fn rejected<R: ApiResource>(method: ApiMethod, messages: Vec<String>) -> ApiError {
    tracing::warn!(api_method = %method, resource = R::RESOURCE_NAME, errors = ?messages, "Validation failed");
    ApiError::validation_failed(messages)
}

/// Filtered, paginated list of records.
///
/// The query string is read as raw pairs so repeated keys never reject the
/// request; the last occurrence of a reserved key wins.
///
/// # Errors
///
/// Fails when the caller is not authorized or the database query fails.
pub async fn get_list<R: ApiResource>(
    State(state): State<ApiState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<ResponseEnvelope<LinkModel<R>>, ApiError> {
    tracing::info!(
        api_method = %ApiMethod::GetList,
        resource = R::RESOURCE_NAME,
        query = uri.query().unwrap_or_default(),
        "Start API request"
    );
    check_authorization::<R>(ApiMethod::GetList, &headers)?;

    let context = RequestContext::from_uri(&uri);
    let fields = R::field_table();
    let query = QueryFilterBuilder::new(&fields, &state.config.updated_at_field)
        .build(&context.query, &R::list_filters(&headers));
    let page_number = parse_page_number(param_value(&context.query, PAGE_PARAM));

    let page = R::get_page(&state.db, &query, page_number, state.config.page_size).await?;
    let links = NavigationLinks::for_page(&page, &context, state.router.as_ref());

    Ok(ResponseEnvelope::from_page(page)
        .with_links(links)
        .apply_models(state.router.as_ref()))
}

/// One record by id.
///
/// # Errors
///
/// Returns 404 when the id is not an integer or no record has it.
pub async fn get_single<R: ApiResource>(
    State(state): State<ApiState>,
    Path(record_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<LinkModel<R>>, ApiError> {
    tracing::info!(
        api_method = %ApiMethod::GetSingle,
        resource = R::RESOURCE_NAME,
        record_id = %record_id,
        "Start API request"
    );
    check_authorization::<R>(ApiMethod::GetSingle, &headers)?;

    let id = parse_record_id::<R>(&record_id)?;
    let record = R::get_one(&state.db, id)
        .await
        .map_err(|err| record_error::<R>(err, &record_id))?;

    Ok(Json(LinkModel::linked(record, state.router.as_ref())))
}

/// Create one record; the response carries its `Location`.
///
/// # Errors
///
/// Fails when the caller is not authorized, the body is not valid JSON for
/// the create model, validation rejects it or the insert fails.
pub async fn create_one<R: ApiResource>(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, HeaderMap, Json<LinkModel<R>>), ApiError> {
    tracing::info!(api_method = %ApiMethod::Create, resource = R::RESOURCE_NAME, "Start API request");
    check_authorization::<R>(ApiMethod::Create, &headers)?;

    let create_model: R::CreateModel = decode_record(&body)?;
    R::validate_record(&create_model, ApiMethod::Create)
        .map_err(|messages| rejected::<R>(ApiMethod::Create, messages))?;

    let record = R::create(&state.db, create_model, ApiMethod::Create)
        .await
        .map_err(ApiError::database)?;
    let model = LinkModel::linked(record, state.router.as_ref());

    let mut response_headers = HeaderMap::new();
    if let Some(location) = model.links.get("self").and_then(|href| HeaderValue::from_str(href).ok()) {
        response_headers.insert(LOCATION, location);
    }
    Ok((StatusCode::CREATED, response_headers, Json(model)))
}

/// Update one record. `PUT` replaces it, `PATCH` keeps the fields the body leaves out.
///
/// # Errors
///
/// Returns 404 for an unknown id, 400 for an invalid body or a rejected
/// update, 403 when the caller is not authorized.
pub async fn update_one<R: ApiResource>(
    State(state): State<ApiState>,
    Path(record_id): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<LinkModel<R>>, ApiError> {
    tracing::info!(
        api_method = %ApiMethod::Update,
        resource = R::RESOURCE_NAME,
        record_id = %record_id,
        "Start API request"
    );
    check_authorization::<R>(ApiMethod::Update, &headers)?;

    let id = parse_record_id::<R>(&record_id)?;
    let mode = if method == Method::PATCH {
        UpdateMode::Merge
    } else {
        UpdateMode::Replace
    };
    let update_model: R::UpdateModel = decode_record(&body)?;
    R::validate_update(&update_model, mode)
        .map_err(|messages| rejected::<R>(ApiMethod::Update, messages))?;

    let record = R::update(&state.db, id, update_model, mode)
        .await
        .map_err(|err| record_error::<R>(err, &record_id))?;

    Ok(Json(LinkModel::linked(record, state.router.as_ref())))
}

/// Delete one record; answers 202 with an empty body.
///
/// # Errors
///
/// Returns 404 for an unknown id, 403 when the caller is not authorized.
pub async fn delete_one<R: ApiResource>(
    State(state): State<ApiState>,
    Path(record_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    tracing::info!(
        api_method = %ApiMethod::Delete,
        resource = R::RESOURCE_NAME,
        record_id = %record_id,
        "Start API request"
    );
    check_authorization::<R>(ApiMethod::Delete, &headers)?;

    let id = parse_record_id::<R>(&record_id)?;
    R::delete(&state.db, id)
        .await
        .map_err(|err| record_error::<R>(err, &record_id))?;

    Ok(StatusCode::ACCEPTED)
}

/// Create every record of a JSON array.
///
/// Records that fail to decode, validate or insert are reported in the
/// envelope's `errors`; the created ones are returned as `records`.
///
/// # Errors
///
/// Fails as a whole when the caller is not authorized, the body is not a
/// JSON array within the size limit, or reading back the created records fails.
pub async fn create_bulk<R: ApiResource>(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ResponseEnvelope<LinkModel<R>>, ApiError> {
    tracing::info!(
        api_method = %ApiMethod::CreateBulk,
        resource = R::RESOURCE_NAME,
        "Start API request"
    );
    check_authorization::<R>(ApiMethod::CreateBulk, &headers)?;

    let payload = BulkPayload::parse(&body, state.config.max_bulk_records)?;
    let mut report = BulkReport::new();

    for data in payload {
        let create_model: R::CreateModel = match serde_json::from_value(data.clone()) {
            Ok(model) => model,
            Err(err) => {
                report.rejected(&data, vec![err.to_string()]);
                continue;
            }
        };

        if let Err(messages) = R::validate_record(&create_model, ApiMethod::CreateBulk) {
            report.rejected(&data, messages);
            continue;
        }

        match R::create(&state.db, create_model, ApiMethod::CreateBulk).await {
            Ok(record) => match record.record_id().and_then(|id| id.parse().ok()) {
                Some(id) => report.created(id),
                None => tracing::warn!(resource = R::RESOURCE_NAME, "Created record has no integer id"),
            },
            Err(err) => {
                tracing::warn!(resource = R::RESOURCE_NAME, error = %err, "Failed to create record");
                report.failed(&ApiError::database(err));
            }
        }
    }

    let query = report.created_query(R::ID_FIELD);
    let page_size = state.config.page_size.max(report.created_ids.len() as u64);
    let page = R::get_page(&state.db, &query, 1, page_size).await?;

    let mut envelope = ResponseEnvelope::from_page(page)
        .apply_models(state.router.as_ref())
        .with_status(StatusCode::CREATED);
    for error in report.errors {
        envelope.add_error(error);
    }
    Ok(envelope)
}
