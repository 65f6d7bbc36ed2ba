use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::logic::{
    CompanyDetail, CompanyRelation, CompanyResolvers, CustomerDetail, CustomerRelation,
    CustomerResolvers, EditorAction, EditorEvent, EditorMode, EditorView, FieldEditor,
    FieldValidator, LeadQuery, Refetch, Sidebar, SidebarView, ValidationResult,
};
use crate::logic::visibility::visible_fields;
use crate::model::{
    AssociatedField, Collection, Company, Conformity, ConformityEdit, ConformityQuery, Customer,
    DocumentFilter, Field, FieldType, Id, NewConformity, QueryParams, Tag, User, UserContext,
};
use crate::store::traits::{DocumentStoreExt, Store};

pub type AppState<S> = Arc<S>;

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

fn internal_error(e: anyhow::Error) -> ApiError {
    log::error!("Request failed: {:#}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(&e.to_string())),
    )
}

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

fn not_found(message: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new(message)))
}

/// `?fields=customers,owner` selects relations; no parameter selects all
#[derive(Debug, Deserialize)]
pub struct RelationQuery {
    pub fields: Option<String>,
}

fn parse_relations<R>(query: &RelationQuery, all: &[R]) -> Result<HashSet<R>, ApiError>
where
    R: std::str::FromStr<Err = String> + std::hash::Hash + Eq + Copy,
{
    match &query.fields {
        None => Ok(all.iter().copied().collect()),
        Some(fields) => fields
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(|f| f.parse::<R>().map_err(|e| bad_request(&e)))
            .collect(),
    }
}

fn parse_collection(name: &str) -> Result<Collection, ApiError> {
    name.parse::<Collection>().map_err(|e| bad_request(&e))
}

// Companies

async fn load_company<S: Store>(store: &S, id: &Id) -> Result<Company, ApiError> {
    match store
        .find_one_as::<Company>(Collection::Companies, &DocumentFilter::id(id.as_str()))
        .await
    {
        Ok(Some(company)) => Ok(company),
        Ok(None) => Err(not_found("Company not found")),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn list_companies<S: Store>(
    State(store): State<AppState<S>>,
) -> Result<Json<ListResponse<Company>>, ApiError> {
    match store.find_as(Collection::Companies, &DocumentFilter::All).await {
        Ok(companies) => Ok(Json(ListResponse::from(companies))),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn upsert_company<S: Store>(
    State(store): State<AppState<S>>,
    RequestJson(mut company): RequestJson<Company>,
) -> Result<Json<Company>, ApiError> {
    company.modified_at = chrono::Utc::now();
    match store.upsert_as(Collection::Companies, &company).await {
        Ok(id) => {
            company.id = id;
            log::info!("Saved company {}", company.id);
            Ok(Json(company))
        }
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn delete_company<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match store.delete_document(Collection::Companies, &id).await {
        Ok(true) => {}
        Ok(false) => return Err(not_found("Company not found")),
        Err(e) => return Err(internal_error(e)),
    }

    let removed = store
        .remove_conformities("company", &id)
        .await
        .map_err(internal_error)?;

    Ok(Json(serde_json::json!({
        "deleted": id,
        "removedConformities": removed,
    })))
}

pub async fn get_company<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    Query(query): Query<RelationQuery>,
) -> Result<Json<CompanyDetail>, ApiError> {
    let requested = parse_relations(&query, &CompanyRelation::ALL)?;
    let company = load_company(&*store, &id).await?;

    match CompanyResolvers::new(&*store).resolve(company, &requested).await {
        Ok(detail) => Ok(Json(detail)),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn get_company_customers<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Json<ListResponse<Customer>>, ApiError> {
    let company = load_company(&*store, &id).await?;
    match CompanyResolvers::new(&*store).customers(&company).await {
        Ok(customers) => Ok(Json(ListResponse::from(customers))),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn get_company_tags<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Json<ListResponse<Tag>>, ApiError> {
    let company = load_company(&*store, &id).await?;
    match CompanyResolvers::new(&*store).tags(&company).await {
        Ok(tags) => Ok(Json(ListResponse::from(tags))),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn get_company_owner<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Json<Option<User>>, ApiError> {
    let company = load_company(&*store, &id).await?;
    match CompanyResolvers::new(&*store).owner(&company).await {
        Ok(owner) => Ok(Json(owner)),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn get_company_parent<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Json<Option<Company>>, ApiError> {
    let company = load_company(&*store, &id).await?;
    match CompanyResolvers::new(&*store).parent_company(&company).await {
        Ok(parent) => Ok(Json(parent)),
        Err(e) => Err(internal_error(e)),
    }
}

// Customers

pub async fn get_customer<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    Query(query): Query<RelationQuery>,
) -> Result<Json<CustomerDetail>, ApiError> {
    let requested = parse_relations(&query, &CustomerRelation::ALL)?;

    let customer = match store
        .find_one_as::<Customer>(Collection::Customers, &DocumentFilter::id(id.as_str()))
        .await
    {
        Ok(Some(customer)) => customer,
        Ok(None) => return Err(not_found("Customer not found")),
        Err(e) => return Err(internal_error(e)),
    };

    match CustomerResolvers::new(&*store).resolve(customer, &requested).await {
        Ok(detail) => Ok(Json(detail)),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn upsert_customer<S: Store>(
    State(store): State<AppState<S>>,
    RequestJson(mut customer): RequestJson<Customer>,
) -> Result<Json<Customer>, ApiError> {
    match store.upsert_as(Collection::Customers, &customer).await {
        Ok(id) => {
            customer.id = id;
            Ok(Json(customer))
        }
        Err(e) => Err(internal_error(e)),
    }
}

// Conformities

pub async fn add_conformity<S: Store>(
    State(store): State<AppState<S>>,
    RequestJson(edge): RequestJson<NewConformity>,
) -> Result<Json<Conformity>, ApiError> {
    match store.add_conformity(edge).await {
        Ok(conformity) => Ok(Json(conformity)),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn edit_conformity<S: Store>(
    State(store): State<AppState<S>>,
    RequestJson(edit): RequestJson<ConformityEdit>,
) -> Result<Json<Vec<Id>>, ApiError> {
    store.edit_conformity(&edit).await.map_err(internal_error)?;

    let query = ConformityQuery {
        main_type: edit.main_type,
        main_type_id: edit.main_type_id,
        rel_types: vec![edit.rel_type],
    };
    match store.saved_conformity(&query).await {
        Ok(ids) => Ok(Json(ids)),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn saved_conformity<S: Store>(
    State(store): State<AppState<S>>,
    RequestJson(query): RequestJson<ConformityQuery>,
) -> Result<Json<Vec<Id>>, ApiError> {
    match store.saved_conformity(&query).await {
        Ok(ids) => Ok(Json(ids)),
        Err(e) => Err(internal_error(e)),
    }
}

// Generic documents

pub async fn list_documents<S: Store>(
    State(store): State<AppState<S>>,
    Path(collection): Path<String>,
) -> Result<Json<ListResponse<serde_json::Value>>, ApiError> {
    let collection = parse_collection(&collection)?;
    match store.find(collection, &DocumentFilter::All).await {
        Ok(documents) => Ok(Json(ListResponse::from(documents))),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn get_document<S: Store>(
    State(store): State<AppState<S>>,
    Path((collection, id)): Path<(String, Id)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let collection = parse_collection(&collection)?;
    match store
        .get_document(collection, &DocumentFilter::id(id.as_str()))
        .await
    {
        Ok(Some(document)) => Ok(Json(document)),
        Ok(None) => Err(not_found(&format!("No document '{}' in {}", id, collection))),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn upsert_document<S: Store>(
    State(store): State<AppState<S>>,
    Path(collection): Path<String>,
    RequestJson(document): RequestJson<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let collection = parse_collection(&collection)?;
    if !document.is_object() {
        return Err(bad_request("Documents must be JSON objects"));
    }

    match store.upsert_document(collection, document).await {
        Ok(id) => Ok(Json(serde_json::json!({ "_id": id }))),
        Err(e) => Err(internal_error(e)),
    }
}

// Form fields

pub async fn list_form_fields<S: Store>(
    State(store): State<AppState<S>>,
    Path(form_id): Path<Id>,
) -> Result<Json<ListResponse<Field>>, ApiError> {
    match store.list_form_fields(&form_id).await {
        Ok(fields) => Ok(Json(ListResponse::from(fields))),
        Err(e) => Err(internal_error(e)),
    }
}

/// Ids of the form's fields shown for the given answers (field id to value)
pub async fn get_visible_fields<S: Store>(
    State(store): State<AppState<S>>,
    Path(form_id): Path<Id>,
    RequestJson(values): RequestJson<HashMap<Id, serde_json::Value>>,
) -> Result<Json<Vec<Id>>, ApiError> {
    match store.list_form_fields(&form_id).await {
        Ok(fields) => Ok(Json(
            visible_fields(&fields, &values).into_iter().cloned().collect(),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

#[derive(Debug, Deserialize)]
pub struct PropertyQuery {
    #[serde(rename = "type")]
    pub content_type: String,
}

pub async fn list_system_properties<S: Store>(
    State(store): State<AppState<S>>,
    Query(query): Query<PropertyQuery>,
) -> Result<Json<ListResponse<Field>>, ApiError> {
    match store.list_system_properties(&query.content_type).await {
        Ok(properties) => Ok(Json(ListResponse::from(properties))),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn delete_field<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<StatusCode, ApiError> {
    match store.delete_field(&id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(not_found("Field not found")),
        Err(e) => Err(internal_error(e)),
    }
}

fn default_content_type() -> String {
    "customer".to_string()
}

/// One editing session replayed server-side: the editor is built from
/// `mode` and the starting field, then `actions` are applied in order until
/// one of them produces an event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorRequest {
    pub mode: EditorMode,
    /// Starting field; in update mode `field_id` may be given instead
    pub field: Option<Field>,
    pub field_id: Option<Id>,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub actions: Vec<EditorAction>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorResponse {
    pub view: EditorView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EditorEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
}

async fn initial_field<S: Store>(
    store: &S,
    form_id: &Id,
    request: &mut EditorRequest,
) -> Result<Field, ApiError> {
    let mut field = match (request.mode, request.field.take(), &request.field_id) {
        (_, Some(field), _) => field,
        (EditorMode::Update, None, Some(field_id)) => match store.get_field(field_id).await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(not_found("Field not found")),
            Err(e) => return Err(internal_error(e)),
        },
        (EditorMode::Update, None, None) => {
            return Err(bad_request("Update mode needs a field or fieldId"))
        }
        (EditorMode::Create, None, _) => Field::new(FieldType::Input),
    };

    // A created field never takes over a stored one
    if request.mode == EditorMode::Create {
        field.id = Id::new();
    }

    if field.content_type_id.is_none() {
        field.content_type_id = Some(form_id.clone());
    }

    // Attach the bound property so the editor can show it as selected
    field.associated_field = match &field.associated_field_id {
        Some(property_id) => store
            .get_field(property_id)
            .await
            .map_err(internal_error)?
            .as_ref()
            .map(AssociatedField::from),
        None => None,
    };

    Ok(field)
}

/// Order placing a new field after every ordered field of the form
fn next_order(form_fields: &[Field]) -> i32 {
    form_fields
        .iter()
        .filter_map(|f| f.order)
        .max()
        .map_or(0, |max| max + 1)
}

pub async fn apply_field_editor<S: Store>(
    State(store): State<AppState<S>>,
    Path(form_id): Path<Id>,
    user: UserContext,
    RequestJson(mut request): RequestJson<EditorRequest>,
) -> Result<(StatusCode, Json<EditorResponse>), ApiError> {
    let field = initial_field(&*store, &form_id, &mut request).await?;
    let form_fields = store
        .list_form_fields(&form_id)
        .await
        .map_err(internal_error)?;

    let mut editor = FieldEditor::new(request.mode, field, form_fields, request.content_type);

    let mut event = None;
    for action in request.actions {
        match editor.apply(action) {
            Ok(Some(emitted)) => {
                event = Some(emitted);
                break;
            }
            Ok(None) => {}
            Err(e) => return Err(bad_request(&e.to_string())),
        }
    }

    let mut validation = None;
    let event = match event {
        Some(EditorEvent::Submitted(mut field)) => {
            let result = FieldValidator::validate(&field, editor.form_fields());
            if !result.valid {
                log::warn!("Rejected field '{}' on form {}", field.text, form_id);
                return Ok((
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(EditorResponse {
                        view: editor.view(),
                        event: None,
                        validation: Some(result),
                    }),
                ));
            }

            field.content_type = "form".to_string();
            field.content_type_id = Some(form_id.clone());
            field.last_updated_user_id = Some(user.user_id.clone());
            if field.order.is_none() {
                field.order = Some(next_order(editor.form_fields()));
            }

            // The bound property is re-read on load, only its id is stored
            field.associated_field = None;
            let saved = store.upsert_field(field).await.map_err(internal_error)?;
            log::info!("Saved field {} on form {}", saved.id, form_id);
            validation = Some(result);
            Some(EditorEvent::Submitted(saved))
        }
        Some(EditorEvent::Deleted(field)) => {
            match store.delete_field(&field.id).await {
                Ok(true) => {}
                Ok(false) => return Err(not_found("Field not found")),
                Err(e) => return Err(internal_error(e)),
            }
            log::info!("Deleted field {} from form {}", field.id, form_id);
            Some(EditorEvent::Deleted(field))
        }
        other => other,
    };

    Ok((
        StatusCode::OK,
        Json(EditorResponse {
            view: editor.view(),
            event,
            validation,
        }),
    ))
}

// Leads

pub async fn list_leads<S: Store>(
    State(store): State<AppState<S>>,
    Query(params): Query<QueryParams>,
) -> Result<Json<ListResponse<Customer>>, ApiError> {
    match LeadQuery::new(&params).fetch(&*store).await {
        Ok(leads) => Ok(Json(ListResponse::from(leads))),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn get_lead_sidebar<S: Store>(
    State(store): State<AppState<S>>,
    Query(params): Query<QueryParams>,
) -> Result<Json<SidebarView>, ApiError> {
    match Sidebar::new(params, None).render(&*store).await {
        Ok(view) => Ok(Json(view)),
        Err(e) => Err(internal_error(e)),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarSelectRequest {
    #[serde(default)]
    pub query_params: QueryParams,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct SidebarSelectResponse {
    pub sidebar: SidebarView,
    pub leads: ListResponse<Customer>,
}

/// Apply one filter selection and return the re-rendered sidebar together
/// with the leads the refetch reloads.
pub async fn select_lead_filter<S: Store>(
    State(store): State<AppState<S>>,
    RequestJson(request): RequestJson<SidebarSelectRequest>,
) -> Result<Json<SidebarSelectResponse>, ApiError> {
    let refetched = Arc::new(AtomicBool::new(false));
    let flag = refetched.clone();
    let refetch: Refetch = Arc::new(move || flag.store(true, Ordering::SeqCst));

    let sidebar = Sidebar::new(request.query_params, Some(refetch));
    sidebar
        .select(&request.key, &request.value)
        .map_err(|e| bad_request(&e.to_string()))?;

    let params = sidebar.query_params();
    let leads = if refetched.load(Ordering::SeqCst) {
        LeadQuery::new(&params)
            .fetch(&*store)
            .await
            .map_err(internal_error)?
    } else {
        Vec::new()
    };

    let view = sidebar.render(&*store).await.map_err(internal_error)?;
    Ok(Json(SidebarSelectResponse {
        sidebar: view,
        leads: ListResponse::from(leads),
    }))
}
