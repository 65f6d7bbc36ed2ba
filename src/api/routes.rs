use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<Arc<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Companies and their relations
        .route(
            "/companies",
            get(handlers::list_companies::<S>).post(handlers::upsert_company::<S>),
        )
        .route(
            "/companies/:id",
            get(handlers::get_company::<S>).delete(handlers::delete_company::<S>),
        )
        .route(
            "/companies/:id/customers",
            get(handlers::get_company_customers::<S>),
        )
        .route("/companies/:id/tags", get(handlers::get_company_tags::<S>))
        .route("/companies/:id/owner", get(handlers::get_company_owner::<S>))
        .route(
            "/companies/:id/parent-company",
            get(handlers::get_company_parent::<S>),
        )
        // Customers
        .route("/customers", post(handlers::upsert_customer::<S>))
        .route("/customers/:id", get(handlers::get_customer::<S>))
        // Conformity edges
        .route(
            "/conformities",
            post(handlers::add_conformity::<S>).put(handlers::edit_conformity::<S>),
        )
        .route("/conformities/saved", post(handlers::saved_conformity::<S>))
        // Raw documents
        .route(
            "/documents/:collection",
            get(handlers::list_documents::<S>).post(handlers::upsert_document::<S>),
        )
        .route(
            "/documents/:collection/:id",
            get(handlers::get_document::<S>),
        )
        // Form fields
        .route("/forms/:form_id/fields", get(handlers::list_form_fields::<S>))
        .route(
            "/forms/:form_id/fields/editor",
            post(handlers::apply_field_editor::<S>),
        )
        .route(
            "/forms/:form_id/visible-fields",
            post(handlers::get_visible_fields::<S>),
        )
        .route("/fields/:id", delete(handlers::delete_field::<S>))
        .route("/properties", get(handlers::list_system_properties::<S>))
        // Lead list and its sidebar
        .route("/leads", get(handlers::list_leads::<S>))
        .route("/leads/sidebar", get(handlers::get_lead_sidebar::<S>))
        .route(
            "/leads/sidebar/select",
            post(handlers::select_lead_filter::<S>),
        )
        .layer(CorsLayer::permissive())
}
