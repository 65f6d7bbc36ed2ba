pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export logic types
pub use logic::{
    CompanyResolvers, CustomerResolvers, EditorAction, EditorEvent, EditorMode, FieldEditor,
    FieldValidator, LeadQuery, Sidebar, ValidationError, ValidationErrorType, ValidationResult,
};

// Export all model types
pub use model::*;

// Export seed module
pub use seed::*;

// Export store types
pub use store::{CachedStore, MemoryStore, PostgresStore, Store};

/// Serve the API from the environment's configuration
pub async fn run_server() -> anyhow::Result<()> {
    use axum::serve;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let config = crate::config::AppConfig::load()?;

    let database_url = config.database_url()?;
    let postgres_store =
        crate::store::PostgresStore::new(&database_url, config.max_connections()).await?;
    postgres_store.migrate().await?;

    let store = Arc::new(crate::store::CachedStore::new(
        postgres_store,
        config.cache_ttl(),
    ));
    store.cache().spawn_sweeper(config.cache_ttl());

    let app = crate::api::routes::create_router().with_state(store);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;

    serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::logic::{EditorAction, EditorEvent, EditorMode, FieldEditor, FieldValidator};
    use crate::model::{Field, FieldAttribute, FieldType, ValidationKind};

    #[test]
    fn test_editor_action_wire_format() {
        let json = r#"{"action": "changeAttribute", "attribute": {"name": "type", "value": "check"}}"#;
        let action: EditorAction = serde_json::from_str(json).unwrap();
        assert_eq!(
            action,
            EditorAction::ChangeAttribute {
                attribute: FieldAttribute::Type(FieldType::Check)
            }
        );

        let submit: EditorAction = serde_json::from_str(r#"{"action": "submit"}"#).unwrap();
        assert_eq!(submit, EditorAction::Submit);
    }

    #[test]
    fn test_type_change_then_submit_drops_inapplicable_validation() {
        let mut field = Field::new(FieldType::Input);
        field.text = "Age".to_string();
        field.validation = Some(ValidationKind::Number);

        let mut editor = FieldEditor::new(EditorMode::Create, field, Vec::new(), "customer".to_string());
        editor
            .apply(EditorAction::ChangeAttribute {
                attribute: FieldAttribute::Type(FieldType::Select),
            })
            .unwrap();
        editor
            .apply(EditorAction::ChangeAttribute {
                attribute: FieldAttribute::Options(vec!["18-30".to_string(), "31+".to_string()]),
            })
            .unwrap();

        match editor.apply(EditorAction::Submit).unwrap() {
            Some(EditorEvent::Submitted(submitted)) => {
                assert_eq!(submitted.field_type, FieldType::Select);
                assert_eq!(submitted.validation, None);
                assert_eq!(submitted.options.len(), 2);
                assert!(FieldValidator::validate(&submitted, &[]).valid);
            }
            other => panic!("expected a submitted field, got {:?}", other),
        }
    }
}
