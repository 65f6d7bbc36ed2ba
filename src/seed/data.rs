use crate::model::{
    Brand, Collection, Company, Customer, CustomerState, Field, FieldLogic, FieldType, LeadStatus,
    LogicAction, LogicOperator, NewConformity, Tag, User, UserDetails, ValidationKind,
};
use crate::store::traits::{DocumentStoreExt, Store};
use anyhow::Result;

/// Form the demo fields belong to
pub const DEMO_FORM_ID: &str = "contact-form";

/// Helper function to create a system property with audit info
fn create_system_property(id: &str, field_type: FieldType, text: &str) -> Field {
    let mut field = Field::new(field_type);
    field.id = id.to_string();
    field.content_type = "customer".to_string();
    field.text = text.to_string();
    field.is_defined_by_system = true;
    field.last_updated_user_id = Some("system".to_string());
    field
}

/// Helper function to create a field of the demo form
fn create_form_field(id: &str, field_type: FieldType, text: &str, order: i32) -> Field {
    let mut field = Field::new(field_type);
    field.id = id.to_string();
    field.content_type_id = Some(DEMO_FORM_ID.to_string());
    field.text = text.to_string();
    field.order = Some(order);
    field.last_updated_user_id = Some("system".to_string());
    field
}

fn tag(id: &str, name: &str, tag_type: &str, color: &str) -> Tag {
    Tag {
        id: id.to_string(),
        name: name.to_string(),
        tag_type: tag_type.to_string(),
        color_code: Some(color.to_string()),
    }
}

fn edge(main_type: &str, main_id: &str, rel_type: &str, rel_id: &str) -> NewConformity {
    NewConformity {
        main_type: main_type.to_string(),
        main_type_id: main_id.to_string(),
        rel_type: rel_type.to_string(),
        rel_type_id: rel_id.to_string(),
    }
}

pub async fn load_seed_data<S: Store>(store: &S) -> Result<()> {
    load_users_and_brands(store).await?;
    load_tags(store).await?;
    load_companies(store).await?;
    load_customers(store).await?;
    load_conformities(store).await?;
    load_system_properties(store).await?;
    load_demo_form(store).await?;

    log::info!("Seed data loaded");
    Ok(())
}

async fn load_users_and_brands<S: Store>(store: &S) -> Result<()> {
    let users = [
        ("u-ada", "ada", "Ada Lovelace", "Account executive"),
        ("u-grace", "grace", "Grace Hopper", "Sales manager"),
    ];
    for (id, username, full_name, position) in users {
        let user = User {
            id: id.to_string(),
            username: username.to_string(),
            email: Some(format!("{}@crm.example", username)),
            details: Some(UserDetails {
                full_name: Some(full_name.to_string()),
                position: Some(position.to_string()),
            }),
        };
        store.upsert_as(Collection::Users, &user).await?;
    }

    for (id, name, code) in [("b-acme", "Acme", "ACM"), ("b-globex", "Globex", "GLX")] {
        let brand = Brand {
            id: id.to_string(),
            name: name.to_string(),
            code: Some(code.to_string()),
        };
        store.upsert_as(Collection::Brands, &brand).await?;
    }

    Ok(())
}

async fn load_tags<S: Store>(store: &S) -> Result<()> {
    let tags = [
        tag("t-vip", "VIP", "customer", "#f5a623"),
        tag("t-newsletter", "Newsletter", "customer", "#4a90e2"),
        tag("t-partner", "Partner", "company", "#7ed321"),
        tag("t-enterprise", "Enterprise", "company", "#9013fe"),
    ];
    for tag in &tags {
        store.upsert_as(Collection::Tags, tag).await?;
    }
    Ok(())
}

async fn load_companies<S: Store>(store: &S) -> Result<()> {
    let mut holding = Company::new("Initech Holdings");
    holding.id = "c-initech-holdings".to_string();
    holding.industry = Some("Finance".to_string());
    holding.owner_id = Some("u-grace".to_string());
    holding.tag_ids = vec!["t-enterprise".to_string()];

    let mut initech = Company::new("Initech");
    initech.id = "c-initech".to_string();
    initech.names.push("Initech Software".to_string());
    initech.industry = Some("Technology".to_string());
    initech.website = Some("https://initech.example".to_string());
    initech.size = Some(250);
    initech.owner_id = Some("u-ada".to_string());
    initech.parent_company_id = Some(holding.id.clone());
    initech.tag_ids = vec!["t-partner".to_string(), "t-enterprise".to_string()];

    store.upsert_as(Collection::Companies, &holding).await?;
    store.upsert_as(Collection::Companies, &initech).await?;
    Ok(())
}

async fn load_customers<S: Store>(store: &S) -> Result<()> {
    let people = [
        ("p-peter", "Peter", "Gibbons", CustomerState::Customer, None, "b-acme"),
        ("p-joanna", "Joanna", "Spencer", CustomerState::Lead, Some(LeadStatus::New), "b-acme"),
        ("p-milton", "Milton", "Waddams", CustomerState::Lead, Some(LeadStatus::BadTiming), "b-globex"),
        ("p-samir", "Samir", "Nagheenanajar", CustomerState::Lead, Some(LeadStatus::InProgress), "b-globex"),
    ];

    for (id, first_name, last_name, state, lead_status, brand) in people {
        let mut customer = Customer::new(first_name, state);
        customer.id = id.to_string();
        customer.last_name = Some(last_name.to_string());
        customer.primary_email = Some(format!("{}@initech.example", first_name.to_lowercase()));
        customer.lead_status = lead_status;
        customer.brand_id = Some(brand.to_string());
        customer.owner_id = Some("u-ada".to_string());
        if first_name == "Joanna" || first_name == "Peter" {
            customer.tag_ids.push("t-vip".to_string());
        }
        store.upsert_as(Collection::Customers, &customer).await?;
    }

    Ok(())
}

async fn load_conformities<S: Store>(store: &S) -> Result<()> {
    let edges = [
        edge("company", "c-initech", "customer", "p-peter"),
        edge("customer", "p-samir", "company", "c-initech"),
        edge("company", "c-initech-holdings", "customer", "p-milton"),
    ];
    for e in edges {
        store.add_conformity(e).await?;
    }
    Ok(())
}

async fn load_system_properties<S: Store>(store: &S) -> Result<()> {
    let mut email = create_system_property("prop-email", FieldType::Email, "Primary email");
    email.validation = Some(ValidationKind::Email);
    email.is_required = true;

    let mut phone = create_system_property("prop-phone", FieldType::Phone, "Primary phone");
    phone.validation = Some(ValidationKind::Number);

    let first_name = create_system_property("prop-first-name", FieldType::FirstName, "First name");
    let last_name = create_system_property("prop-last-name", FieldType::LastName, "Last name");

    for property in [email, phone, first_name, last_name] {
        store.upsert_field(property).await?;
    }
    Ok(())
}

async fn load_demo_form<S: Store>(store: &S) -> Result<()> {
    let mut name = create_form_field("ff-name", FieldType::FirstName, "Your name", 0);
    name.is_required = true;
    name.associated_field_id = Some("prop-first-name".to_string());

    let mut kind = create_form_field("ff-kind", FieldType::Radio, "Are you contacting us as", 1);
    kind.options = vec!["business".to_string(), "personal".to_string()];

    let mut company = create_form_field("ff-company", FieldType::Input, "Company name", 2);
    company.logics = vec![FieldLogic {
        field_id: "ff-kind".to_string(),
        logic_operator: LogicOperator::Is,
        logic_value: serde_json::json!("business"),
    }];
    company.logic_action = Some(LogicAction::Show);

    let message = create_form_field("ff-message", FieldType::Textarea, "Message", 3);

    for field in [name, kind, company, message] {
        store.upsert_field(field).await?;
    }
    Ok(())
}
