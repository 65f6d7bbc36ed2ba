use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::model::{default_timestamp, Id};
use chrono::{DateTime, Utc};

/// Type of a form field. Unknown type strings are kept as `Other` so that
/// newer field kinds survive a read/write cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    /// Single line text input
    Input,
    Email,
    Phone,
    Select,
    /// Checkbox group
    Check,
    /// Radio group
    Radio,
    Textarea,
    FirstName,
    LastName,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Input => "input",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Select => "select",
            FieldType::Check => "check",
            FieldType::Radio => "radio",
            FieldType::Textarea => "textarea",
            FieldType::FirstName => "firstName",
            FieldType::LastName => "lastName",
            FieldType::Other(other) => other.as_str(),
        }
    }

    /// Validation selector applies to free-text inputs only
    pub fn is_validation_applicable(&self) -> bool {
        matches!(self, FieldType::Input | FieldType::Email | FieldType::Phone)
    }

    /// Option lists apply to choice inputs only
    pub fn are_options_applicable(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::Check | FieldType::Radio)
    }

    /// Email, phone and name fields are already backed by fixed system
    /// attributes and cannot be bound to another property.
    pub fn is_custom_property_eligible(&self) -> bool {
        !matches!(
            self,
            FieldType::Email | FieldType::Phone | FieldType::FirstName | FieldType::LastName
        )
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "input" => FieldType::Input,
            "email" => FieldType::Email,
            "phone" => FieldType::Phone,
            "select" => FieldType::Select,
            "check" => FieldType::Check,
            "radio" => FieldType::Radio,
            "textarea" => FieldType::Textarea,
            "firstName" => FieldType::FirstName,
            "lastName" => FieldType::LastName,
            _ => FieldType::Other(value),
        }
    }
}

impl From<&str> for FieldType {
    fn from(value: &str) -> Self {
        FieldType::from(value.to_string())
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for FieldType {
    fn default() -> Self {
        FieldType::Input
    }
}

pub fn is_validation_applicable(field_type: &FieldType) -> bool {
    field_type.is_validation_applicable()
}

pub fn are_options_applicable(field_type: &FieldType) -> bool {
    field_type.are_options_applicable()
}

pub fn is_custom_property_eligible(field_type: &FieldType) -> bool {
    field_type.is_custom_property_eligible()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationKind {
    Email,
    Number,
    Datetime,
    Date,
    Phone,
}

impl std::str::FromStr for ValidationKind {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(ValidationKind::Email),
            "number" => Ok(ValidationKind::Number),
            "datetime" => Ok(ValidationKind::Datetime),
            "date" => Ok(ValidationKind::Date),
            "phone" => Ok(ValidationKind::Phone),
            other => Err(FieldError::InvalidValue {
                attribute: "validation".to_string(),
                message: format!("unknown validation kind '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicAction {
    Show,
    Hide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogicOperator {
    Is,
    IsNot,
    StartsWith,
    EndsWith,
    Contains,
    DoesNotContain,
    GreaterThan,
    LessThan,
    IsUnknown,
    HasAnyValue,
}

/// A conditional rule on another field of the same form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldLogic {
    pub field_id: Id,
    pub logic_operator: LogicOperator,
    #[serde(default)]
    pub logic_value: serde_json::Value,
}

/// Read-side copy of the system property a field is bound to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociatedField {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub text: String,
    #[serde(
        default,
        deserialize_with = "deserialize_validation",
        skip_serializing_if = "Option::is_none"
    )]
    pub validation: Option<ValidationKind>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&Field> for AssociatedField {
    fn from(field: &Field) -> Self {
        Self {
            id: field.id.clone(),
            field_type: field.field_type.clone(),
            text: field.text.clone(),
            validation: field.validation,
            options: field.options.clone(),
            is_required: field.is_required,
            description: field.description.clone(),
        }
    }
}

/// One configurable data-entry control of a form, or a system property
/// (`is_defined_by_system`) that custom fields may bind to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(rename = "_id", default)]
    pub id: Id,

    /// Owner kind, e.g. "form" for form fields or "customer" for properties
    #[serde(default)]
    pub content_type: String,

    /// Owning form id for form fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type_id: Option<Id>,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// Label shown to the person filling the form
    #[serde(default)]
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,

    #[serde(default)]
    pub is_required: bool,

    #[serde(
        default,
        deserialize_with = "deserialize_validation",
        skip_serializing_if = "Option::is_none"
    )]
    pub validation: Option<ValidationKind>,

    #[serde(default)]
    pub options: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_field_id: Option<Id>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_field: Option<AssociatedField>,

    #[serde(default)]
    pub logics: Vec<FieldLogic>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic_action: Option<LogicAction>,

    #[serde(default)]
    pub is_defined_by_system: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_user_id: Option<Id>,

    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Default for Field {
    fn default() -> Self {
        Self {
            id: Id::new(),
            content_type: "form".to_string(),
            content_type_id: None,
            field_type: FieldType::default(),
            text: String::new(),
            description: None,
            group_name: None,
            is_required: false,
            validation: None,
            options: Vec::new(),
            order: None,
            associated_field_id: None,
            associated_field: None,
            logics: Vec::new(),
            logic_action: None,
            is_defined_by_system: false,
            last_updated_user_id: None,
            created_at: Utc::now(),
        }
    }
}

impl Field {
    /// Empty field of the given type, as handed to the editor in create mode
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            ..Self::default()
        }
    }

    /// Copy with validation and options removed when the current type does
    /// not take them.
    pub fn normalized(&self) -> Self {
        let mut field = self.clone();
        if !field.field_type.is_validation_applicable() {
            field.validation = None;
        }
        if !field.field_type.are_options_applicable() {
            field.options.clear();
        }
        field
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("unknown field attribute '{0}'")]
    UnknownAttribute(String),

    #[error("invalid value for '{attribute}': {message}")]
    InvalidValue { attribute: String, message: String },
}

/// A single recognised attribute change. The wire form is
/// `{"name": "<attribute>", "value": <value>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "value", rename_all = "camelCase")]
pub enum FieldAttribute {
    Text(String),
    Description(String),
    GroupName(String),
    IsRequired(bool),
    Type(FieldType),
    #[serde(deserialize_with = "deserialize_validation")]
    Validation(Option<ValidationKind>),
    Options(Vec<String>),
    Logics(Vec<FieldLogic>),
    LogicAction(Option<LogicAction>),
}

pub const FIELD_ATTRIBUTE_NAMES: [&str; 9] = [
    "text",
    "description",
    "groupName",
    "isRequired",
    "type",
    "validation",
    "options",
    "logics",
    "logicAction",
];

fn deserialize_validation<'de, D>(deserializer: D) -> Result<Option<ValidationKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(kind) => kind.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Splits the options textarea into one option per line
pub fn options_from_text(text: &str) -> Vec<String> {
    text.split('\n').map(|line| line.to_string()).collect()
}

fn empty_as_none(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl FieldAttribute {
    /// Build an attribute change from a raw name/value pair, rejecting names
    /// that are not field attributes.
    pub fn from_name_value(name: &str, value: serde_json::Value) -> Result<Self, FieldError> {
        if !FIELD_ATTRIBUTE_NAMES.contains(&name) {
            return Err(FieldError::UnknownAttribute(name.to_string()));
        }

        serde_json::from_value(serde_json::json!({ "name": name, "value": value })).map_err(|e| {
            FieldError::InvalidValue {
                attribute: name.to_string(),
                message: e.to_string(),
            }
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldAttribute::Text(_) => "text",
            FieldAttribute::Description(_) => "description",
            FieldAttribute::GroupName(_) => "groupName",
            FieldAttribute::IsRequired(_) => "isRequired",
            FieldAttribute::Type(_) => "type",
            FieldAttribute::Validation(_) => "validation",
            FieldAttribute::Options(_) => "options",
            FieldAttribute::Logics(_) => "logics",
            FieldAttribute::LogicAction(_) => "logicAction",
        }
    }

    /// Sets exactly this attribute on `field`
    pub fn apply_to(self, field: &mut Field) {
        match self {
            FieldAttribute::Text(text) => field.text = text,
            FieldAttribute::Description(description) => {
                field.description = empty_as_none(&description)
            }
            FieldAttribute::GroupName(group_name) => field.group_name = empty_as_none(&group_name),
            FieldAttribute::IsRequired(is_required) => field.is_required = is_required,
            FieldAttribute::Type(field_type) => field.field_type = field_type,
            FieldAttribute::Validation(validation) => field.validation = validation,
            FieldAttribute::Options(options) => field.options = options,
            FieldAttribute::Logics(logics) => field.logics = logics,
            FieldAttribute::LogicAction(action) => field.logic_action = action,
        }
    }
}
