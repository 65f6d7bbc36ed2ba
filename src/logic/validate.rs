use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::model::{Field, Id};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field_id: Id,
    pub error_type: ValidationErrorType,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorType {
    MissingLabel,
    ValidationNotApplicable,
    OptionsNotApplicable,
    UnknownLogicField,
    SelfReferencingLogic,
}

impl ValidationResult {
    pub fn error_types(&self) -> Vec<ValidationErrorType> {
        self.errors.iter().map(|e| e.error_type).collect()
    }
}

/// Structural checks run on a submitted field before it is stored
pub struct FieldValidator;

impl FieldValidator {
    /// Validate `field` as a member of the form made of `form_fields`.
    /// `form_fields` may or may not contain `field` itself.
    pub fn validate(field: &Field, form_fields: &[Field]) -> ValidationResult {
        let mut errors = Vec::new();
        let mut push = |error_type, message: String| {
            errors.push(ValidationError {
                field_id: field.id.clone(),
                error_type,
                message,
            })
        };

        if field.text.trim().is_empty() {
            push(ValidationErrorType::MissingLabel, "Field label is required".to_string());
        }

        if let Some(validation) = field.validation {
            if !field.field_type.is_validation_applicable() {
                push(
                    ValidationErrorType::ValidationNotApplicable,
                    format!(
                        "Validation '{:?}' cannot be used on {} fields",
                        validation, field.field_type
                    ),
                );
            }
        }

        if !field.options.is_empty() && !field.field_type.are_options_applicable() {
            push(
                ValidationErrorType::OptionsNotApplicable,
                format!("Options cannot be used on {} fields", field.field_type),
            );
        }

        let known: HashSet<&str> = form_fields
            .iter()
            .filter(|f| f.id != field.id)
            .map(|f| f.id.as_str())
            .collect();

        for logic in &field.logics {
            if !field.id.is_empty() && logic.field_id == field.id {
                push(
                    ValidationErrorType::SelfReferencingLogic,
                    "A logic rule cannot depend on its own field".to_string(),
                );
            } else if !known.contains(logic.field_id.as_str()) {
                push(
                    ValidationErrorType::UnknownLogicField,
                    format!("Logic rule references unknown field '{}'", logic.field_id),
                );
            }
        }

        ValidationResult {
            valid: errors.is_empty(),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldLogic, FieldType, LogicOperator, ValidationKind};
    use serde_json::json;

    fn field(id: &str, field_type: FieldType) -> Field {
        let mut field = Field::new(field_type);
        field.id = id.to_string();
        field.text = format!("Field {}", id);
        field
    }

    fn rule(field_id: &str) -> FieldLogic {
        FieldLogic {
            field_id: field_id.to_string(),
            logic_operator: LogicOperator::HasAnyValue,
            logic_value: json!(null),
        }
    }

    #[test]
    fn test_valid_field_passes() {
        let mut subject = field("f2", FieldType::Input);
        subject.validation = Some(ValidationKind::Email);
        subject.logics = vec![rule("f1")];

        let form = vec![field("f1", FieldType::Check), subject.clone()];
        let result = FieldValidator::validate(&subject, &form);
        assert!(result.valid, "{:?}", result.errors);
    }

    #[test]
    fn test_inapplicable_values_are_reported() {
        let mut subject = field("f1", FieldType::Textarea);
        subject.validation = Some(ValidationKind::Number);
        subject.options = vec!["a".to_string()];

        let result = FieldValidator::validate(&subject, &[]);
        assert!(!result.valid);
        assert_eq!(
            result.error_types(),
            vec![
                ValidationErrorType::ValidationNotApplicable,
                ValidationErrorType::OptionsNotApplicable
            ]
        );
    }

    #[test]
    fn test_logic_rules_must_reference_form_fields() {
        let mut subject = field("f1", FieldType::Select);
        subject.logics = vec![rule("missing"), rule("f1")];

        let result = FieldValidator::validate(&subject, &[subject.clone()]);
        assert_eq!(
            result.error_types(),
            vec![
                ValidationErrorType::UnknownLogicField,
                ValidationErrorType::SelfReferencingLogic
            ]
        );
    }

    #[test]
    fn test_missing_label() {
        let subject = Field::new(FieldType::Input);
        let result = FieldValidator::validate(&subject, &[]);
        assert_eq!(result.error_types(), vec![ValidationErrorType::MissingLabel]);
    }
}
