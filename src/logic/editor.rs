use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AssociatedField, Field, FieldAttribute, FieldType, Id, ValidationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    Create,
    Update,
}

/// System property currently bound to the field, as shown in the selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedProperty {
    pub value: Id,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum EditorAction {
    ChangeAttribute { attribute: FieldAttribute },
    BindSystemProperty { property: Field },
    Submit,
    Delete,
    Cancel,
}

/// What the editor hands back to its caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "field", rename_all = "camelCase")]
pub enum EditorEvent {
    Submitted(Field),
    Deleted(Field),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditorError {
    #[error("fields cannot be deleted while they are being created")]
    DeleteUnavailable,
}

/// Editing session for a single field. The mode is fixed for the lifetime
/// of the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldEditor {
    mode: EditorMode,
    /// Field as it was when the session opened
    initial: Field,
    field: Field,
    /// Other fields of the enclosing form, offered to logic rules
    form_fields: Vec<Field>,
    /// Content type whose system properties the field may bind to
    content_type: String,
    selected_property: Option<SelectedProperty>,
}

impl FieldEditor {
    pub fn new(
        mode: EditorMode,
        field: Field,
        form_fields: Vec<Field>,
        content_type: impl Into<String>,
    ) -> Self {
        let selected_property = field.associated_field.as_ref().map(|associated| SelectedProperty {
            value: associated.id.clone(),
            label: associated.text.clone(),
        });

        Self {
            mode,
            initial: field.clone(),
            field,
            form_fields,
            content_type: content_type.into(),
            selected_property,
        }
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn form_fields(&self) -> &[Field] {
        &self.form_fields
    }

    pub fn selected_property(&self) -> Option<&SelectedProperty> {
        self.selected_property.as_ref()
    }

    /// Apply one action in place, returning the event for the caller if the
    /// action produces one.
    pub fn apply(&mut self, action: EditorAction) -> Result<Option<EditorEvent>, EditorError> {
        match action {
            EditorAction::ChangeAttribute { attribute } => {
                log::debug!("Field attribute '{}' changed", attribute.name());
                attribute.apply_to(&mut self.field);
                Ok(None)
            }
            EditorAction::BindSystemProperty { property } => {
                self.bind_system_property(&property);
                Ok(None)
            }
            EditorAction::Submit => Ok(Some(EditorEvent::Submitted(self.field.normalized()))),
            // Deletion targets the stored field, not the unsaved edits
            EditorAction::Delete => match self.mode {
                EditorMode::Create => Err(EditorError::DeleteUnavailable),
                EditorMode::Update => Ok(Some(EditorEvent::Deleted(self.initial.clone()))),
            },
            EditorAction::Cancel => Ok(Some(EditorEvent::Cancelled)),
        }
    }

    /// Pure form of `apply`: the input state is left untouched
    pub fn reduce(
        &self,
        action: EditorAction,
    ) -> Result<(FieldEditor, Option<EditorEvent>), EditorError> {
        let mut next = self.clone();
        let event = next.apply(action)?;
        Ok((next, event))
    }

    /// Copies the property's definition over the working field. Prior
    /// values of the overwritten attributes are discarded.
    fn bind_system_property(&mut self, property: &Field) {
        self.field.associated_field_id = Some(property.id.clone());
        self.field.associated_field = Some(AssociatedField::from(property));
        self.field.validation = property.validation;
        self.field.options = property.options.clone();
        self.field.field_type = property.field_type.clone();
        self.field.is_required = property.is_required;
        self.field.text = property.text.clone();
        self.field.description = property.description.clone();

        self.selected_property = Some(SelectedProperty {
            value: property.id.clone(),
            label: property.text.clone(),
        });
    }

    /// Sections to show for the current state. Everything conditional is
    /// derived from the field's current type.
    pub fn view(&self) -> EditorView {
        let field_type = &self.field.field_type;

        let validation = field_type
            .is_validation_applicable()
            .then(|| ValidationSection {
                selected: self.field.validation,
                choices: VALIDATION_CHOICES.to_vec(),
            });

        let options = field_type.are_options_applicable().then(|| OptionsSection {
            options: self.field.options.clone(),
            text: self.field.options.join("\n"),
        });

        let custom_property = field_type
            .is_custom_property_eligible()
            .then(|| CustomPropertySection {
                content_type: self.content_type.clone(),
                selected: self.selected_property.clone(),
                description: "Any data collected through this field will copy to:".to_string(),
            });

        let logic = (!self.form_fields.is_empty()).then(|| LogicSection {
            available_fields: self
                .form_fields
                .iter()
                .filter(|f| f.id != self.field.id)
                .map(|f| LogicFieldChoice {
                    id: f.id.clone(),
                    text: f.text.clone(),
                    field_type: f.field_type.clone(),
                })
                .collect(),
            logics: self.field.logics.clone(),
            logic_action: self.field.logic_action,
        });

        let verb = match self.mode {
            EditorMode::Create => "Add",
            EditorMode::Update => "Edit",
        };
        let submit_label = match self.mode {
            EditorMode::Create => "Add to Form",
            EditorMode::Update => "Save",
        };

        EditorView {
            title: format!("{} {} field", verb, field_type),
            field: self.field.clone(),
            validation,
            options,
            custom_property,
            logic,
            delete_available: self.mode == EditorMode::Update,
            submit_label: submit_label.to_string(),
        }
    }
}

const VALIDATION_CHOICES: [ValidationChoice; 5] = [
    ValidationChoice { value: ValidationKind::Email, label: "Email" },
    ValidationChoice { value: ValidationKind::Number, label: "Number" },
    ValidationChoice { value: ValidationKind::Datetime, label: "Date Time" },
    ValidationChoice { value: ValidationKind::Date, label: "Date" },
    ValidationChoice { value: ValidationKind::Phone, label: "Phone" },
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValidationChoice {
    pub value: ValidationKind,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSection {
    pub selected: Option<ValidationKind>,
    pub choices: Vec<ValidationChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionsSection {
    pub options: Vec<String>,
    /// Options as edited in the textarea, one per line
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomPropertySection {
    pub content_type: String,
    pub selected: Option<SelectedProperty>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicFieldChoice {
    pub id: Id,
    pub text: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicSection {
    pub available_fields: Vec<LogicFieldChoice>,
    pub logics: Vec<crate::model::FieldLogic>,
    pub logic_action: Option<crate::model::LogicAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorView {
    pub title: String,
    pub field: Field,
    pub validation: Option<ValidationSection>,
    pub options: Option<OptionsSection>,
    pub custom_property: Option<CustomPropertySection>,
    pub logic: Option<LogicSection>,
    pub delete_available: bool,
    pub submit_label: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{options_from_text, FieldLogic, LogicAction, LogicOperator};
    use serde_json::json;

    fn select_field() -> Field {
        let mut field = Field::new(FieldType::Select);
        field.id = "f1".to_string();
        field.text = "Size".to_string();
        field.group_name = Some("Preferences".to_string());
        field.options = vec!["S".to_string(), "M".to_string()];
        field.logics = vec![FieldLogic {
            field_id: "f0".to_string(),
            logic_operator: LogicOperator::Is,
            logic_value: json!("yes"),
        }];
        field.logic_action = Some(LogicAction::Show);
        field
    }

    fn system_property() -> Field {
        let mut property = Field::new(FieldType::Input);
        property.id = "prop-position".to_string();
        property.content_type = "customer".to_string();
        property.text = "Position".to_string();
        property.description = Some("Job title".to_string());
        property.validation = Some(ValidationKind::Number);
        property.is_required = true;
        property.is_defined_by_system = true;
        property
    }

    fn change(attribute: FieldAttribute) -> EditorAction {
        EditorAction::ChangeAttribute { attribute }
    }

    #[test]
    fn test_create_mode_never_offers_delete() {
        let mut editor = FieldEditor::new(EditorMode::Create, select_field(), vec![], "customer");
        assert!(!editor.view().delete_available);
        assert_eq!(editor.view().submit_label, "Add to Form");
        assert_eq!(editor.view().title, "Add select field");

        let before = editor.clone();
        assert_eq!(editor.apply(EditorAction::Delete), Err(EditorError::DeleteUnavailable));
        assert_eq!(editor, before);
    }

    #[test]
    fn test_update_mode_offers_delete() {
        let field = select_field();
        let mut editor = FieldEditor::new(EditorMode::Update, field.clone(), vec![], "customer");
        let view = editor.view();
        assert!(view.delete_available);
        assert_eq!(view.submit_label, "Save");
        assert_eq!(view.title, "Edit select field");

        editor
            .apply(change(FieldAttribute::Text("Unsaved label".to_string())))
            .unwrap();
        let event = editor.apply(EditorAction::Delete).unwrap();
        assert_eq!(event, Some(EditorEvent::Deleted(field)));
    }

    #[test]
    fn test_change_attribute_sets_only_that_attribute() {
        let editor = FieldEditor::new(EditorMode::Update, select_field(), vec![], "customer");
        let (next, event) = editor
            .reduce(change(FieldAttribute::Text("Shirt size".to_string())))
            .unwrap();

        assert!(event.is_none());
        assert_eq!(next.field().text, "Shirt size");
        assert_eq!(next.field().options, select_field().options);
        // reduce leaves the input state alone
        assert_eq!(editor.field().text, "Size");
    }

    #[test]
    fn test_select_to_email_swaps_sections_in_one_update() {
        let mut editor = FieldEditor::new(EditorMode::Update, select_field(), vec![], "customer");
        let view = editor.view();
        assert!(view.options.is_some());
        assert!(view.validation.is_none());
        assert!(view.custom_property.is_some());

        editor
            .apply(change(FieldAttribute::Type(FieldType::Email)))
            .unwrap();

        let view = editor.view();
        assert!(view.options.is_none());
        assert!(view.validation.is_some());
        assert!(view.custom_property.is_none());
    }

    #[test]
    fn test_sections_follow_type_for_every_type() {
        let types = [
            FieldType::Input,
            FieldType::Email,
            FieldType::Phone,
            FieldType::Select,
            FieldType::Check,
            FieldType::Radio,
            FieldType::Textarea,
            FieldType::FirstName,
            FieldType::LastName,
            FieldType::Other("file".to_string()),
        ];

        for field_type in types {
            let editor = FieldEditor::new(
                EditorMode::Create,
                Field::new(field_type.clone()),
                vec![],
                "customer",
            );
            let view = editor.view();
            assert_eq!(view.validation.is_some(), field_type.is_validation_applicable());
            assert_eq!(view.options.is_some(), field_type.are_options_applicable());
            assert_eq!(
                view.custom_property.is_some(),
                field_type.is_custom_property_eligible()
            );
        }
    }

    #[test]
    fn test_bind_overwrites_exactly_the_property_attributes() {
        let original = select_field();
        let property = system_property();
        let mut editor = FieldEditor::new(EditorMode::Update, original.clone(), vec![], "customer");

        editor
            .apply(EditorAction::BindSystemProperty {
                property: property.clone(),
            })
            .unwrap();

        let field = editor.field();
        assert_eq!(field.associated_field_id.as_deref(), Some("prop-position"));
        assert_eq!(field.validation, property.validation);
        assert_eq!(field.options, property.options);
        assert_eq!(field.field_type, property.field_type);
        assert_eq!(field.is_required, property.is_required);
        assert_eq!(field.text, property.text);
        assert_eq!(field.description, property.description);

        // everything else is untouched
        assert_eq!(
            field.associated_field.as_ref().map(|a| a.id.as_str()),
            Some("prop-position")
        );

        let mut expected = field.clone();
        expected.associated_field_id = original.associated_field_id.clone();
        expected.associated_field = original.associated_field.clone();
        expected.validation = original.validation;
        expected.options = original.options.clone();
        expected.field_type = original.field_type.clone();
        expected.is_required = original.is_required;
        expected.text = original.text.clone();
        expected.description = original.description.clone();
        assert_eq!(expected, original);

        assert_eq!(
            editor.selected_property(),
            Some(&SelectedProperty {
                value: "prop-position".to_string(),
                label: "Position".to_string(),
            })
        );
    }

    #[test]
    fn test_selected_property_derived_from_initial_association() {
        let mut field = select_field();
        field.associated_field_id = Some("prop-1".to_string());
        field.associated_field = Some(AssociatedField::from(&system_property()));

        let editor = FieldEditor::new(EditorMode::Update, field, vec![], "customer");
        let selected = editor.selected_property().unwrap();
        assert_eq!(selected.value, "prop-position");
        assert_eq!(selected.label, "Position");

        let editor = FieldEditor::new(EditorMode::Create, select_field(), vec![], "customer");
        assert!(editor.selected_property().is_none());
    }

    #[test]
    fn test_rebinding_replaces_the_association() {
        let mut first = system_property();
        first.id = "prop-pos".to_string();
        let mut second = system_property();
        second.id = "prop-dept".to_string();
        second.text = "Department".to_string();

        let mut editor = FieldEditor::new(EditorMode::Update, select_field(), vec![], "customer");
        editor
            .apply(EditorAction::BindSystemProperty { property: first })
            .unwrap();
        let saved = match editor.apply(EditorAction::Submit).unwrap() {
            Some(EditorEvent::Submitted(field)) => field,
            other => panic!("expected a submitted field, got {:?}", other),
        };

        let mut editor = FieldEditor::new(EditorMode::Update, saved, vec![], "customer");
        editor
            .apply(EditorAction::BindSystemProperty { property: second })
            .unwrap();
        let saved = match editor.apply(EditorAction::Submit).unwrap() {
            Some(EditorEvent::Submitted(field)) => field,
            other => panic!("expected a submitted field, got {:?}", other),
        };
        assert_eq!(saved.associated_field_id.as_deref(), Some("prop-dept"));
        assert_eq!(
            saved.associated_field.as_ref().map(|a| a.id.as_str()),
            Some("prop-dept")
        );

        let reopened = FieldEditor::new(EditorMode::Update, saved, vec![], "customer");
        let selected = reopened.selected_property().unwrap();
        assert_eq!(selected.value, "prop-dept");
        assert_eq!(selected.label, "Department");
    }

    #[test]
    fn test_submit_emits_normalized_field_without_changing_state() {
        let mut editor = FieldEditor::new(EditorMode::Create, select_field(), vec![], "customer");
        editor
            .apply(change(FieldAttribute::Options(options_from_text("Red\nBlue"))))
            .unwrap();
        editor
            .apply(change(FieldAttribute::Type(FieldType::Input)))
            .unwrap();
        editor
            .apply(change(FieldAttribute::Validation(Some(ValidationKind::Email))))
            .unwrap();

        let before = editor.clone();
        let event = editor.apply(EditorAction::Submit).unwrap();
        assert_eq!(editor, before);

        let Some(EditorEvent::Submitted(field)) = event else {
            panic!("expected a submitted field, got {:?}", event);
        };
        assert_eq!(field.field_type, FieldType::Input);
        assert_eq!(field.validation, Some(ValidationKind::Email));
        assert!(field.options.is_empty());
        // the working copy still remembers the options if the type flips back
        assert_eq!(editor.field().options, vec!["Red", "Blue"]);
    }

    #[test]
    fn test_cancel_emits_no_field() {
        let mut editor = FieldEditor::new(EditorMode::Update, select_field(), vec![], "customer");
        assert_eq!(editor.apply(EditorAction::Cancel), Ok(Some(EditorEvent::Cancelled)));
    }

    #[test]
    fn test_logic_section_requires_other_fields() {
        let editor = FieldEditor::new(EditorMode::Update, select_field(), vec![], "customer");
        assert!(editor.view().logic.is_none());

        let mut other = Field::new(FieldType::Radio);
        other.id = "f0".to_string();
        other.text = "Subscribe?".to_string();
        let editor = FieldEditor::new(
            EditorMode::Update,
            select_field(),
            vec![other, select_field()],
            "customer",
        );

        let logic = editor.view().logic.unwrap();
        assert_eq!(logic.available_fields.len(), 1);
        assert_eq!(logic.available_fields[0].id, "f0");
        assert_eq!(logic.logics, select_field().logics);
    }

    #[test]
    fn test_actions_deserialize_from_wire_form() {
        let action: EditorAction = serde_json::from_value(json!({
            "action": "changeAttribute",
            "attribute": {"name": "isRequired", "value": true}
        }))
        .unwrap();
        assert_eq!(action, change(FieldAttribute::IsRequired(true)));

        let action: EditorAction = serde_json::from_value(json!({"action": "submit"})).unwrap();
        assert_eq!(action, EditorAction::Submit);

        let unknown = serde_json::from_value::<EditorAction>(json!({
            "action": "changeAttribute",
            "attribute": {"name": "colour", "value": "red"}
        }));
        assert!(unknown.is_err());
    }
}
