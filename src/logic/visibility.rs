use serde_json::Value;
use std::collections::HashMap;

use crate::model::{Field, FieldLogic, Id, LogicAction, LogicOperator};

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Evaluate one rule against the current value of the field it refers to.
/// Checkbox answers are arrays; text operators match if any item matches.
pub fn evaluate_logic(logic: &FieldLogic, value: Option<&Value>) -> bool {
    let expected = &logic.logic_value;

    if let Some(Value::Array(items)) = value {
        return match logic.logic_operator {
            LogicOperator::IsUnknown => items.is_empty(),
            LogicOperator::HasAnyValue => !items.is_empty(),
            LogicOperator::IsNot | LogicOperator::DoesNotContain => items
                .iter()
                .all(|item| evaluate_logic(logic, Some(item))),
            _ => items.iter().any(|item| evaluate_logic(logic, Some(item))),
        };
    }

    match logic.logic_operator {
        LogicOperator::IsUnknown => is_blank(value),
        LogicOperator::HasAnyValue => !is_blank(value),
        _ if value.is_none() => false,
        LogicOperator::Is => value.map(as_text) == Some(as_text(expected)),
        LogicOperator::IsNot => value.map(as_text) != Some(as_text(expected)),
        LogicOperator::StartsWith => value
            .map(|v| as_text(v).starts_with(&as_text(expected)))
            .unwrap_or(false),
        LogicOperator::EndsWith => value
            .map(|v| as_text(v).ends_with(&as_text(expected)))
            .unwrap_or(false),
        LogicOperator::Contains => value
            .map(|v| as_text(v).contains(&as_text(expected)))
            .unwrap_or(false),
        LogicOperator::DoesNotContain => value
            .map(|v| !as_text(v).contains(&as_text(expected)))
            .unwrap_or(false),
        LogicOperator::GreaterThan => match (value.and_then(as_number), as_number(expected)) {
            (Some(actual), Some(bound)) => actual > bound,
            _ => false,
        },
        LogicOperator::LessThan => match (value.and_then(as_number), as_number(expected)) {
            (Some(actual), Some(bound)) => actual < bound,
            _ => false,
        },
    }
}

/// Whether `field` is shown given the answers collected so far.
/// All rules must hold for the logic action to apply; a field with no
/// rules is always shown.
pub fn is_field_visible(field: &Field, values: &HashMap<Id, Value>) -> bool {
    if field.logics.is_empty() {
        return true;
    }

    let matched = field
        .logics
        .iter()
        .all(|logic| evaluate_logic(logic, values.get(&logic.field_id)));

    match field.logic_action.unwrap_or(LogicAction::Show) {
        LogicAction::Show => matched,
        LogicAction::Hide => !matched,
    }
}

/// Ids of the fields of a form that are visible for `values`
pub fn visible_fields<'a>(fields: &'a [Field], values: &HashMap<Id, Value>) -> Vec<&'a Id> {
    fields
        .iter()
        .filter(|f| is_field_visible(f, values))
        .map(|f| &f.id)
        .collect()
}
