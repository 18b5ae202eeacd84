//! Turns an untyped rule document into validated [`Rule`]s.
//!
//! Validation is all-or-nothing: the first rule, condition, or action that
//! fails its checks aborts with an [`AppError::Schema`] naming the offending
//! JSON fragment.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{AppError, AppResult};

use super::model::{
    Action, ActionKind, Condition, ConditionValue, Field, FieldClass, Operator, Predicate, Rule,
};

/// Reads and validates a schema file. Read and parse failures are schema
/// errors too, so a broken file never gets as far as touching mail.
pub fn load(path: &Path) -> AppResult<Vec<Rule>> {
    let raw = fs::read_to_string(path).map_err(|err| {
        AppError::Schema(format!(
            "unable to read schema file {}: {err}",
            path.display()
        ))
    })?;

    let document: Value = serde_json::from_str(&raw).map_err(|err| {
        AppError::Schema(format!("invalid JSON in schema file {}: {err}", path.display()))
    })?;

    let rules = validate(&document)?;
    debug!(path = %path.display(), rules = rules.len(), "schema validated");
    Ok(rules)
}

pub fn validate(document: &Value) -> AppResult<Vec<Rule>> {
    let Some(entries) = document.as_array() else {
        return Err(invalid("schema must be a list of rules", document));
    };

    entries.iter().map(validate_rule).collect()
}

pub fn validate_rule(value: &Value) -> AppResult<Rule> {
    let Some(rule) = value.as_object() else {
        return Err(invalid("rule must be an object", value));
    };

    let name = required_text(rule, "name", "rule name is required", value)?;
    let description = required_text(rule, "description", "rule description is required", value)?;

    let predicate = match rule.get("predicate") {
        None | Some(Value::Null) => return Err(invalid("rule predicate is required", value)),
        Some(Value::String(raw)) if raw.trim().is_empty() => {
            return Err(invalid("rule predicate is required", value));
        }
        Some(Value::String(raw)) => raw
            .parse::<Predicate>()
            .map_err(|_| invalid(&format!("invalid predicate `{raw}`"), value))?,
        Some(_) => return Err(invalid("rule predicate must be a string", value)),
    };

    let conditions = required_list(rule, "conditions", value)?
        .iter()
        .map(validate_condition)
        .collect::<AppResult<Vec<_>>>()?;

    let actions = required_list(rule, "actions", value)?
        .iter()
        .map(validate_action)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Rule {
        name,
        description,
        predicate,
        conditions,
        actions,
    })
}

pub fn validate_condition(value: &Value) -> AppResult<Condition> {
    let Some(condition) = value.as_object() else {
        return Err(invalid("condition must be an object", value));
    };

    let raw_field = required_text(condition, "field", "field is required in condition", value)?;
    let field = raw_field
        .parse::<Field>()
        .map_err(|_| invalid(&format!("invalid field `{raw_field}`"), value))?;

    let raw_operator =
        required_text(condition, "operator", "operator is required in condition", value)?;
    let operator = raw_operator
        .parse::<Operator>()
        .ok()
        .filter(|operator| operator.allowed_for(field.class()))
        .ok_or_else(|| {
            invalid(
                &format!("invalid operator `{raw_operator}` for field `{field}`"),
                value,
            )
        })?;

    let operand = match condition.get("value") {
        None | Some(Value::Null) => return Err(invalid("value is required in condition", value)),
        Some(operand) => operand,
    };

    let parsed = match (field.class(), operator) {
        (FieldClass::Text, _) => ConditionValue::Text(text_operand(operand, value)?),
        (FieldClass::Date, Operator::Lt | Operator::Gt) => {
            ConditionValue::Days(days_operand(operand, value)?)
        }
        (FieldClass::Date, _) => {
            let raw = text_operand(operand, value)?;
            let date = ConditionValue::parse_date(&raw).ok_or_else(|| {
                invalid(
                    "invalid date, expected DD-MM-YYYY or DD-MM-YYYY HH:MM:SS",
                    value,
                )
            })?;
            ConditionValue::Date(date)
        }
    };

    Ok(Condition {
        field,
        operator,
        value: parsed,
    })
}

pub fn validate_action(value: &Value) -> AppResult<Action> {
    let Some(action) = value.as_object() else {
        return Err(invalid("action must be an object", value));
    };

    let raw_kind = required_text(action, "action", "action type is required", value)?;
    let kind = raw_kind
        .parse::<ActionKind>()
        .map_err(|_| invalid(&format!("invalid action type `{raw_kind}`"), value))?;

    Ok(match kind {
        ActionKind::MarkAsRead => Action::MarkAsRead,
        ActionKind::MarkAsUnread => Action::MarkAsUnread,
        ActionKind::MoveToMailbox => Action::MoveToMailbox {
            mailbox: required_text(
                action,
                "mailbox",
                "mailbox is required for move_to_mailbox",
                value,
            )?,
        },
    })
}

fn required_text(
    object: &Map<String, Value>,
    key: &str,
    missing: &str,
    fragment: &Value,
) -> AppResult<String> {
    match object.get(key) {
        None | Some(Value::Null) => Err(invalid(missing, fragment)),
        Some(Value::String(text)) if text.trim().is_empty() => Err(invalid(missing, fragment)),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) => Err(invalid(&format!("`{key}` must be a string"), fragment)),
    }
}

fn required_list<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    fragment: &Value,
) -> AppResult<&'a Vec<Value>> {
    match object.get(key) {
        Some(Value::Array(items)) if !items.is_empty() => Ok(items),
        None | Some(Value::Null) | Some(Value::Array(_)) => {
            Err(invalid(&format!("rule {key} are required"), fragment))
        }
        Some(_) => Err(invalid(&format!("rule {key} must be a list"), fragment)),
    }
}

fn text_operand(operand: &Value, fragment: &Value) -> AppResult<String> {
    let Some(text) = operand.as_str() else {
        return Err(invalid("value must be a string", fragment));
    };

    if text.trim().is_empty() {
        return Err(invalid("value is required in condition", fragment));
    }

    Ok(text.to_string())
}

fn days_operand(operand: &Value, fragment: &Value) -> AppResult<u32> {
    // Zero is a valid window ("received from now on"); negative counts are not.
    if operand.as_i64().is_some_and(|days| days < 0) {
        return Err(invalid("days must not be negative", fragment));
    }

    operand
        .as_u64()
        .and_then(|days| u32::try_from(days).ok())
        .ok_or_else(|| invalid("value must be an integer number of days", fragment))
}

fn invalid(message: &str, fragment: &Value) -> AppError {
    AppError::Schema(format!("{message} in {fragment}"))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    fn assert_schema_error(result: AppResult<impl std::fmt::Debug>, needle: &str) {
        match result {
            Err(AppError::Schema(message)) => {
                assert!(message.contains(needle), "`{message}` lacks `{needle}`")
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    fn rule_with(conditions: Value, actions: Value) -> Value {
        json!({
            "name": "Rule 1",
            "description": "Description 1",
            "predicate": "all",
            "conditions": conditions,
            "actions": actions,
        })
    }

    #[test]
    fn document_must_be_a_list() {
        assert_schema_error(validate(&json!({"name": "R1"})), "schema must be a list");
        assert_eq!(validate(&json!([])).expect("empty schema").len(), 0);
    }

    #[test]
    fn rule_requires_every_top_level_key() {
        assert_schema_error(validate_rule(&json!({"name": ""})), "rule name is required");
        assert_schema_error(
            validate_rule(&json!({"name": "Rule 1", "description": ""})),
            "rule description is required",
        );
        assert_schema_error(
            validate_rule(&json!({"name": "Rule 1", "description": "d", "conditions": []})),
            "rule predicate is required",
        );

        let mut rule = rule_with(json!([]), json!([{"action": "mark_as_read"}]));
        assert_schema_error(validate_rule(&rule), "rule conditions are required");

        rule["conditions"] = json!("invalid");
        assert_schema_error(validate_rule(&rule), "rule conditions must be a list");

        let rule = rule_with(
            json!([{"field": "subject", "operator": "contains", "value": "x"}]),
            json!([]),
        );
        assert_schema_error(validate_rule(&rule), "rule actions are required");
    }

    #[test]
    fn rejects_unknown_predicate_with_fragment() {
        let mut rule = rule_with(
            json!([{"field": "subject", "operator": "contains", "value": "x"}]),
            json!([{"action": "mark_as_read"}]),
        );
        rule["predicate"] = json!("invalid");

        assert_schema_error(validate_rule(&rule), "invalid predicate `invalid`");
        assert_schema_error(validate_rule(&rule), "\"Rule 1\"");
    }

    #[test]
    fn validates_string_conditions() {
        for field in ["from", "to", "subject"] {
            let condition =
                validate_condition(&json!({"field": field, "operator": "contains", "value": "test"}))
                    .expect("valid condition");
            assert_eq!(condition.value, ConditionValue::Text("test".to_string()));
        }

        assert_schema_error(
            validate_condition(&json!({"field": "invalid", "operator": "contains", "value": "t"})),
            "invalid field `invalid`",
        );
        assert_schema_error(
            validate_condition(&json!({"field": "to", "operator": "invalid", "value": "t"})),
            "invalid operator `invalid`",
        );
        assert_schema_error(
            validate_condition(&json!({"field": "to", "operator": "lt", "value": "t"})),
            "invalid operator `lt` for field `to`",
        );
        assert_schema_error(
            validate_condition(&json!({"field": "to", "operator": "contains", "value": ""})),
            "value is required",
        );
        assert_schema_error(
            validate_condition(&json!({"field": "subject", "operator": "eq", "value": 3})),
            "value must be a string",
        );
        assert_schema_error(
            validate_condition(&json!({"field": "", "operator": "eq", "value": "x"})),
            "field is required",
        );
    }

    #[test]
    fn validates_date_conditions() {
        let older = validate_condition(&json!({"field": "date_received", "operator": "gt", "value": 2}))
            .expect("valid gt");
        assert_eq!(older.value, ConditionValue::Days(2));

        let on = validate_condition(
            &json!({"field": "date_received", "operator": "eq", "value": "12-12-2020 12:12:12"}),
        )
        .expect("valid eq");
        assert_eq!(
            on.value,
            ConditionValue::Date(NaiveDate::from_ymd_opt(2020, 12, 12).unwrap())
        );

        assert_schema_error(
            validate_condition(&json!({"field": "date_received", "operator": "eq", "value": 2})),
            "value must be a string",
        );
        assert_schema_error(
            validate_condition(&json!({"field": "date_received", "operator": "lt", "value": "test"})),
            "integer number of days",
        );
        assert_schema_error(
            validate_condition(&json!({"field": "date_received", "operator": "lt", "value": 1.5})),
            "integer number of days",
        );
        assert_schema_error(
            validate_condition(&json!({"field": "date_received", "operator": "gt", "value": -1})),
            "must not be negative",
        );
        assert_schema_error(
            validate_condition(&json!({"field": "date_received", "operator": "eq", "value": "2020-12-12"})),
            "invalid date",
        );
        assert_schema_error(
            validate_condition(&json!({"field": "date_received", "operator": "eq", "value": "2020-13-01"})),
            "invalid date",
        );
        assert_schema_error(
            validate_condition(&json!({"field": "date_received", "operator": "contains", "value": "x"})),
            "invalid operator",
        );
    }

    #[test]
    fn accepts_day_counts_beyond_the_calendar() {
        let condition = validate_condition(
            &json!({"field": "date_received", "operator": "gt", "value": 100_000_000}),
        )
        .expect("large windows are valid");
        assert_eq!(condition.value, ConditionValue::Days(100_000_000));

        let zero = validate_condition(&json!({"field": "date_received", "operator": "lt", "value": 0}))
            .expect("zero days is valid");
        assert_eq!(zero.value, ConditionValue::Days(0));

        assert_schema_error(
            validate_condition(
                &json!({"field": "date_received", "operator": "lt", "value": 5_000_000_000u64}),
            ),
            "integer number of days",
        );
    }

    #[test]
    fn keys_are_matched_verbatim() {
        assert_schema_error(
            validate_condition(&json!({"field": "subject", "operator": " eq ", "value": "x"})),
            "invalid operator ` eq `",
        );
        assert_schema_error(
            validate_condition(&json!({"field": "subject ", "operator": "eq", "value": "x"})),
            "invalid field `subject `",
        );
        assert_eq!(
            validate_action(&json!({"action": "move_to_mailbox", "mailbox": " Bills "}))
                .expect("padded mailbox names are kept"),
            Action::MoveToMailbox {
                mailbox: " Bills ".to_string()
            }
        );
        assert_schema_error(
            validate_action(&json!({"action": "move_to_mailbox", "mailbox": "   "})),
            "mailbox is required",
        );
    }

    #[test]
    fn validates_actions() {
        assert_eq!(
            validate_action(&json!({"action": "mark_as_read"})).expect("valid"),
            Action::MarkAsRead
        );
        assert_eq!(
            validate_action(&json!({"action": "mark_as_unread"})).expect("valid"),
            Action::MarkAsUnread
        );
        assert_eq!(
            validate_action(&json!({"action": "move_to_mailbox", "mailbox": "test"}))
                .expect("valid"),
            Action::MoveToMailbox {
                mailbox: "test".to_string()
            }
        );

        assert_schema_error(validate_action(&json!({})), "action type is required");
        assert_schema_error(
            validate_action(&json!({"action": "invalid"})),
            "invalid action type",
        );
        assert_schema_error(
            validate_action(&json!({"action": "move_to_mailbox"})),
            "mailbox is required",
        );
        assert_schema_error(
            validate_action(&json!({"action": "move_to_mailbox", "mailbox": ""})),
            "mailbox is required",
        );
    }

    #[test]
    fn first_bad_rule_aborts_the_document() {
        let good = rule_with(
            json!([{"field": "subject", "operator": "contains", "value": "x"}]),
            json!([{"action": "mark_as_read"}]),
        );
        let bad = rule_with(
            json!([{"field": "subject", "operator": "contains", "value": "x"}]),
            json!([{"action": "archive"}]),
        );

        assert_schema_error(validate(&json!([good, bad])), "invalid action type `archive`");
    }

    #[test]
    fn validation_is_idempotent() {
        let document = json!([rule_with(
            json!([
                {"field": "from", "operator": "eq", "value": "billing@example.com"},
                {"field": "date_received", "operator": "lt", "value": 7}
            ]),
            json!([{"action": "mark_as_read"}, {"action": "move_to_mailbox", "mailbox": "Bills"}]),
        )]);

        assert_eq!(
            validate(&document).expect("first pass"),
            validate(&document).expect("second pass")
        );
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_schema_error(load(&dir.path().join("missing.json")), "unable to read");

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "[{").expect("write schema");
        assert_schema_error(load(&broken), "invalid JSON");
    }
}
