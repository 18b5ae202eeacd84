use serde::Serialize;

use crate::cli::ValidateArgs;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::output::OutputMode;
use crate::rules::{Rule, schema};

#[derive(Debug, Serialize)]
struct ValidationSummary<'a> {
    valid: bool,
    rules: &'a [Rule],
}

pub fn run(ctx: &AppContext, args: ValidateArgs) -> AppResult<()> {
    let rules = schema::load(&args.schema)?;

    if ctx.output.mode() == OutputMode::Text {
        println!("{}: {} rules valid", args.schema.display(), rules.len());
        for rule in &rules {
            println!("{}", describe_rule(rule));
        }
        return Ok(());
    }

    ctx.output.emit(
        "",
        &ValidationSummary {
            valid: true,
            rules: &rules,
        },
    )
}

fn describe_rule(rule: &Rule) -> String {
    let conditions = rule
        .conditions
        .iter()
        .map(|condition| format!("{} {} {}", condition.field, condition.operator, condition.value))
        .collect::<Vec<_>>()
        .join(", ");
    let actions = rule
        .actions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "- {} [{}]: {conditions} -> {actions}",
        rule.name, rule.predicate
    )
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::rules::{Action, Condition, ConditionValue, Field, Operator, Predicate};

    #[test]
    fn describes_rule_on_one_line() {
        let rule = Rule {
            name: "Invoices".to_string(),
            description: "tidy invoices".to_string(),
            predicate: Predicate::All,
            conditions: vec![
                Condition {
                    field: Field::Subject,
                    operator: Operator::Contains,
                    value: ConditionValue::Text("invoice".to_string()),
                },
                Condition {
                    field: Field::DateReceived,
                    operator: Operator::Eq,
                    value: ConditionValue::Date(NaiveDate::from_ymd_opt(2021, 7, 1).unwrap()),
                },
            ],
            actions: vec![Action::MarkAsRead],
        };

        let line = describe_rule(&rule);
        assert!(line.starts_with(r#"- Invoices [all]: subject contains "invoice""#));
        assert!(line.contains("date_received eq 01-07-2021"));
    }
}
