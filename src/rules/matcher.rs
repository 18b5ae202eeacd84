use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use regex::Regex;

use crate::error::{AppError, AppResult};
use crate::mail::EmailRecord;

use super::model::{Condition, ConditionValue, Field, Operator, Predicate};

static EMAIL_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap()
});

/// Evaluates validated conditions against records.
///
/// `now` is captured once at construction so every record in a run is
/// measured against the same window edge for `lt`/`gt`.
#[derive(Debug, Clone)]
pub struct ConditionMatcher {
    tz: Tz,
    now: DateTime<Tz>,
}

impl ConditionMatcher {
    pub fn new(tz: Tz) -> Self {
        Self::at(tz, Utc::now())
    }

    pub fn at(tz: Tz, now: DateTime<Utc>) -> Self {
        Self {
            tz,
            now: now.with_timezone(&tz),
        }
    }

    pub fn now(&self) -> DateTime<Tz> {
        self.now
    }

    /// Requires a non-empty condition list. `All` stops at the first miss,
    /// `Any` at the first hit.
    pub fn match_conditions(
        &self,
        record: &EmailRecord,
        conditions: &[Condition],
        predicate: Predicate,
    ) -> AppResult<bool> {
        if conditions.is_empty() {
            return Err(AppError::Evaluation(
                "cannot evaluate a rule without conditions".to_string(),
            ));
        }

        match predicate {
            Predicate::All => {
                for condition in conditions {
                    if !self.match_condition(record, condition)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Any => {
                for condition in conditions {
                    if self.match_condition(record, condition)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    pub fn match_condition(&self, record: &EmailRecord, condition: &Condition) -> AppResult<bool> {
        match condition.field {
            Field::From | Field::To => {
                let target = text_target(condition)?;
                let header = if condition.field == Field::From {
                    &record.from
                } else {
                    &record.to
                };

                match extract_address(header) {
                    Some(address) => match_string(address, condition.operator, target),
                    None => Ok(false),
                }
            }
            Field::Subject => {
                match_string(&record.subject, condition.operator, text_target(condition)?)
            }
            Field::DateReceived => {
                self.match_date(&record.date, condition.operator, &condition.value)
            }
        }
    }

    pub fn match_date(
        &self,
        received: &DateTime<Tz>,
        operator: Operator,
        target: &ConditionValue,
    ) -> AppResult<bool> {
        let received = received.with_timezone(&self.tz);

        match (operator, target) {
            (Operator::Eq, ConditionValue::Date(day)) => Ok(received.date_naive() == *day),
            (Operator::Neq, ConditionValue::Date(day)) => Ok(received.date_naive() != *day),
            // A window reaching past the earliest representable instant covers
            // every possible date.
            (Operator::Gt, ConditionValue::Days(days)) => Ok(self
                .window_start(*days)
                .is_some_and(|start| received < start)),
            (Operator::Lt, ConditionValue::Days(days)) => Ok(self
                .window_start(*days)
                .is_none_or(|start| received >= start)),
            (operator, target) => Err(AppError::Evaluation(format!(
                "operator `{operator}` cannot compare a received date with {target}"
            ))),
        }
    }

    fn window_start(&self, days: u32) -> Option<DateTime<Tz>> {
        self.now
            .checked_sub_signed(Duration::try_days(i64::from(days))?)
    }
}

/// Compares trimmed operands. Only the string operators are legal here.
pub fn match_string(value: &str, operator: Operator, target: &str) -> AppResult<bool> {
    let value = value.trim();
    let target = target.trim();

    match operator {
        Operator::Eq => Ok(value == target),
        Operator::Neq => Ok(value != target),
        Operator::Contains => Ok(value.contains(target)),
        Operator::NotContains => Ok(!value.contains(target)),
        Operator::Lt | Operator::Gt => Err(AppError::Evaluation(format!(
            "operator `{operator}` is not a string comparison"
        ))),
    }
}

/// First `local@domain` address inside a header such as `Jane <jane@x.io>`.
pub fn extract_address(header: &str) -> Option<&str> {
    EMAIL_ADDRESS.find(header).map(|found| found.as_str())
}

fn text_target(condition: &Condition) -> AppResult<&str> {
    match &condition.value {
        ConditionValue::Text(text) => Ok(text),
        other => Err(AppError::Evaluation(format!(
            "field `{}` needs a string value, got {other}",
            condition.field
        ))),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;

    const TZ: Tz = chrono_tz::Asia::Kolkata;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn matcher() -> ConditionMatcher {
        ConditionMatcher::at(TZ, fixed_now())
    }

    fn record_at(date: DateTime<Tz>) -> EmailRecord {
        EmailRecord {
            message_id: "m-1".to_string(),
            subject: "Your invoice #123".to_string(),
            snippet: "amount due".to_string(),
            date,
            from: "Billing Team <billing@example.com>".to_string(),
            to: "me@example.org".to_string(),
        }
    }

    fn record() -> EmailRecord {
        record_at(fixed_now().with_timezone(&TZ))
    }

    fn text(field: Field, operator: Operator, value: &str) -> Condition {
        Condition {
            field,
            operator,
            value: ConditionValue::Text(value.to_string()),
        }
    }

    fn days(operator: Operator, days: u32) -> Condition {
        Condition {
            field: Field::DateReceived,
            operator,
            value: ConditionValue::Days(days),
        }
    }

    #[test]
    fn string_operators() {
        assert!(match_string("abc", Operator::Eq, "abc").unwrap());
        assert!(!match_string("abc", Operator::Eq, "xyz").unwrap());
        assert!(match_string("abc", Operator::Neq, "xyz").unwrap());
        assert!(!match_string("abc", Operator::Neq, "abc").unwrap());
        assert!(match_string("abc", Operator::Contains, "b").unwrap());
        assert!(!match_string("abc", Operator::Contains, "x").unwrap());
        assert!(match_string("abc", Operator::NotContains, "x").unwrap());
        assert!(!match_string("abc", Operator::NotContains, "b").unwrap());
    }

    #[test]
    fn string_matching_trims_operands() {
        assert!(match_string(" abc ", Operator::Eq, "abc").unwrap());
        assert!(match_string("abc", Operator::Eq, "  abc\n").unwrap());
    }

    #[test]
    fn string_matching_rejects_date_operators() {
        assert!(matches!(
            match_string("abc", Operator::Gt, "a"),
            Err(AppError::Evaluation(_))
        ));
    }

    #[test]
    fn extracts_first_address_from_header() {
        assert_eq!(extract_address("abc <abc@abc.com>"), Some("abc@abc.com"));
        assert_eq!(
            extract_address("a@one.io, b@two.io"),
            Some("a@one.io")
        );
        assert_eq!(extract_address("Maria <maria.maria.com>"), None);
    }

    #[test]
    fn address_fields_compare_extracted_address() {
        let record = record();
        let matcher = matcher();

        assert!(matcher
            .match_condition(&record, &text(Field::From, Operator::Eq, "billing@example.com"))
            .unwrap());
        assert!(!matcher
            .match_condition(&record, &text(Field::From, Operator::Contains, "Billing Team"))
            .unwrap());
        assert!(matcher
            .match_condition(&record, &text(Field::To, Operator::Contains, "example.org"))
            .unwrap());
    }

    #[test]
    fn missing_address_never_matches() {
        let mut record = record();
        record.from = "Undisclosed recipients".to_string();

        let matcher = matcher();
        for operator in [Operator::Eq, Operator::Neq, Operator::Contains, Operator::NotContains] {
            assert!(!matcher
                .match_condition(&record, &text(Field::From, operator, "x@y.com"))
                .unwrap());
        }
    }

    #[test]
    fn subject_uses_raw_value() {
        assert!(matcher()
            .match_condition(&record(), &text(Field::Subject, Operator::Contains, "invoice"))
            .unwrap());
    }

    #[test]
    fn date_equality_ignores_time_of_day() {
        let received = TZ.with_ymd_and_hms(2020, 12, 12, 23, 0, 0).unwrap();
        let day = ConditionValue::Date(NaiveDate::from_ymd_opt(2020, 12, 12).unwrap());
        let matcher = matcher();

        assert!(matcher.match_date(&received, Operator::Eq, &day).unwrap());
        assert!(!matcher.match_date(&received, Operator::Neq, &day).unwrap());
    }

    #[test]
    fn date_equality_uses_reference_timezone() {
        // 20:00 UTC on the 1st is already the 2nd in Kolkata.
        let received = Utc
            .with_ymd_and_hms(2021, 7, 1, 20, 0, 0)
            .unwrap()
            .with_timezone(&chrono_tz::UTC);
        let second = ConditionValue::Date(NaiveDate::from_ymd_opt(2021, 7, 2).unwrap());

        assert!(matcher().match_date(&received, Operator::Eq, &second).unwrap());
    }

    #[test]
    fn day_windows_partition_received_dates() {
        let matcher = matcher();
        let now = matcher.now();
        let samples = [
            now,
            now - Duration::days(1),
            now - Duration::days(2) + Duration::seconds(1),
            now - Duration::days(2) - Duration::seconds(1),
            now - Duration::days(3),
            now + Duration::days(2),
        ];

        for received in samples {
            let older = matcher.match_date(&received, Operator::Gt, &ConditionValue::Days(2)).unwrap();
            let within = matcher.match_date(&received, Operator::Lt, &ConditionValue::Days(2)).unwrap();
            assert_ne!(older, within, "exactly one window should hold for {received}");
        }

        let recent = matcher.match_date(&(now - Duration::days(1)), Operator::Lt, &ConditionValue::Days(2));
        assert!(recent.unwrap());
        let old = matcher.match_date(&(now - Duration::days(3)), Operator::Gt, &ConditionValue::Days(2));
        assert!(old.unwrap());
    }

    #[test]
    fn window_boundary_counts_as_within() {
        let matcher = matcher();
        let boundary = matcher.now() - Duration::days(2);

        assert!(matcher.match_date(&boundary, Operator::Lt, &ConditionValue::Days(2)).unwrap());
        assert!(!matcher.match_date(&boundary, Operator::Gt, &ConditionValue::Days(2)).unwrap());
    }

    #[test]
    fn windows_beyond_the_calendar_do_not_panic() {
        let matcher = matcher();
        let received = TZ.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        let huge = ConditionValue::Days(100_000_000);

        assert!(!matcher.match_date(&received, Operator::Gt, &huge).unwrap());
        assert!(matcher.match_date(&received, Operator::Lt, &huge).unwrap());

        let max = ConditionValue::Days(u32::MAX);
        assert!(!matcher.match_condition(&record(), &days(Operator::Gt, u32::MAX)).unwrap());
        assert!(matcher.match_date(&received, Operator::Lt, &max).unwrap());
    }

    #[test]
    fn predicates_combine_conditions() {
        let record = record();
        let matcher = matcher();
        let hit = text(Field::Subject, Operator::Contains, "invoice");
        let miss = text(Field::Subject, Operator::Contains, "newsletter");

        let both = [hit.clone(), miss.clone()];
        assert!(!matcher.match_conditions(&record, &both, Predicate::All).unwrap());
        assert!(matcher.match_conditions(&record, &both, Predicate::Any).unwrap());

        let hits = [hit.clone(), days(Operator::Lt, 1)];
        assert!(matcher.match_conditions(&record, &hits, Predicate::All).unwrap());

        let misses = [miss, days(Operator::Gt, 1)];
        assert!(!matcher.match_conditions(&record, &misses, Predicate::Any).unwrap());
    }

    #[test]
    fn single_condition_predicates_agree() {
        let record = record();
        let matcher = matcher();
        let conditions = [
            text(Field::Subject, Operator::Contains, "invoice"),
            text(Field::From, Operator::Neq, "billing@example.com"),
            days(Operator::Gt, 0),
            days(Operator::Lt, 0),
        ];

        for condition in conditions {
            let single = matcher.match_condition(&record, &condition).unwrap();
            let list = std::slice::from_ref(&condition);
            assert_eq!(matcher.match_conditions(&record, list, Predicate::All).unwrap(), single);
            assert_eq!(matcher.match_conditions(&record, list, Predicate::Any).unwrap(), single);
        }
    }

    #[test]
    fn short_circuits_before_malformed_conditions() {
        let record = record();
        let matcher = matcher();
        let malformed = Condition {
            field: Field::Subject,
            operator: Operator::Eq,
            value: ConditionValue::Days(3),
        };

        let any = [text(Field::Subject, Operator::Contains, "invoice"), malformed.clone()];
        assert!(matcher.match_conditions(&record, &any, Predicate::Any).unwrap());

        let all = [text(Field::Subject, Operator::Contains, "invoice"), malformed];
        assert!(matches!(
            matcher.match_conditions(&record, &all, Predicate::All),
            Err(AppError::Evaluation(_))
        ));
    }

    #[test]
    fn mismatched_date_operand_fails_loudly() {
        let record = record();
        let condition = Condition {
            field: Field::DateReceived,
            operator: Operator::Eq,
            value: ConditionValue::Days(2),
        };

        assert!(matches!(
            matcher().match_condition(&record, &condition),
            Err(AppError::Evaluation(_))
        ));
        assert!(matches!(
            matcher().match_conditions(&record, &[], Predicate::All),
            Err(AppError::Evaluation(_))
        ));
    }
}
