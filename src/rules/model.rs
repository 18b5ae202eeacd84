use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

use crate::error::AppError;

/// Accepted layouts for `date_received` equality targets.
pub const DATE_LAYOUTS: [&str; 2] = ["%d-%m-%Y", "%d-%m-%Y %H:%M:%S"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub name: String,
    pub description: String,
    pub predicate: Predicate,
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    All,
    Any,
}

impl FromStr for Predicate {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all" => Ok(Self::All),
            "any" => Ok(Self::Any),
            other => Err(AppError::InvalidPredicate(other.to_string())),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Any => "any",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condition {
    pub field: Field,
    pub operator: Operator,
    pub value: ConditionValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    From,
    To,
    Subject,
    DateReceived,
}

/// Fields share operator vocabularies by class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    Text,
    Date,
}

impl Field {
    pub fn class(self) -> FieldClass {
        match self {
            Self::From | Self::To | Self::Subject => FieldClass::Text,
            Self::DateReceived => FieldClass::Date,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::From => "from",
            Self::To => "to",
            Self::Subject => "subject",
            Self::DateReceived => "date_received",
        }
    }
}

impl FromStr for Field {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "from" => Ok(Self::From),
            "to" => Ok(Self::To),
            "subject" => Ok(Self::Subject),
            "date_received" => Ok(Self::DateReceived),
            other => Err(AppError::Evaluation(format!("unknown field `{other}`"))),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    #[serde(rename = "eq")]
    Eq,
    #[serde(rename = "neq")]
    Neq,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "ncontains")]
    NotContains,
    #[serde(rename = "lt")]
    Lt,
    #[serde(rename = "gt")]
    Gt,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Contains => "contains",
            Self::NotContains => "ncontains",
            Self::Lt => "lt",
            Self::Gt => "gt",
        }
    }

    pub fn allowed_for(self, class: FieldClass) -> bool {
        match class {
            FieldClass::Text => matches!(
                self,
                Self::Eq | Self::Neq | Self::Contains | Self::NotContains
            ),
            FieldClass::Date => matches!(self, Self::Eq | Self::Neq | Self::Lt | Self::Gt),
        }
    }
}

impl FromStr for Operator {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "eq" => Ok(Self::Eq),
            "neq" => Ok(Self::Neq),
            "contains" => Ok(Self::Contains),
            "ncontains" => Ok(Self::NotContains),
            "lt" => Ok(Self::Lt),
            "gt" => Ok(Self::Gt),
            other => Err(AppError::Evaluation(format!("unknown operator `{other}`"))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A condition operand. `Date` keeps only the calendar day of the target,
/// `Days` is the window size for `lt`/`gt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionValue {
    Text(String),
    Date(NaiveDate),
    Days(u32),
}

impl ConditionValue {
    pub fn parse_date(value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        NaiveDate::parse_from_str(value, DATE_LAYOUTS[0])
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(value, DATE_LAYOUTS[1])
                    .ok()
                    .map(|datetime| datetime.date())
            })
    }
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "\"{text}\""),
            Self::Date(date) => write!(f, "{}", date.format(DATE_LAYOUTS[0])),
            Self::Days(days) => write!(f, "{days} days"),
        }
    }
}

impl Serialize for ConditionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::Date(date) => serializer.collect_str(&date.format(DATE_LAYOUTS[0])),
            Self::Days(days) => serializer.serialize_u32(*days),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    MarkAsRead,
    MarkAsUnread,
    MoveToMailbox { mailbox: String },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::MarkAsRead => ActionKind::MarkAsRead,
            Self::MarkAsUnread => ActionKind::MarkAsUnread,
            Self::MoveToMailbox { .. } => ActionKind::MoveToMailbox,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MoveToMailbox { mailbox } => write!(f, "move_to_mailbox({mailbox})"),
            other => f.write_str(other.kind().as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    MarkAsRead,
    MarkAsUnread,
    MoveToMailbox,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MarkAsRead => "mark_as_read",
            Self::MarkAsUnread => "mark_as_unread",
            Self::MoveToMailbox => "move_to_mailbox",
        }
    }
}

impl FromStr for ActionKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "mark_as_read" => Ok(Self::MarkAsRead),
            "mark_as_unread" => Ok(Self::MarkAsUnread),
            "move_to_mailbox" => Ok(Self::MoveToMailbox),
            other => Err(AppError::InvalidAction(other.to_string())),
        }
    }
}
