pub mod dispatch;
pub mod engine;
pub mod matcher;
pub mod model;
pub mod schema;

pub use dispatch::ActionDispatcher;
pub use engine::{Automation, AutomationConfig, RuleOutcome, RunReport, sync_store};
pub use matcher::{ConditionMatcher, extract_address, match_string};
pub use model::{
    Action, ActionKind, Condition, ConditionValue, Field, FieldClass, Operator, Predicate, Rule,
};
