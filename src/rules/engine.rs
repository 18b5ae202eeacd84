use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::AppResult;
use crate::mail::{EmailRecord, MailService};
use crate::store::EmailStore;

use super::dispatch::ActionDispatcher;
use super::matcher::ConditionMatcher;
use super::model::Rule;

#[derive(Debug, Clone)]
pub struct AutomationConfig {
    pub time_zone: Tz,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub rules: usize,
    pub records: usize,
    pub fetched: Option<usize>,
    pub matches: usize,
    pub actions: usize,
    pub outcomes: Vec<RuleOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleOutcome {
    pub name: String,
    pub matched: Vec<String>,
    pub actions: usize,
}

/// Drives validation, retrieval, matching, and dispatch for one run.
pub struct Automation<M, S> {
    config: AutomationConfig,
    mail: M,
    store: S,
    clock: Option<DateTime<Utc>>,
}

impl<M: MailService, S: EmailStore> Automation<M, S> {
    pub fn new(config: AutomationConfig, mail: M, store: S) -> Self {
        Self {
            config,
            mail,
            store,
            clock: None,
        }
    }

    /// Pins the reference instant used for `lt`/`gt` windows.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    pub fn mail(&self) -> &M {
        &self.mail
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs validated rules, optionally syncing the store first. Rules only
    /// come out of [`super::schema::validate`], so a broken schema has already failed
    /// before anything here touches mail or storage.
    pub async fn run(&self, rules: &[Rule], force_retrieve: bool) -> AppResult<RunReport> {
        info!(rules = rules.len(), force_retrieve, "automation run started");
        let fetched = if force_retrieve {
            Some(sync_store(&self.mail, &self.store).await?)
        } else {
            None
        };

        let records = self.store.fetch_all()?;
        let mut report = self.apply(rules, &records).await?;
        report.fetched = fetched;

        info!(
            matches = report.matches,
            actions = report.actions,
            "automation run finished"
        );
        Ok(report)
    }

    /// Evaluates every rule against every record in the given order.
    pub async fn apply(&self, rules: &[Rule], records: &[EmailRecord]) -> AppResult<RunReport> {
        let matcher = match self.clock {
            Some(now) => ConditionMatcher::at(self.config.time_zone, now),
            None => ConditionMatcher::new(self.config.time_zone),
        };
        let mut dispatcher = ActionDispatcher::new(&self.mail);
        let mut outcomes = Vec::with_capacity(rules.len());

        for rule in rules {
            let mut outcome = RuleOutcome {
                name: rule.name.clone(),
                matched: Vec::new(),
                actions: 0,
            };

            for record in records {
                if !matcher.match_conditions(record, &rule.conditions, rule.predicate)? {
                    continue;
                }

                debug!(rule = %rule.name, message_id = %record.message_id, "rule matched");
                outcome.actions += dispatcher.perform_actions(record, &rule.actions).await?;
                outcome.matched.push(record.message_id.clone());
            }

            outcomes.push(outcome);
        }

        Ok(RunReport {
            rules: rules.len(),
            records: records.len(),
            fetched: None,
            matches: outcomes.iter().map(|outcome| outcome.matched.len()).sum(),
            actions: outcomes.iter().map(|outcome| outcome.actions).sum(),
            outcomes,
        })
    }
}

/// Fetches recent mail and upserts it. Returns how many rows were written.
pub async fn sync_store<M: MailService, S: EmailStore>(mail: &M, store: &S) -> AppResult<usize> {
    let fetched = mail.fetch_recent().await?;
    let stored = store.upsert(&fetched)?;
    info!(fetched = fetched.len(), stored, "mail synchronised");
    Ok(stored)
}
