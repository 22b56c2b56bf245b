//! Urgency scoring.
//!
//! A [`Curator`] holds a set of named rules. Each rule looks at a task and
//! returns a [`Weight`]; the urgency is the sum of `coefficient * multiplier`
//! over all rules.

use crate::types::{EffortImpact, Task};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A single rule's contribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Weight {
    pub coefficient: f64,
    pub multiplier: i64,
    pub unit: String,
}

impl Weight {
    pub fn new(coefficient: f64, multiplier: i64, unit: impl Into<String>) -> Self {
        Self {
            coefficient,
            multiplier,
            unit: unit.into(),
        }
    }

    /// Contributes nothing and is left out of descriptions.
    pub fn none() -> Self {
        Self::new(0.0, 0, "")
    }

    pub fn value(&self) -> f64 {
        self.coefficient * self.multiplier as f64
    }
}

/// How a named rule contributed to a task's urgency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightDescription {
    pub name: String,
    pub coefficient: f64,
    pub multiplier: i64,
    pub unit: String,
}

/// A scoring rule, evaluated against the curator's present.
pub type Rule = Box<dyn Fn(&Task, DateTime<Utc>) -> Weight + Send + Sync>;

/// Whole days between two instants, truncated toward zero.
fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 86_400_000.0
}

fn effort_rule(task: &Task, _now: DateTime<Utc>) -> Weight {
    let code = task.effort_impact.code().to_string();
    match task.effort_impact {
        EffortImpact::High => Weight::new(3.0, 1, code),
        EffortImpact::Medium => Weight::new(2.0, 1, code),
        EffortImpact::Low => Weight::new(1.0, 1, code),
        EffortImpact::Unset | EffortImpact::Avoid => Weight::none(),
    }
}

fn children_rule(task: &Task, _now: DateTime<Utc>) -> Weight {
    if task.children.is_empty() {
        Weight::none()
    } else {
        Weight::new(1.0, 1, "has children")
    }
}

fn next_rule(task: &Task, _now: DateTime<Utc>) -> Weight {
    if task.has_tag("next") {
        Weight::new(15.0, 1, "has next tag")
    } else {
        Weight::none()
    }
}

fn due_rule(task: &Task, now: DateTime<Utc>) -> Weight {
    let Some(due) = task.due else {
        return Weight::none();
    };
    let lateness = days_between(due, now).trunc();
    if lateness >= 7.0 {
        Weight::new(1.0, 1, "maxed out lateness at 1 week overdue")
    } else if lateness >= -14.0 {
        Weight::new(((lateness + 14.0) * 0.8 / 21.0) + 0.2, 1, "approaching")
    } else {
        Weight::new(0.2, 1, "due in over 2 weeks")
    }
}

fn age_rule(task: &Task, now: DateTime<Utc>) -> Weight {
    let Some(added) = task.added else {
        return Weight::none();
    };
    let days = days_between(added, now);
    if days < 1.0 {
        return Weight::new(0.0, 0, "super new");
    }
    Weight::new(1.0 / days, 1, format!("days ({})", days.trunc() as i64))
}

/// The stock rule set: effort, children, next, due and age.
pub fn default_rules() -> BTreeMap<String, Rule> {
    let mut rules: BTreeMap<String, Rule> = BTreeMap::new();
    rules.insert("effort".into(), Box::new(effort_rule));
    rules.insert("children".into(), Box::new(children_rule));
    rules.insert("next".into(), Box::new(next_rule));
    rules.insert("due".into(), Box::new(due_rule));
    rules.insert("age".into(), Box::new(age_rule));
    rules
}

/// Decides how urgent a task is.
pub struct Curator {
    rules: BTreeMap<String, Rule>,
    present: Option<DateTime<Utc>>,
}

impl Default for Curator {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            present: None,
        }
    }
}

impl fmt::Debug for Curator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Curator")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .field("present", &self.present)
            .finish()
    }
}

impl Curator {
    /// Replace the whole rule set.
    pub fn with_rules(mut self, rules: BTreeMap<String, Rule>) -> Self {
        self.rules = rules;
        self
    }

    /// Add or replace one named rule.
    pub fn with_rule<F>(mut self, name: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&Task, DateTime<Utc>) -> Weight + Send + Sync + 'static,
    {
        self.rules.insert(name.into(), Box::new(rule));
        self
    }

    /// Pin the evaluation instant instead of reading the clock.
    pub fn at(mut self, present: DateTime<Utc>) -> Self {
        self.present = Some(present);
        self
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    fn now(&self) -> DateTime<Utc> {
        self.present.unwrap_or_else(Utc::now)
    }

    pub fn weigh(&self, task: &Task) -> f64 {
        let now = self.now();
        self.rules.values().map(|rule| rule(task, now).value()).sum()
    }

    /// Weight plus the per-rule breakdown, omitting rules that did not apply.
    pub fn weigh_and_describe(&self, task: &Task) -> (f64, Vec<WeightDescription>) {
        let now = self.now();
        let mut total = 0.0;
        let mut described = Vec::new();
        for (name, rule) in &self.rules {
            let weight = rule(task, now);
            total += weight.value();
            if weight.multiplier != 0 {
                described.push(WeightDescription {
                    name: name.clone(),
                    coefficient: weight.coefficient,
                    multiplier: weight.multiplier,
                    unit: weight.unit,
                });
            }
        }
        (total, described)
    }
}
