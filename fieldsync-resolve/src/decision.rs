//! Per-field decisions and the logs that collect them.

use crate::error::{ResolutionError, ResolutionResult};
use chrono::{DateTime, Utc};
use fieldsync_types::Side;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Why a field was (or was not) changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// Both sides held a value; the loser's was replaced.
    Updating,
    /// The loser was blank.
    Inserting,
    /// The winner was blank, so the loser's value is removed.
    Deleting,
    /// Merge mode filled a gap.
    Merging,
    /// A reflective field was tidied on its own side.
    Reflect,
    /// The values differ only superficially; nothing changes.
    Similar,
}

impl Reason {
    /// True for reasons that destroy an existing value.
    pub fn is_overwrite(self) -> bool {
        matches!(self, Reason::Updating | Reason::Deleting | Reason::Reflect)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Reason::Updating => "updating",
            Reason::Inserting => "inserting",
            Reason::Deleting => "deleting",
            Reason::Merging => "merging",
            Reason::Reflect => "reflect",
            Reason::Similar => "similar",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub handle: String,
    /// The side whose value changed; `None` for passes.
    pub subject: Option<Side>,
    /// The side whose value was kept; `None` for passes and reflections.
    pub winner: Option<Side>,
    pub reason: Reason,
    /// The subject's value before the change.
    pub old: Value,
    pub new: Value,
    pub m_time: Option<DateTime<Utc>>,
    pub s_time: Option<DateTime<Utc>>,
    /// Both sides changed after the last sync.
    pub concurrent: bool,
}

impl Decision {
    pub fn builder(handle: impl Into<String>) -> DecisionBuilder {
        DecisionBuilder {
            handle: handle.into(),
            ..DecisionBuilder::default()
        }
    }
}

/// Collects a decision's parameters; [`build`](Self::build) checks the
/// mandatory ones.
#[derive(Debug, Clone, Default)]
pub struct DecisionBuilder {
    handle: String,
    subject: Option<Side>,
    winner: Option<Side>,
    reason: Option<Reason>,
    old: Value,
    new: Value,
    m_time: Option<DateTime<Utc>>,
    s_time: Option<DateTime<Utc>>,
    concurrent: bool,
}

impl DecisionBuilder {
    pub fn subject(mut self, side: Side) -> Self {
        self.subject = Some(side);
        self
    }

    pub fn winner(mut self, side: Side) -> Self {
        self.winner = Some(side);
        self
    }

    pub fn reason(mut self, reason: Reason) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn values(mut self, old: Value, new: Value) -> Self {
        self.old = old;
        self.new = new;
        self
    }

    pub fn times(mut self, m_time: Option<DateTime<Utc>>, s_time: Option<DateTime<Utc>>) -> Self {
        self.m_time = m_time;
        self.s_time = s_time;
        self
    }

    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Fails with [`ResolutionError::Assertion`] if the handle or reason is
    /// missing, or a change has no subject.
    pub fn build(self) -> ResolutionResult<Decision> {
        if self.handle.is_empty() {
            return Err(ResolutionError::Assertion("decision without a handle".into()));
        }
        let reason = self.reason.ok_or_else(|| {
            ResolutionError::Assertion(format!("decision on {} without a reason", self.handle))
        })?;
        if reason != Reason::Similar && self.subject.is_none() {
            return Err(ResolutionError::Assertion(format!(
                "{reason} decision on {} without a subject",
                self.handle
            )));
        }
        Ok(Decision {
            handle: self.handle,
            subject: self.subject,
            winner: self.winner,
            reason,
            old: self.old,
            new: self.new,
            m_time: self.m_time,
            s_time: self.s_time,
            concurrent: self.concurrent,
        })
    }
}

/// Decisions in the order they were made.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DecisionLog {
    entries: Vec<Decision>,
}

impl DecisionLog {
    pub fn push(&mut self, decision: Decision) {
        self.entries.push(decision);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decision> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.entries.iter().any(|d| d.handle == handle)
    }

    pub fn for_handle<'a>(&'a self, handle: &'a str) -> impl Iterator<Item = &'a Decision> + 'a {
        self.entries.iter().filter(move |d| d.handle == handle)
    }

    /// Distinct handles, first decision first.
    pub fn handles(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for decision in &self.entries {
            if !seen.contains(&decision.handle.as_str()) {
                seen.push(decision.handle.as_str());
            }
        }
        seen
    }
}

impl<'a> IntoIterator for &'a DecisionLog {
    type Item = &'a Decision;
    type IntoIter = std::slice::Iter<'a, Decision>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A flattened decision for a reporting collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub handle: String,
    pub subject: String,
    pub winner: String,
    pub reason: Reason,
    pub old: String,
    pub new: String,
    pub m_time: Option<String>,
    pub s_time: Option<String>,
    pub problematic: bool,
}
