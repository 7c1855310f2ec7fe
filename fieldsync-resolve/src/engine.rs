//! The conflict resolution engine.
//!
//! A [`Resolver`] holds everything shared by the pairs of a run: the
//! registry, the [`SyncContext`] and the comparison/reflection tables. It is
//! immutable and can be shared across threads.
//!
//! A [`ConflictUpdate`] holds one pair. Its field pass runs once; afterwards
//! it is only read (for patches and reports) and then dropped.
//!
//! Per field, in dependency order:
//! 1. reflective fields are tidied on each side first;
//! 2. identical values (equal, or both blank) are left alone;
//! 3. similar values are logged as a pass;
//! 4. otherwise a winner is picked and its value copied onto the loser, along
//!    with the field's aliases.

use crate::arena::SnapshotArena;
use crate::context::SyncContext;
use crate::decision::{Decision, DecisionLog, Reason, ReportRow};
use crate::error::{ResolutionError, ResolutionResult};
use crate::patch::Patch;
use crate::reflect::Reflectors;
use crate::similarity::Comparators;
use chrono::{DateTime, Utc};
use fieldsync_schema::{ConfigError, MetadataRegistry, Scope, SyncMode};
use fieldsync_types::{is_blank, time, value_to_text, Record, Side, TimeUtil};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Decides a field neither side has a modification time for.
///
/// Returning true lets the slave's value win. Whether a slave-side edit can
/// be inferred from the values alone is a business rule, so it is supplied by
/// the host rather than built in.
pub trait EditHeuristic: Send + Sync {
    fn slave_may_have_edited(&self, handle: &str, master: &Value, slave: &Value) -> bool;
}

/// Never infers a slave edit: master wins untimed conflicts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSlaveEdited;

impl EditHeuristic for NeverSlaveEdited {
    fn slave_may_have_edited(&self, _handle: &str, _master: &Value, _slave: &Value) -> bool {
        false
    }
}

/// Shared, read-only resolution settings for a run.
pub struct Resolver {
    registry: Arc<MetadataRegistry>,
    ctx: SyncContext,
    time: TimeUtil,
    comparators: Comparators,
    reflectors: Reflectors,
    heuristic: Arc<dyn EditHeuristic>,
    handles: Vec<String>,
}

impl Resolver {
    /// Creates a resolver with the built-in tables and [`NeverSlaveEdited`].
    ///
    /// Fails if a configured target or primary key handle is unknown.
    pub fn new(registry: Arc<MetadataRegistry>, ctx: SyncContext) -> ResolutionResult<Self> {
        for side in [Side::Master, Side::Slave] {
            if let Some(target) = ctx.target(side) {
                registry.targets().validate(target)?;
            }
            if let Some(pk) = ctx.pk_handle(side) {
                if !registry.contains(pk) {
                    return Err(ConfigError::UnknownHandle {
                        registry: registry.name().to_string(),
                        handle: pk.to_string(),
                    }
                    .into());
                }
            }
        }
        let handles: Vec<String> = registry
            .sync_handles(None)?
            .into_iter()
            .map(str::to_string)
            .collect();
        debug!(
            registry = registry.name(),
            handles = handles.len(),
            merge = ctx.is_merge(),
            "resolver ready"
        );
        Ok(Self {
            time: TimeUtil::new(*registry.time_zones()),
            registry,
            ctx,
            comparators: Comparators::default(),
            reflectors: Reflectors::default(),
            heuristic: Arc::new(NeverSlaveEdited),
            handles,
        })
    }

    #[must_use]
    pub fn with_comparators(mut self, comparators: Comparators) -> Self {
        self.comparators = comparators;
        self
    }

    #[must_use]
    pub fn with_reflectors(mut self, reflectors: Reflectors) -> Self {
        self.reflectors = reflectors;
        self
    }

    #[must_use]
    pub fn with_heuristic(mut self, heuristic: impl EditHeuristic + 'static) -> Self {
        self.heuristic = Arc::new(heuristic);
        self
    }

    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    pub fn time_util(&self) -> &TimeUtil {
        &self.time
    }

    /// Handles taking part in resolution, parents ahead of aliases.
    pub fn sync_handles(&self) -> &[String] {
        &self.handles
    }

    /// Starts a pair. Nothing is compared until [`ConflictUpdate::sync_fields`].
    pub fn conflict(&self, master: Record, slave: Record) -> ConflictUpdate<'_> {
        let default_last_sync = self.ctx.default_last_sync.clone().map(Value::String);
        ConflictUpdate {
            resolver: self,
            scope: self.registry.global_scope(),
            snapshots: SnapshotArena::new(master, slave),
            last_sync: self.parse_last_sync(default_last_sync.as_ref()),
            warnings: DecisionLog::default(),
            passes: DecisionLog::default(),
            problematics: DecisionLog::default(),
            updates: 0,
            important_updates: 0,
            is_static: true,
            important_static: true,
            m_deltas: false,
            s_deltas: false,
            settled: HashSet::new(),
            changed: [Vec::new(), Vec::new()],
            synced: false,
        }
    }

    /// Starts a pair and runs its field pass.
    pub fn resolve(
        &self,
        master: Record,
        slave: Record,
        last_sync: Option<&Value>,
    ) -> ResolutionResult<ConflictUpdate<'_>> {
        let mut update = self.conflict(master, slave).with_last_sync(last_sync);
        update.sync_fields()?;
        Ok(update)
    }

    fn parse_last_sync(&self, raw: Option<&Value>) -> Option<DateTime<Utc>> {
        let raw = raw.filter(|v| !is_blank(v))?;
        match self.time.parse_master_time(raw) {
            Ok(dt) => Some(dt),
            Err(err) => {
                debug!(%err, "ignoring unparseable last sync time");
                None
            }
        }
    }
}

fn slot(side: Side) -> usize {
    match side {
        Side::Master => 0,
        Side::Slave => 1,
    }
}

fn identical(a: &Value, b: &Value) -> bool {
    a == b || (is_blank(a) && is_blank(b))
}

/// One pair under resolution.
pub struct ConflictUpdate<'a> {
    pub(crate) resolver: &'a Resolver,
    pub(crate) scope: Scope<'a>,
    pub(crate) snapshots: SnapshotArena,
    last_sync: Option<DateTime<Utc>>,
    warnings: DecisionLog,
    passes: DecisionLog,
    problematics: DecisionLog,
    updates: usize,
    important_updates: usize,
    is_static: bool,
    important_static: bool,
    m_deltas: bool,
    s_deltas: bool,
    /// Aliases already copied with their parent.
    settled: HashSet<String>,
    /// Handles written per side, in write order.
    pub(crate) changed: [Vec<String>; 2],
    synced: bool,
}

impl<'a> ConflictUpdate<'a> {
    /// Overrides the run's default last sync time. `None` keeps the default.
    #[must_use]
    pub fn with_last_sync(mut self, raw: Option<&Value>) -> Self {
        if raw.is_some() {
            self.last_sync = self.resolver.parse_last_sync(raw);
        }
        self
    }

    pub fn context(&self) -> &'a SyncContext {
        &self.resolver.ctx
    }

    // ── Field pass ───────────────────────────────────────────────

    /// Resolves every sync handle. Runs once per pair.
    pub fn sync_fields(&mut self) -> ResolutionResult<()> {
        if self.synced {
            return Err(ResolutionError::Assertion(
                "field pass already ran for this pair".into(),
            ));
        }
        self.synced = true;

        let resolver = self.resolver;
        for handle in &resolver.handles {
            if self.settled.contains(handle) {
                debug!(handle = %handle, "settled with its parent");
                continue;
            }
            if self.scope.is_reflective(handle) {
                self.reflect_field(handle)?;
            }
            let mode = self.scope.sync_mode(handle).unwrap_or(SyncMode::Off);
            if mode.is_active() {
                self.sync_field(handle, mode)?;
            }
        }

        info!(
            updates = self.updates,
            important_updates = self.important_updates,
            passes = self.passes.len(),
            problematic = self.problematics.len(),
            safe = self.important_static,
            "pair resolved"
        );
        Ok(())
    }

    fn value(&self, side: Side, handle: &str) -> Value {
        self.snapshots
            .current(side)
            .get(handle)
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn reflect_field(&mut self, handle: &str) -> ResolutionResult<()> {
        let kind = self.scope.comparison_kind(handle);
        for side in [Side::Master, Side::Slave] {
            let current = self.value(side, handle);
            if is_blank(&current) {
                continue;
            }
            let reflected = self.resolver.reflectors.reflect(kind, &current);
            if reflected != current {
                let decision = Decision::builder(handle)
                    .subject(side)
                    .reason(Reason::Reflect)
                    .values(current, reflected)
                    .build()?;
                self.apply(decision)?;
            }
        }
        Ok(())
    }

    fn sync_field(&mut self, handle: &str, mode: SyncMode) -> ResolutionResult<()> {
        let m_value = self.value(Side::Master, handle);
        let s_value = self.value(Side::Slave, handle);
        if identical(&m_value, &s_value) {
            return Ok(());
        }

        let m_time = self.field_time(Side::Master, handle);
        let s_time = self.field_time(Side::Slave, handle);
        let concurrent = self.is_concurrent(m_time, s_time);

        let kind = self.scope.comparison_kind(handle);
        if self.resolver.comparators.similar(kind, &m_value, &s_value) {
            debug!(handle, "values similar");
            let decision = Decision::builder(handle)
                .reason(Reason::Similar)
                .values(m_value, s_value)
                .times(m_time, s_time)
                .concurrent(concurrent)
                .build()?;
            self.passes.push(decision);
            return Ok(());
        }

        let winner = self.pick_winner(handle, mode, &m_value, &s_value, m_time, s_time);
        let loser = winner.other();
        let (new, old) = match winner {
            Side::Master => (m_value, s_value),
            Side::Slave => (s_value, m_value),
        };
        let reason = self.reason_for(&old, &new);

        let decision = Decision::builder(handle)
            .subject(loser)
            .winner(winner)
            .reason(reason)
            .values(old, new)
            .times(m_time, s_time)
            .concurrent(concurrent)
            .build()?;
        self.apply(decision)?;

        let registry = self.scope.registry();
        for alias in registry.aliases(handle) {
            self.settled.insert(alias.clone());
            let new = self.value(winner, alias);
            let old = self.value(loser, alias);
            if identical(&old, &new) {
                continue;
            }
            // In merge mode a blank alias never clears the loser's value.
            if self.resolver.ctx.is_merge() && is_blank(&new) {
                continue;
            }
            let decision = Decision::builder(alias.as_str())
                .subject(loser)
                .winner(winner)
                .reason(self.reason_for(&old, &new))
                .values(old, new)
                .times(m_time, s_time)
                .concurrent(concurrent)
                .build()?;
            self.apply(decision)?;
        }
        Ok(())
    }

    /// Why `old` is being replaced by `new` on the losing side.
    fn reason_for(&self, old: &Value, new: &Value) -> Reason {
        if is_blank(old) {
            if self.resolver.ctx.is_merge() {
                Reason::Merging
            } else {
                Reason::Inserting
            }
        } else if is_blank(new) {
            Reason::Deleting
        } else {
            Reason::Updating
        }
    }

    fn pick_winner(
        &self,
        handle: &str,
        mode: SyncMode,
        m_value: &Value,
        s_value: &Value,
        m_time: Option<DateTime<Utc>>,
        s_time: Option<DateTime<Utc>>,
    ) -> Side {
        if self.resolver.ctx.is_merge() {
            if is_blank(m_value) {
                return Side::Slave;
            }
            if is_blank(s_value) {
                return Side::Master;
            }
        }
        if let Some(side) = mode.override_side() {
            return side;
        }
        match (m_time, s_time) {
            (Some(m), Some(s)) if s > m => Side::Slave,
            (Some(_), _) => Side::Master,
            (None, Some(_)) => Side::Slave,
            (None, None) => {
                if self
                    .resolver
                    .heuristic
                    .slave_may_have_edited(handle, m_value, s_value)
                {
                    Side::Slave
                } else {
                    Side::Master
                }
            }
        }
    }

    /// Column modification time, falling back to the record's.
    fn field_time(&self, side: Side, handle: &str) -> Option<DateTime<Utc>> {
        let original = self.snapshots.original(side);
        let present = |h: &str| original.get(h).filter(|v| !is_blank(v));
        let raw = self
            .scope
            .modtime_handle(handle)
            .and_then(present)
            .or_else(|| present(self.resolver.ctx.modtime_handle.as_str()))?;
        match self.resolver.time.parse_side_time(side, raw) {
            Ok(dt) => Some(dt),
            Err(err) => {
                debug!(handle, %side, %err, "unparseable modification time");
                None
            }
        }
    }

    fn is_concurrent(&self, m_time: Option<DateTime<Utc>>, s_time: Option<DateTime<Utc>>) -> bool {
        match (self.last_sync, m_time, s_time) {
            (Some(last), Some(m), Some(s)) => m > last && s > last,
            _ => false,
        }
    }

    fn mark_changed(&mut self, side: Side, handle: &str) {
        let changed = &mut self.changed[slot(side)];
        if !changed.iter().any(|h| h == handle) {
            changed.push(handle.to_string());
        }
    }

    /// Writes a decision onto its subject's snapshot and does the bookkeeping.
    fn apply(&mut self, decision: Decision) -> ResolutionResult<()> {
        let side = decision.subject.ok_or_else(|| {
            ResolutionError::Assertion(format!("applying {} without a subject", decision.handle))
        })?;
        let handle = decision.handle.as_str();
        let scope = self.scope;

        self.snapshots
            .snapshot_mut(side)
            .insert(handle.to_string(), decision.new.clone());
        self.mark_changed(side, handle);

        if scope.is_delta(handle) && decision.reason.is_overwrite() {
            let delta = self.resolver.ctx.delta_handle(handle);
            self.snapshots
                .snapshot_mut(side)
                .insert(delta.clone(), decision.old.clone());
            self.mark_changed(side, &delta);
            match side {
                Side::Master => self.m_deltas = true,
                Side::Slave => self.s_deltas = true,
            }
        }

        self.updates += 1;
        let important = scope.is_important(handle);
        if important {
            self.important_updates += 1;
        }

        if decision.reason.is_overwrite() {
            warn!(
                handle,
                subject = self.resolver.ctx.name(side),
                reason = %decision.reason,
                old = %decision.old,
                new = %decision.new,
                "overwriting field"
            );
        } else {
            debug!(handle, subject = %side, reason = %decision.reason, "filling field");
        }

        if scope.is_static(handle) {
            self.is_static = false;
            if important && decision.reason.is_overwrite() {
                warn!(
                    target: "fieldsync::problematic",
                    handle,
                    subject = self.resolver.ctx.name(side),
                    reason = %decision.reason,
                    "static important field overwritten"
                );
                self.important_static = false;
                self.problematics.push(decision.clone());
            }
        }

        self.warnings.push(decision);
        Ok(())
    }

    // ── Results ──────────────────────────────────────────────────

    pub fn old_master(&self) -> &Record {
        self.snapshots.original(Side::Master)
    }

    pub fn old_slave(&self) -> &Record {
        self.snapshots.original(Side::Slave)
    }

    /// The master's new record, if anything was written to it.
    pub fn new_master(&self) -> Option<&Record> {
        self.snapshots.snapshot(Side::Master)
    }

    pub fn new_slave(&self) -> Option<&Record> {
        self.snapshots.snapshot(Side::Slave)
    }

    /// Handles written to a side, in write order.
    pub fn changed_handles(&self, side: Side) -> &[String] {
        &self.changed[slot(side)]
    }

    /// Applied decisions.
    pub fn warnings(&self) -> &DecisionLog {
        &self.warnings
    }

    /// Fields that differed only superficially.
    pub fn passes(&self) -> &DecisionLog {
        &self.passes
    }

    /// Overwrites of static, important fields.
    pub fn problematics(&self) -> &DecisionLog {
        &self.problematics
    }

    pub fn updates(&self) -> usize {
        self.updates
    }

    pub fn important_updates(&self) -> usize {
        self.important_updates
    }

    /// False once any static field has changed.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_safe_to_apply(&self) -> bool {
        self.important_static
    }

    pub fn m_deltas(&self) -> bool {
        self.m_deltas
    }

    pub fn s_deltas(&self) -> bool {
        self.s_deltas
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    /// A one-line summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "updates={} important_updates={} passes={} problematic={} static={} safe={} m_deltas={} s_deltas={}",
            self.updates,
            self.important_updates,
            self.passes.len(),
            self.problematics.len(),
            self.is_static,
            self.important_static,
            self.m_deltas,
            self.s_deltas,
        )
    }

    /// Applied decisions then passes, flattened for a report.
    pub fn report_rows(&self) -> Vec<ReportRow> {
        let ctx = self.context();
        let name = |side: Option<Side>| side.map(|s| ctx.name(s).to_string()).unwrap_or_default();
        self.warnings
            .iter()
            .chain(self.passes.iter())
            .map(|d| ReportRow {
                handle: d.handle.clone(),
                subject: name(d.subject),
                winner: name(d.winner),
                reason: d.reason,
                old: value_to_text(&d.old),
                new: value_to_text(&d.new),
                m_time: d.m_time.map(time::to_canonical),
                s_time: d.s_time.map(time::to_canonical),
                problematic: self.problematics.iter().any(|p| p == d),
            })
            .collect()
    }

    /// Consumes the pair into its owned results, building both patches.
    pub fn into_outcome(self) -> ResolutionResult<ResolutionOutcome> {
        let master_patch = self.get_master_patch()?;
        let slave_patch = self.get_slave_patch()?;
        let summary = self.summary();
        let report = self.report_rows();
        let new_master = self.new_master().cloned();
        let new_slave = self.new_slave().cloned();
        Ok(ResolutionOutcome {
            new_master,
            new_slave,
            master_patch,
            slave_patch,
            warnings: self.warnings,
            passes: self.passes,
            problematics: self.problematics,
            updates: self.updates,
            important_updates: self.important_updates,
            is_static: self.is_static,
            safe_to_apply: self.important_static,
            m_deltas: self.m_deltas,
            s_deltas: self.s_deltas,
            summary,
            report,
        })
    }
}

/// Owned results of one pair.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionOutcome {
    pub new_master: Option<Record>,
    pub new_slave: Option<Record>,
    pub master_patch: Option<Patch>,
    pub slave_patch: Option<Patch>,
    pub warnings: DecisionLog,
    pub passes: DecisionLog,
    pub problematics: DecisionLog,
    pub updates: usize,
    pub important_updates: usize,
    pub is_static: bool,
    pub safe_to_apply: bool,
    pub m_deltas: bool,
    pub s_deltas: bool,
    pub summary: String,
    pub report: Vec<ReportRow>,
}

impl ResolutionOutcome {
    /// True if neither side needs a patch.
    pub fn is_noop(&self) -> bool {
        self.master_patch.is_none() && self.slave_patch.is_none()
    }
}
