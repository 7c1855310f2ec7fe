//! Native-shape patches built from a resolved pair.

use crate::engine::ConflictUpdate;
use crate::error::{ResolutionError, ResolutionResult};
use fieldsync_translate::RecordTranslator;
use fieldsync_types::{is_blank, Side};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// One side's changes, expressed in that side's target shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patch {
    pub side: Side,
    pub target: String,
    pub payload: Value,
    /// The record's identifier on this side, if it has one.
    pub primary_key: Option<Value>,
    /// Changed handles the target could not express.
    pub skipped: Vec<String>,
}

impl Patch {
    /// The payload, or [`ResolutionError::PrimaryKeyMissing`] if there is
    /// nowhere to send it.
    pub fn ensure_sendable(&self) -> ResolutionResult<&Value> {
        match &self.primary_key {
            Some(_) => Ok(&self.payload),
            None => Err(ResolutionError::PrimaryKeyMissing { side: self.side }),
        }
    }
}

fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Object(map) => map.is_empty(),
        other => is_blank(other),
    }
}

impl ConflictUpdate<'_> {
    /// The side's patch, or `None` if nothing changed on it.
    pub fn get_patch(&self, side: Side) -> ResolutionResult<Option<Patch>> {
        let Some(record) = self.snapshots.snapshot(side) else {
            return Ok(None);
        };
        let ctx = self.context();
        let target = ctx.target(side).ok_or_else(|| {
            ResolutionError::Config(format!("no {side} target configured"))
        })?;

        let handles: Vec<&str> = self.changed_handles(side).iter().map(String::as_str).collect();
        let translator = RecordTranslator::new(self.scope.registry());
        let translated = translator.from_canonical_handles(record, target, &handles)?;
        let skipped: Vec<String> = translated.skipped().map(str::to_string).collect();
        if !skipped.is_empty() {
            warn!(%side, patch_target = target, ?skipped, "patch omits untranslatable fields");
        }
        if is_empty_payload(&translated.value) {
            debug!(%side, patch_target = target, "nothing writable changed");
            return Ok(None);
        }

        let primary_key = ctx
            .pk_handle(side)
            .and_then(|pk| record.get(pk))
            .filter(|v| !is_blank(v))
            .cloned();
        Ok(Some(Patch {
            side,
            target: target.to_string(),
            payload: translated.value,
            primary_key,
            skipped,
        }))
    }

    pub fn get_master_patch(&self) -> ResolutionResult<Option<Patch>> {
        self.get_patch(Side::Master)
    }

    pub fn get_slave_patch(&self) -> ResolutionResult<Option<Patch>> {
        self.get_patch(Side::Slave)
    }
}
