//! Immutable per-run sync settings.

use fieldsync_types::Side;
use serde::{Deserialize, Serialize};

/// How a pair is reconciled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Latest modification wins, blanks included.
    #[default]
    Sync,
    /// Blanks never overwrite values; only gaps are filled.
    Merge,
}

/// Settings shared by every pair in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncContext {
    /// Display name of the master system, used in reports.
    pub master_name: String,
    /// Display name of the slave system.
    pub slave_name: String,
    /// Target master patches are written in.
    pub master_target: Option<String>,
    /// Target slave patches are written in.
    pub slave_target: Option<String>,
    pub merge_mode: MergeMode,
    /// Last sync time used when a pair does not carry its own.
    pub default_last_sync: Option<String>,
    /// Record-level modification time handle.
    pub modtime_handle: String,
    /// Prefix of the shadow handle archiving a delta field's old value.
    pub delta_prefix: String,
    pub master_pk_handle: Option<String>,
    pub slave_pk_handle: Option<String>,
}

impl Default for SyncContext {
    fn default() -> Self {
        Self {
            master_name: "master".to_string(),
            slave_name: "slave".to_string(),
            master_target: None,
            slave_target: None,
            merge_mode: MergeMode::Sync,
            default_last_sync: None,
            modtime_handle: "modtime".to_string(),
            delta_prefix: "Delta ".to_string(),
            master_pk_handle: None,
            slave_pk_handle: None,
        }
    }
}

impl SyncContext {
    pub fn name(&self, side: Side) -> &str {
        match side {
            Side::Master => &self.master_name,
            Side::Slave => &self.slave_name,
        }
    }

    pub fn target(&self, side: Side) -> Option<&str> {
        match side {
            Side::Master => self.master_target.as_deref(),
            Side::Slave => self.slave_target.as_deref(),
        }
    }

    pub fn pk_handle(&self, side: Side) -> Option<&str> {
        match side {
            Side::Master => self.master_pk_handle.as_deref(),
            Side::Slave => self.slave_pk_handle.as_deref(),
        }
    }

    /// The shadow handle archiving `handle`'s overwritten value.
    pub fn delta_handle(&self, handle: &str) -> String {
        format!("{}{handle}", self.delta_prefix)
    }

    pub fn is_merge(&self) -> bool {
        self.merge_mode == MergeMode::Merge
    }
}
