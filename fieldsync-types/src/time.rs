//! Named time zone conversions.
//!
//! Every external system stores timestamps differently: WordPress keeps a
//! naive store-local string, the ACT server writes day-first 12-hour strings in
//! its own zone, Xero wraps epoch milliseconds in `/Date(...)/`, and Google
//! Drive exports naive strings in the sheet's zone. Each format gets its own
//! parse/format pair so unrelated fields that share a format share the code.
//!
//! The canonical form of an instant is an RFC 3339 UTC string with second
//! precision, e.g. `2016-01-01T00:00:00Z`.

use crate::{Error, Result, Side};
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, SecondsFormat, TimeZone,
    Utc,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `strftime` layout of WordPress local and Google Drive datetimes.
pub const WP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// `strftime` layout of ACT server datetimes.
pub const ACT_FORMAT: &str = "%d/%m/%Y %I:%M:%S %p";
/// `strftime` layout of ACT server date-only values.
pub const ACT_DATE_FORMAT: &str = "%d/%m/%Y";
/// `strftime` layout of naive ISO 8601 datetimes.
pub const ISO_NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A named time zone used by one of the external systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Utc,
    StoreLocal,
    ActServer,
    Xero,
    GDrive,
}

/// Fixed UTC offsets (in seconds east of UTC) for each named zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeZones {
    pub store_local: i32,
    pub act_server: i32,
    pub xero: i32,
    pub gdrive: i32,
}

impl TimeZones {
    /// Returns the offset configured for a zone.
    ///
    /// Out-of-range offsets (beyond ±24h) fall back to UTC.
    pub fn offset(&self, zone: Zone) -> FixedOffset {
        let seconds = match zone {
            Zone::Utc => 0,
            Zone::StoreLocal => self.store_local,
            Zone::ActServer => self.act_server,
            Zone::Xero => self.xero,
            Zone::GDrive => self.gdrive,
        };
        FixedOffset::east_opt(seconds).unwrap_or(Utc.fix())
    }
}

fn invalid(kind: &str, raw: &str) -> Error {
    Error::InvalidTimestamp(format!("{raw:?} is not a valid {kind} datetime"))
}

/// Interprets a naive datetime as wall-clock time at `offset`.
pub fn localize(naive: NaiveDateTime, offset: FixedOffset) -> Result<DateTime<Utc>> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| invalid("local", &naive.to_string()))
}

// ── Canonical ────────────────────────────────────────────────────

/// Formats an instant in canonical form.
pub fn to_canonical(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses a canonical (RFC 3339) datetime.
pub fn parse_canonical(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid("canonical", raw))
}

// ── ISO 8601 (UTC) ───────────────────────────────────────────────

/// Parses an ISO 8601 datetime. Naive values are taken to be UTC.
pub fn parse_iso8601_utc(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| invalid("ISO 8601", raw))
}

/// Formats an instant as a naive UTC ISO 8601 string.
pub fn format_iso8601_utc(dt: DateTime<Utc>) -> String {
    dt.format(ISO_NAIVE_FORMAT).to_string()
}

// ── WordPress (store-local) ──────────────────────────────────────

pub fn parse_wp_datetime(raw: &str, zones: &TimeZones) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), WP_FORMAT)
        .map_err(|_| invalid("WordPress", raw))?;
    localize(naive, zones.offset(Zone::StoreLocal))
}

pub fn format_wp_datetime(dt: DateTime<Utc>, zones: &TimeZones) -> String {
    dt.with_timezone(&zones.offset(Zone::StoreLocal))
        .format(WP_FORMAT)
        .to_string()
}

// ── ACT server ───────────────────────────────────────────────────

/// Parses an ACT datetime, accepting date-only values as local midnight.
pub fn parse_act_datetime(raw: &str, zones: &TimeZones) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    let naive = NaiveDateTime::parse_from_str(trimmed, ACT_FORMAT)
        .or_else(|_| {
            NaiveDate::parse_from_str(trimmed, ACT_DATE_FORMAT)
                .map(|date| date.and_time(NaiveTime::MIN))
        })
        .map_err(|_| invalid("ACT", raw))?;
    localize(naive, zones.offset(Zone::ActServer))
}

pub fn format_act_datetime(dt: DateTime<Utc>, zones: &TimeZones) -> String {
    dt.with_timezone(&zones.offset(Zone::ActServer))
        .format(ACT_FORMAT)
        .to_string()
}

// ── Xero ─────────────────────────────────────────────────────────

/// Parses a Xero `/Date(1439434356790+0000)/` value.
///
/// The millisecond count is always relative to the Unix epoch; the trailing
/// offset only describes the zone the value was recorded in.
pub fn parse_xero_datetime(raw: &str) -> Result<DateTime<Utc>> {
    let inner = raw
        .trim()
        .strip_prefix("/Date(")
        .and_then(|rest| rest.strip_suffix(")/"))
        .ok_or_else(|| invalid("Xero", raw))?;
    let digits_end = inner
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '+' || *c == '-')
        .map_or(inner.len(), |(idx, _)| idx);
    let millis: i64 = inner[..digits_end]
        .parse()
        .map_err(|_| invalid("Xero", raw))?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| invalid("Xero", raw))
}

pub fn format_xero_datetime(dt: DateTime<Utc>, zones: &TimeZones) -> String {
    let offset = zones.offset(Zone::Xero).local_minus_utc();
    let sign = if offset < 0 { '-' } else { '+' };
    let abs = offset.abs();
    format!(
        "/Date({}{}{:02}{:02})/",
        dt.timestamp_millis(),
        sign,
        abs / 3600,
        (abs % 3600) / 60
    )
}

// ── Google Drive ─────────────────────────────────────────────────

pub fn parse_gdrive_datetime(raw: &str, zones: &TimeZones) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), WP_FORMAT)
        .map_err(|_| invalid("Google Drive", raw))?;
    localize(naive, zones.offset(Zone::GDrive))
}

pub fn format_gdrive_datetime(dt: DateTime<Utc>, zones: &TimeZones) -> String {
    dt.with_timezone(&zones.offset(Zone::GDrive))
        .format(WP_FORMAT)
        .to_string()
}

// ── Unix timestamps ──────────────────────────────────────────────

/// Parses unix seconds from a JSON number or numeric string.
pub fn parse_timestamp(raw: &Value) -> Result<DateTime<Utc>> {
    let seconds = match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.trunc() as i64),
        _ => None,
    };
    seconds
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .ok_or_else(|| invalid("unix", &raw.to_string()))
}

pub fn format_timestamp(dt: DateTime<Utc>) -> Value {
    Value::from(dt.timestamp())
}

/// Parses modification times on behalf of the resolution engine.
///
/// Values that are already canonical (or plain unix seconds) parse the same
/// way for both sides; anything else is read in the side's native format.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeUtil {
    zones: TimeZones,
}

impl TimeUtil {
    pub fn new(zones: TimeZones) -> Self {
        Self { zones }
    }

    pub fn zones(&self) -> &TimeZones {
        &self.zones
    }

    /// Parses a master-side time (canonical, unix, ISO 8601 or WordPress local).
    pub fn parse_master_time(&self, raw: &Value) -> Result<DateTime<Utc>> {
        self.parse_common(raw, |s| parse_wp_datetime(s, &self.zones))
    }

    /// Parses a slave-side time (canonical, unix, ISO 8601 or ACT server).
    pub fn parse_slave_time(&self, raw: &Value) -> Result<DateTime<Utc>> {
        self.parse_common(raw, |s| parse_act_datetime(s, &self.zones))
    }

    pub fn parse_side_time(&self, side: Side, raw: &Value) -> Result<DateTime<Utc>> {
        match side {
            Side::Master => self.parse_master_time(raw),
            Side::Slave => self.parse_slave_time(raw),
        }
    }

    fn parse_common(
        &self,
        raw: &Value,
        native: impl Fn(&str) -> Result<DateTime<Utc>>,
    ) -> Result<DateTime<Utc>> {
        match raw {
            Value::Number(_) => parse_timestamp(raw),
            Value::String(s) => parse_canonical(s)
                .or_else(|_| parse_iso8601_utc(s))
                .or_else(|_| native(s)),
            other => Err(invalid("side", &other.to_string())),
        }
    }
}
