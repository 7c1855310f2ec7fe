use chrono::{TimeZone, Utc};
use fieldsync_types::time::{
    format_act_datetime, format_gdrive_datetime, format_iso8601_utc, format_wp_datetime,
    format_xero_datetime, parse_act_datetime, parse_canonical, parse_gdrive_datetime,
    parse_iso8601_utc, parse_timestamp, parse_wp_datetime, parse_xero_datetime, to_canonical,
};
use fieldsync_types::{Side, TimeUtil, TimeZones, Zone};
use proptest::prelude::*;
use serde_json::json;

fn melbourne() -> TimeZones {
    TimeZones {
        store_local: 10 * 3600,
        act_server: 10 * 3600,
        xero: 0,
        gdrive: 11 * 3600,
    }
}

// ── Canonical ────────────────────────────────────────────────────

#[test]
fn canonical_uses_z_suffix_and_seconds() {
    let dt = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(to_canonical(dt), "2016-01-01T00:00:00Z");
}

#[test]
fn canonical_parse_normalizes_offsets() {
    let dt = parse_canonical("2016-01-01T10:00:00+10:00").unwrap();
    assert_eq!(to_canonical(dt), "2016-01-01T00:00:00Z");
}

#[test]
fn canonical_parse_rejects_naive() {
    assert!(parse_canonical("2016-01-01 00:00:00").is_err());
}

// ── ISO 8601 ─────────────────────────────────────────────────────

#[test]
fn iso8601_naive_is_utc() {
    let dt = parse_iso8601_utc("2016-03-04T05:06:07").unwrap();
    assert_eq!(dt, Utc.with_ymd_and_hms(2016, 3, 4, 5, 6, 7).unwrap());
    assert_eq!(format_iso8601_utc(dt), "2016-03-04T05:06:07");
}

#[test]
fn iso8601_accepts_fractional_seconds() {
    let dt = parse_iso8601_utc("2016-03-04T05:06:07.250").unwrap();
    assert_eq!(format_iso8601_utc(dt), "2016-03-04T05:06:07");
}

// ── WordPress / Google Drive ─────────────────────────────────────

#[test]
fn wp_datetime_applies_store_offset() {
    let zones = melbourne();
    let dt = parse_wp_datetime("2016-01-01 10:00:00", &zones).unwrap();
    assert_eq!(to_canonical(dt), "2016-01-01T00:00:00Z");
    assert_eq!(format_wp_datetime(dt, &zones), "2016-01-01 10:00:00");
}

#[test]
fn gdrive_datetime_uses_its_own_zone() {
    let zones = melbourne();
    let dt = parse_gdrive_datetime("2016-01-01 11:00:00", &zones).unwrap();
    assert_eq!(to_canonical(dt), "2016-01-01T00:00:00Z");
    assert_eq!(format_gdrive_datetime(dt, &zones), "2016-01-01 11:00:00");
}

#[test]
fn wp_datetime_rejects_garbage() {
    assert!(parse_wp_datetime("yesterday", &TimeZones::default()).is_err());
}

// ── ACT ──────────────────────────────────────────────────────────

#[test]
fn act_datetime_twelve_hour_clock() {
    let zones = melbourne();
    let dt = parse_act_datetime("08/02/2016 01:30:00 PM", &zones).unwrap();
    assert_eq!(to_canonical(dt), "2016-02-08T03:30:00Z");
    assert_eq!(format_act_datetime(dt, &zones), "08/02/2016 01:30:00 PM");
}

#[test]
fn act_date_only_is_local_midnight() {
    let zones = melbourne();
    let dt = parse_act_datetime("08/02/2016", &zones).unwrap();
    assert_eq!(to_canonical(dt), "2016-02-07T14:00:00Z");
}

// ── Xero ─────────────────────────────────────────────────────────

#[test]
fn xero_round_trip() {
    let dt = parse_xero_datetime("/Date(1439434356790+0000)/").unwrap();
    assert_eq!(dt.timestamp_millis(), 1_439_434_356_790);
    assert_eq!(
        format_xero_datetime(dt, &TimeZones::default()),
        "/Date(1439434356790+0000)/"
    );
}

#[test]
fn xero_without_offset() {
    let dt = parse_xero_datetime("/Date(0)/").unwrap();
    assert_eq!(dt.timestamp(), 0);
}

#[test]
fn xero_rejects_unwrapped_millis() {
    assert!(parse_xero_datetime("1439434356790").is_err());
}

// ── Unix timestamps ──────────────────────────────────────────────

#[test]
fn timestamp_from_number_and_string() {
    assert_eq!(parse_timestamp(&json!(86400)).unwrap().timestamp(), 86400);
    assert_eq!(parse_timestamp(&json!("86400")).unwrap().timestamp(), 86400);
    assert_eq!(parse_timestamp(&json!("86400.9")).unwrap().timestamp(), 86400);
    assert!(parse_timestamp(&json!(true)).is_err());
}

// ── Zones ────────────────────────────────────────────────────────

#[test]
fn out_of_range_offset_falls_back_to_utc() {
    let zones = TimeZones {
        store_local: 100 * 3600,
        ..TimeZones::default()
    };
    assert_eq!(zones.offset(Zone::StoreLocal).local_minus_utc(), 0);
}

#[test]
fn zones_deserialize_with_defaults() {
    let zones: TimeZones = serde_json::from_value(json!({"act_server": 36000})).unwrap();
    assert_eq!(zones.act_server, 36000);
    assert_eq!(zones.store_local, 0);
}

// ── TimeUtil ─────────────────────────────────────────────────────

#[test]
fn side_parsers_share_canonical_and_unix() {
    let util = TimeUtil::new(melbourne());
    let canonical = json!("2016-01-01T00:00:00Z");
    assert_eq!(
        util.parse_master_time(&canonical).unwrap(),
        util.parse_slave_time(&canonical).unwrap()
    );
    assert_eq!(util.parse_slave_time(&json!(0)).unwrap().timestamp(), 0);
}

#[test]
fn side_parsers_use_native_formats() {
    let util = TimeUtil::new(melbourne());
    let master = util.parse_master_time(&json!("2016-01-01 10:00:00")).unwrap();
    let slave = util
        .parse_side_time(Side::Slave, &json!("01/01/2016 10:00:00 AM"))
        .unwrap();
    assert_eq!(master, slave);
    assert!(util.parse_master_time(&json!("01/01/2016 10:00:00 AM")).is_err());
}

#[test]
fn side_parsers_reject_null() {
    let util = TimeUtil::default();
    assert!(util.parse_master_time(&json!(null)).is_err());
}

proptest! {
    #[test]
    fn wp_round_trip_any_offset(secs in 0i64..4_000_000_000, hours in -12i32..=14) {
        let zones = TimeZones { store_local: hours * 3600, ..TimeZones::default() };
        let dt = chrono::DateTime::from_timestamp(secs, 0).unwrap();
        let raw = format_wp_datetime(dt, &zones);
        prop_assert_eq!(parse_wp_datetime(&raw, &zones).unwrap(), dt);
    }

    #[test]
    fn act_round_trip_any_offset(secs in 0i64..4_000_000_000, hours in -12i32..=14) {
        let zones = TimeZones { act_server: hours * 3600, ..TimeZones::default() };
        let dt = chrono::DateTime::from_timestamp(secs, 0).unwrap();
        let raw = format_act_datetime(dt, &zones);
        prop_assert_eq!(parse_act_datetime(&raw, &zones).unwrap(), dt);
    }
}
