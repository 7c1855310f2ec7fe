use fieldsync_types::{is_blank, value_to_text, Record, Side};
use serde_json::json;

// ── is_blank ─────────────────────────────────────────────────────

#[test]
fn blank_values() {
    assert!(is_blank(&json!(null)));
    assert!(is_blank(&json!("")));
    assert!(is_blank(&json!("   ")));
    assert!(is_blank(&json!([])));
    assert!(is_blank(&json!({})));
}

#[test]
fn deliberate_values_are_not_blank() {
    assert!(!is_blank(&json!(false)));
    assert!(!is_blank(&json!(0)));
    assert!(!is_blank(&json!("0")));
    assert!(!is_blank(&json!([null])));
}

// ── value_to_text ────────────────────────────────────────────────

#[test]
fn text_rendering() {
    assert_eq!(value_to_text(&json!("abc")), "abc");
    assert_eq!(value_to_text(&json!(null)), "");
    assert_eq!(value_to_text(&json!(12)), "12");
    assert_eq!(value_to_text(&json!(true)), "true");
    assert_eq!(value_to_text(&json!([1])), "[1]");
}

// ── Record ordering ──────────────────────────────────────────────

#[test]
fn record_preserves_insertion_order() {
    let mut record = Record::new();
    record.insert("zeta".into(), json!(1));
    record.insert("alpha".into(), json!(2));
    record.insert("mid".into(), json!(3));
    let keys: Vec<&str> = record.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
}

// ── Side ─────────────────────────────────────────────────────────

#[test]
fn side_other_is_involution() {
    assert_eq!(Side::Master.other(), Side::Slave);
    assert_eq!(Side::Slave.other().other(), Side::Slave);
}

#[test]
fn side_serde_snake_case() {
    assert_eq!(serde_json::to_string(&Side::Master).unwrap(), "\"master\"");
    let side: Side = serde_json::from_str("\"slave\"").unwrap();
    assert_eq!(side, Side::Slave);
    assert_eq!(Side::Slave.to_string(), "slave");
}
