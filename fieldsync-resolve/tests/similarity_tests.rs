use fieldsync_resolve::reflect::{reflect_address, reflect_phone, reflect_text, reflect_url};
use fieldsync_resolve::similarity::{
    address_similar, currency_similar, markup_similar, phone_similar, preference_similar,
    strip_markup, text_similar, url_similar,
};
use fieldsync_resolve::{Comparators, Reflectors};
use fieldsync_schema::ComparisonKind;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};

// ── Comparators ──────────────────────────────────────────────────

#[test]
fn text_folds_case_and_whitespace() {
    assert!(text_similar(&json!("Hello  World"), &json!(" hello world ")));
    assert!(!text_similar(&json!("Hello"), &json!("Help")));
    assert!(text_similar(&json!(12), &json!("12")));
}

#[test]
fn text_compares_containers_exactly() {
    assert!(text_similar(&json!([1, 2]), &json!([1, 2])));
    assert!(!text_similar(&json!({ "a": "X" }), &json!({ "a": "x" })));
}

#[test]
fn phones_compare_trailing_digits() {
    assert!(phone_similar(&json!("+61 2 9876 5432"), &json!("02 9876 5432")));
    assert!(phone_similar(&json!("9876-5432"), &json!("(02) 98765432")));
    assert!(!phone_similar(&json!("0298765432"), &json!("0298765431")));
    assert!(!phone_similar(&json!("0298765432"), &json!("")));
}

#[test]
fn preferences_fold_truthy_strings() {
    assert!(preference_similar(&json!("Yes"), &json!(true)));
    assert!(preference_similar(&json!("0"), &Value::Null));
    assert!(preference_similar(&json!("off"), &json!("No")));
    assert!(!preference_similar(&json!("yes"), &json!("no")));
    assert!(!preference_similar(&json!("maybe"), &json!("yes")));
    assert!(preference_similar(&json!("Maybe"), &json!("maybe")));
}

#[test]
fn addresses_tolerate_abbreviations() {
    assert!(address_similar(
        &json!("12 Smith Street, North Sydney"),
        &json!("12 smith st n sydney")
    ));
    assert!(!address_similar(&json!("12 Smith St"), &json!("14 Smith St")));
}

#[test]
fn address_objects_ignore_geocoding() {
    let a = json!({ "line1": "1 George Road", "city": "Sydney", "lat": -33.86, "lng": 151.2 });
    let b = json!({ "line1": "1 George Rd.", "city": "SYDNEY", "line2": "" });
    assert!(address_similar(&a, &b));

    let c = json!({ "line1": "1 George Rd", "city": "Melbourne" });
    assert!(!address_similar(&a, &c));
    assert!(!address_similar(&a, &json!("1 George Rd Sydney")));
}

#[test]
fn urls_ignore_protocol_and_www() {
    assert!(url_similar(&json!("https://www.example.com/"), &json!("example.com")));
    assert!(url_similar(&json!("HTTP://Example.com/shop/"), &json!("example.com/shop")));
    assert!(!url_similar(&json!("example.com/shop"), &json!("example.com/cart")));
}

#[test]
fn currency_compares_amounts() {
    assert!(currency_similar(&json!("12.5"), &json!("12.50")));
    assert!(currency_similar(&json!(1250), &json!(1250)));
    assert!(!currency_similar(&json!("12.50"), &json!("12.51")));
}

#[test]
fn markup_ignores_tags() {
    assert_eq!(strip_markup("<p>Fish &amp; chips</p>").trim(), "Fish & chips");
    assert!(markup_similar(&json!("<p>Hello <b>world</b></p>\n"), &json!("Hello world")));
    assert!(!markup_similar(&json!("<p>Hello</p>"), &json!("Goodbye")));
}

#[test]
fn markup_keeps_bare_angle_brackets() {
    assert_eq!(strip_markup("a < b"), "a < b");
    assert_eq!(strip_markup("1 < 2 and 3 > 2"), "1 < 2 and 3 > 2");
    assert_eq!(strip_markup("x<!-- note -->y"), "x y");
    assert_eq!(strip_markup("if a &lt; b<br/>then"), "if a < b then");
    assert!(!markup_similar(&json!("<p>a < b</p>"), &json!("a")));
    assert!(markup_similar(&json!("<p>a < b</p>"), &json!("a &lt; b")));
}

#[test]
fn urls_keep_inner_www() {
    assert!(url_similar(&json!("www.example.com"), &json!("http://example.com")));
    assert!(!url_similar(&json!("example.com/www.x"), &json!("example.com/x")));
}

#[test]
fn table_dispatches_by_kind() {
    let table = Comparators::default();
    let a = json!("+61 2 9876 5432");
    let b = json!("(02) 9876 5432");
    assert!(table.similar(ComparisonKind::Phone, &a, &b));
    assert!(!table.similar(ComparisonKind::Default, &a, &b));
}

#[test]
fn table_entries_can_be_replaced() {
    let strict = Comparators::default().with(ComparisonKind::Default, |a: &Value, b: &Value| a == b);
    assert!(!strict.similar(ComparisonKind::Default, &json!("A"), &json!("a")));
    assert!(strict.similar(ComparisonKind::Phone, &json!("02 1234 5678"), &json!("12345678")));
}

#[test]
fn empty_table_falls_back_to_text() {
    let table = Comparators::empty();
    assert!(table.similar(ComparisonKind::Phone, &json!("ABC"), &json!("abc")));
    assert!(!table.similar(ComparisonKind::Phone, &json!("02 1234"), &json!("021234")));
}

// ── Reflectors ───────────────────────────────────────────────────

#[test]
fn reflectors_tidy_values() {
    assert_eq!(reflect_text(&json!("  Ann   Lee ")), json!("Ann Lee"));
    assert_eq!(reflect_text(&json!(5)), json!(5));
    assert_eq!(reflect_phone(&json!("(02) 9876-5432")), json!("02 9876 5432"));
    assert_eq!(reflect_url(&json!(" HTTPS://Example.COM/Path ")), json!("https://example.com/Path"));
    assert_eq!(
        reflect_address(&json!({ "line1": " 1  George St ", "line2": "  " })),
        json!({ "line1": "1 George St" })
    );
}

#[test]
fn reflection_table_leaves_unknown_kinds_alone() {
    let table = Reflectors::default();
    assert_eq!(table.reflect(ComparisonKind::Currency, &json!(" 12 ")), json!(" 12 "));
    assert_eq!(table.reflect(ComparisonKind::Markup, &json!(" <p>x</p> ")), json!("<p>x</p>"));
    assert_eq!(table.reflect(ComparisonKind::Markup, &json!("<p> </p>")), json!(""));
}

proptest! {
    #[test]
    fn reflectors_are_idempotent(s in "[ a-zA-Z0-9().+:/-]{0,24}") {
        let table = Reflectors::default();
        for kind in [
            ComparisonKind::Default,
            ComparisonKind::Phone,
            ComparisonKind::Url,
            ComparisonKind::Markup,
        ] {
            let once = table.reflect(kind, &json!(s));
            let twice = table.reflect(kind, &once);
            prop_assert_eq!(once, twice);
        }
    }

    #[test]
    fn reflected_text_stays_similar(s in "[ a-zA-Z]{0,24}") {
        let value = json!(s);
        prop_assert!(text_similar(&value, &reflect_text(&value)));
    }
}
