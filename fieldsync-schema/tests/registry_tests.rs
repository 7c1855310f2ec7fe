use fieldsync_schema::{
    ComparisonKind, ConfigError, MetadataRegistry, Property, Structure, SyncMode, TargetTree,
    TypeTag,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

fn tree() -> Arc<TargetTree> {
    Arc::new(
        TargetTree::from_value(&json!({
            "api": { "wp-api": { "wp-api-v2": { "wp-api-v2-edit": {} } }, "wc-api": {} },
            "csv": {}
        }))
        .unwrap(),
    )
}

fn user_registry() -> MetadataRegistry {
    MetadataRegistry::from_value(
        "user",
        tree(),
        &json!({
            "ID": {
                "path": "id",
                "type": "int",
                "write": false,
                "targets": { "csv": { "path": "Wordpress ID" } }
            },
            "title": {
                "path": "title",
                "sync": "normal",
                "targets": {
                    "wp-api": { "path": "title.rendered", "write": false },
                    "wp-api-v2-edit": { "path": "title.raw", "write": true }
                }
            },
            "Role": {
                "path": "role",
                "sync": "override-slave",
                "delta": true,
                "static": true,
                "important": true,
                "targets": { "wc-api": { "path": null } }
            },
            "Phone": { "path": "phone", "sync": "normal", "comparison": "phone", "reflective": true },
            "Edited Phone": { "path": "edited_phone", "type": "act_datetime", "default": "" },
            "secret": { "targets": { "csv": { "path": "Secret" } } },
            "Status": { "path": "status", "type": "enum", "options": ["active", "inactive"], "sync": "off" }
        }),
    )
    .unwrap()
}

// ── Ancestor resolution ──────────────────────────────────────────

#[test]
fn global_value_when_no_override() {
    let reg = user_registry();
    assert_eq!(
        reg.resolve_property("ID", Property::Path, Some("wp-api")).unwrap(),
        json!("id")
    );
}

#[test]
fn target_override_beats_global() {
    let reg = user_registry();
    assert_eq!(
        reg.resolve_property("ID", Property::Path, Some("csv")).unwrap(),
        json!("Wordpress ID")
    );
}

#[test]
fn ancestor_override_inherited() {
    let reg = user_registry();
    assert_eq!(
        reg.resolve_property("title", Property::Path, Some("wp-api-v2")).unwrap(),
        json!("title.rendered")
    );
}

#[test]
fn closer_override_wins() {
    let reg = user_registry();
    let scope = reg.scope(Some("wp-api-v2-edit")).unwrap();
    assert_eq!(scope.path("title"), Some("title.raw"));
    assert!(scope.is_writable("title"));
    let parent = reg.scope(Some("wp-api-v2")).unwrap();
    assert!(!parent.is_writable("title"));
}

#[test]
fn explicit_null_path_removes_field() {
    let reg = user_registry();
    assert_eq!(
        reg.resolve_property("Role", Property::Path, Some("wc-api")).unwrap(),
        Value::Null
    );
    assert_eq!(reg.scope(Some("wc-api")).unwrap().path("Role"), None);
    assert_eq!(reg.scope(Some("wp-api")).unwrap().path("Role"), Some("role"));
}

#[test]
fn fallbacks_apply_when_undeclared() {
    let reg = user_registry();
    assert_eq!(reg.resolve_property("title", Property::Read, None).unwrap(), json!(true));
    assert_eq!(reg.resolve_property("title", Property::Delta, None).unwrap(), json!(false));
    assert_eq!(reg.resolve_property("title", Property::Textual, None).unwrap(), json!(false));
    assert_eq!(reg.resolve_property("title", Property::Type, None).unwrap(), Value::Null);
    assert_eq!(
        reg.resolve_property("title", Property::Comparison, None).unwrap(),
        json!("default")
    );
}

#[test]
fn unknown_target_and_handle_fail() {
    let reg = user_registry();
    assert!(matches!(
        reg.resolve_property("title", Property::Path, Some("xml")),
        Err(ConfigError::UnknownTarget(_))
    ));
    assert!(matches!(
        reg.resolve_property("nope", Property::Path, None),
        Err(ConfigError::UnknownHandle { .. })
    ));
}

// ── Typed accessors ──────────────────────────────────────────────

#[test]
fn typed_accessors() {
    let reg = user_registry();
    let scope = reg.scope(None).unwrap();
    assert_eq!(scope.type_tag("ID"), Some(TypeTag::Int));
    assert_eq!(scope.sync_mode("Role"), Some(SyncMode::OverrideSlave));
    assert!(scope.is_delta("Role") && scope.is_static("Role") && scope.is_important("Role"));
    assert_eq!(scope.comparison_kind("Phone"), ComparisonKind::Phone);
    assert_eq!(scope.comparison_kind("title"), ComparisonKind::Default);
    assert!(scope.is_reflective("Phone"));
    assert_eq!(scope.default_value("Edited Phone"), json!(""));
    assert_eq!(
        scope.enum_options("Status").map(<[String]>::len),
        Some(2)
    );
    assert_eq!(scope.structure("ID"), None);
    assert_eq!(scope.target(), None);
}

// ── Bulk queries ─────────────────────────────────────────────────

#[test]
fn resolve_all_in_declaration_order() {
    let reg = user_registry();
    let writable = reg.resolve_all(Property::Write, Some("wp-api")).unwrap();
    let keys: Vec<&str> = writable.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["ID", "title", "Role", "Phone", "Edited Phone", "secret", "Status"]
    );
    assert_eq!(writable["ID"], json!(false));
    assert_eq!(writable["title"], json!(false));
    assert_eq!(writable["Role"], json!(true));
}

#[test]
fn path_translation_skips_missing_and_excluded() {
    let reg = user_registry();
    let table = reg.target_path_translation("wc-api", &["Phone"]).unwrap();
    let handles: Vec<&str> = table.iter().map(|(h, _)| h.as_str()).collect();
    assert_eq!(handles, vec!["ID", "title", "Edited Phone", "Status"]);

    let csv = reg.target_path_translation("csv", &[]).unwrap();
    assert!(csv.contains(&("secret".to_string(), "Secret".to_string())));
}

#[test]
fn sync_handles_include_reflective_and_skip_off() {
    let reg = user_registry();
    let handles = reg.sync_handles(None).unwrap();
    assert_eq!(handles, vec!["title", "Role", "Phone"]);
}

// ── Validation ───────────────────────────────────────────────────

#[test]
fn override_for_unknown_target_rejected() {
    let err = MetadataRegistry::from_value(
        "user",
        tree(),
        &json!({ "ID": { "targets": { "xml-api": { "path": "id" } } } }),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownTarget(t) if t == "xml-api"));
}

#[test]
fn unknown_property_rejected() {
    let err = MetadataRegistry::from_value("user", tree(), &json!({ "ID": { "pth": "id" } }))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidProperty { property, .. } if property == "pth"));
}

#[test]
fn bad_property_value_rejected() {
    let err = MetadataRegistry::from_value("user", tree(), &json!({ "ID": { "sync": "sometimes" } }))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidProperty { property, .. } if property == "sync"));
}

#[test]
fn structure_without_sub_data_rejected() {
    let err = MetadataRegistry::from_value(
        "user",
        tree(),
        &json!({ "meta": { "structure": { "kind": "listed-objects" } } }),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidProperty { property, .. } if property == "structure"));
}

#[test]
fn structure_display() {
    let s = Structure::MappingValue {
        key: "meta_key".into(),
        value: "meta_value".into(),
    };
    assert_eq!(s.to_string(), "mapping-value(meta_key,meta_value)");
    assert!(s.is_mapped() && !s.is_listed() && !s.is_singular());
    assert!(!s.embeds_objects());
}

// ── Aliases ──────────────────────────────────────────────────────

#[test]
fn aliases_follow_their_parent() {
    let reg = MetadataRegistry::from_value(
        "user",
        tree(),
        &json!({
            "Address 1": { "sync": "normal" },
            "City": { "sync": "normal" },
            "Address": { "sync": "normal", "aliases": ["Address 1", "City"] },
            "Name": { "sync": "normal" }
        }),
    )
    .unwrap();
    let order: Vec<&str> = reg.dependency_order().collect();
    assert_eq!(order, vec!["Address", "Address 1", "City", "Name"]);
    assert_eq!(reg.aliases("Address"), ["Address 1", "City"]);
    assert!(reg.aliases("Name").is_empty());
}

#[test]
fn alias_cycle_rejected() {
    let err = MetadataRegistry::from_value(
        "user",
        tree(),
        &json!({
            "a": { "aliases": ["b"] },
            "b": { "aliases": ["c"] },
            "c": { "aliases": ["a"] },
            "d": {}
        }),
    )
    .unwrap_err();
    match err {
        ConfigError::AliasCycle { handles, .. } => assert_eq!(handles, vec!["a", "b", "c"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_alias_rejected() {
    let err = MetadataRegistry::from_value("user", tree(), &json!({ "a": { "aliases": ["z"] } }))
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownHandle { handle, .. } if handle == "z"));
}
