use fieldsync_schema::{ConfigError, Property, RegistryCatalog, Structure};
use serde_json::json;

fn product_catalog() -> serde_json::Value {
    json!({
        "targets": { "api": { "wp-api": { "wp-api-v2": {} } }, "gen-csv": {} },
        "time_zones": { "store_local": 36000 },
        "registries": {
            "product": {
                "handles": {
                    "codesum": { "path": "sku" },
                    "meta": {
                        "sub_data": "meta",
                        "path": "meta_data",
                        "structure": { "kind": "listed-objects" },
                        "targets": {
                            "wp-api": {
                                "path": "meta",
                                "structure": { "kind": "mapping-value", "key": "meta_key", "value": "meta_value" }
                            },
                            "gen-csv": { "path": null }
                        }
                    },
                    "image": { "sub_data": "image", "path": "images" }
                }
            },
            "meta": {
                "handles": {
                    "meta_key": { "path": "key" },
                    "meta_value": { "path": "value" }
                }
            },
            "image": {
                "handles": {
                    "src": { "path": "src", "type": "uri" },
                    "meta": { "sub_data": "meta", "path": "meta" }
                }
            }
        }
    })
}

// ── Loading ──────────────────────────────────────────────────────

#[test]
fn loads_registries_in_any_order() {
    let catalog = RegistryCatalog::from_value(&product_catalog()).unwrap();
    let names: Vec<&str> = catalog.names().collect();
    assert_eq!(names, vec!["product", "meta", "image"]);
    assert_eq!(catalog.time_zones().store_local, 36000);
    assert!(catalog.targets().contains("wp-api-v2"));
}

#[test]
fn loads_from_json_text() {
    let text = serde_json::to_string(&product_catalog()).unwrap();
    let catalog = RegistryCatalog::from_json(&text).unwrap();
    assert!(catalog.get("meta").is_ok());
}

#[test]
fn sub_registries_are_shared() {
    let catalog = RegistryCatalog::from_value(&product_catalog()).unwrap();
    let product = catalog.get("product").unwrap();
    let image = catalog.get("image").unwrap();
    let from_product = product.sub_registry("meta").unwrap();
    let from_image = image.sub_registry("meta").unwrap();
    assert!(std::sync::Arc::ptr_eq(from_product, from_image));
    assert_eq!(from_product.name(), "meta");
    assert_eq!(product.time_zones().store_local, 36000);
}

#[test]
fn structure_resolves_per_target() {
    let catalog = RegistryCatalog::from_value(&product_catalog()).unwrap();
    let product = catalog.get("product").unwrap();
    let v2 = product.scope(Some("wp-api-v2")).unwrap();
    assert_eq!(
        v2.structure("meta"),
        Some(&Structure::MappingValue {
            key: "meta_key".into(),
            value: "meta_value".into()
        })
    );
    assert_eq!(
        product.resolve_property("meta", Property::Structure, Some("api")).unwrap(),
        json!({ "kind": "listed-objects" })
    );
    let sub = v2.sub_scope("meta").unwrap();
    assert_eq!(sub.path("meta_key"), Some("key"));
    assert_eq!(sub.target(), Some("wp-api-v2"));
}

#[test]
fn unknown_registry_lookup() {
    let catalog = RegistryCatalog::from_value(&product_catalog()).unwrap();
    assert!(matches!(catalog.get("order"), Err(ConfigError::UnknownRegistry(_))));
}

// ── Validation ───────────────────────────────────────────────────

#[test]
fn unknown_sub_data_rejected() {
    let err = RegistryCatalog::from_value(&json!({
        "targets": {},
        "registries": { "product": { "handles": { "meta": { "sub_data": "meta" } } } }
    }))
    .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownSubData { name, .. } if name == "meta"));
}

#[test]
fn sub_data_cycle_rejected() {
    let err = RegistryCatalog::from_value(&json!({
        "registries": {
            "category": { "handles": { "parent": { "sub_data": "tree" } } },
            "tree": { "handles": { "child": { "sub_data": "category" } } }
        }
    }))
    .unwrap_err();
    assert!(matches!(err, ConfigError::SubDataCycle(_)));
}

#[test]
fn self_embedding_rejected() {
    let err = RegistryCatalog::from_value(&json!({
        "registries": { "category": { "handles": { "parent": { "sub_data": "category" } } } }
    }))
    .unwrap_err();
    assert!(matches!(err, ConfigError::SubDataCycle(name) if name == "category"));
}

#[test]
fn structure_must_reference_sub_handles() {
    let err = RegistryCatalog::from_value(&json!({
        "registries": {
            "meta": { "handles": { "meta_key": {} } },
            "product": { "handles": { "meta": {
                "sub_data": "meta",
                "structure": { "kind": "mapping-value", "key": "meta_key", "value": "missing" }
            } } }
        }
    }))
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidProperty { property, .. } if property == "structure"));
}

#[test]
fn unknown_top_level_key_rejected() {
    let err = RegistryCatalog::from_value(&json!({ "target": {} })).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn empty_catalog_is_valid() {
    let catalog = RegistryCatalog::from_value(&json!({})).unwrap();
    assert_eq!(catalog.names().count(), 0);
    assert!(catalog.targets().is_empty());
}
