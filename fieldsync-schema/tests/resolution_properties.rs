//! Property-based tests for ancestor resolution.
//!
//! For a chain `api → wp-api → wp-api-v2`, a property declared only on
//! `wp-api` must resolve identically via `wp-api` and `wp-api-v2`, and a
//! declaration on `wp-api-v2` must always win over `wp-api`'s.

use fieldsync_schema::{MetadataRegistry, Property, TargetTree};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn tree() -> Arc<TargetTree> {
    Arc::new(
        TargetTree::from_value(&json!({ "api": { "wp-api": { "wp-api-v2": {} } } })).unwrap(),
    )
}

fn path_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z_]{1,12}(\\.[a-z_]{1,8}){0,2}").unwrap()
}

proptest! {
    #[test]
    fn inherited_declaration_is_identical(global in path_strategy(), inherited in path_strategy()) {
        let reg = MetadataRegistry::from_value("p", tree(), &json!({
            "field": { "path": global, "targets": { "wp-api": { "path": inherited.clone() } } }
        })).unwrap();
        let via_parent = reg.resolve_property("field", Property::Path, Some("wp-api")).unwrap();
        let via_child = reg.resolve_property("field", Property::Path, Some("wp-api-v2")).unwrap();
        prop_assert_eq!(&via_parent, &via_child);
        prop_assert_eq!(via_child, json!(inherited));
    }

    #[test]
    fn closer_declaration_wins(inherited in path_strategy(), own in path_strategy(), write in any::<bool>()) {
        let reg = MetadataRegistry::from_value("p", tree(), &json!({
            "field": {
                "targets": {
                    "wp-api": { "path": inherited, "write": !write },
                    "wp-api-v2": { "path": own.clone(), "write": write }
                }
            }
        })).unwrap();
        let scope = reg.scope(Some("wp-api-v2")).unwrap();
        prop_assert_eq!(scope.path("field"), Some(own.as_str()));
        prop_assert_eq!(scope.is_writable("field"), write);
        prop_assert_eq!(reg.scope(Some("api")).unwrap().path("field"), None);
    }

    #[test]
    fn resolution_is_repeatable(global in path_strategy()) {
        let reg = MetadataRegistry::from_value("p", tree(), &json!({ "field": { "path": global } })).unwrap();
        for target in [None, Some("api"), Some("wp-api"), Some("wp-api-v2")] {
            let first = reg.resolve_property("field", Property::Path, target).unwrap();
            let second = reg.resolve_property("field", Property::Path, target).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
