//! PATCH document validation.

use serde_json::json;

use crate::assert_error_kinds;
use crate::common::builders::PatchBuilder;
use crate::common::{fixtures, validate_patch};
use scim_conformance::probe::PayloadFactory;
use scim_conformance::validator::PatchOperation;

#[test]
fn test_rfc_patch_is_valid() {
    assert_error_kinds!(validate_patch(&fixtures::patch_members()), []);
}

#[test]
fn test_probe_patches_are_valid() {
    let patches = [
        PayloadFactory::patch(vec![PatchOperation::replace("active", json!(false))]),
        PayloadFactory::patch(vec![PatchOperation::add("members", json!([{"value": "u1"}]))]),
        PayloadFactory::patch(vec![PatchOperation::remove("members")]),
    ];
    for patch in &patches {
        assert_error_kinds!(validate_patch(patch), []);
    }
}

#[test]
fn test_missing_patch_schema() {
    let patch = PatchBuilder::new()
        .without_schemas()
        .replace("displayName", json!("Ops"))
        .build();
    assert_error_kinds!(validate_patch(&patch), [InvalidSchema]);
}

#[test]
fn test_empty_operations() {
    assert_error_kinds!(validate_patch(&PatchBuilder::new().build()), [InvalidPatchOperation]);
}

#[test]
fn test_every_bad_operation_is_reported() {
    let patch = PatchBuilder::new()
        .operation(json!({"path": "title", "value": "x"}))
        .operation(json!({"op": "remove"}))
        .operation(json!({"op": "replace", "path": "nickName"}))
        .build();
    let errors = validate_patch(&patch);

    assert_error_kinds!(
        errors,
        [InvalidPatchOperation, InvalidPatchOperation, InvalidPatchOperation]
    );
    let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["Operations[0].op", "Operations[1].path", "Operations[2].value"]
    );
}

#[test]
fn test_duplicate_paths() {
    let patch = PatchBuilder::new()
        .replace("displayName", json!("a"))
        .replace("displayName", json!("b"))
        .build();
    let errors = validate_patch(&patch);

    assert_error_kinds!(errors, [DuplicatePatchPath]);
    assert_eq!(errors[0].path, "Operations[1].path");
}

#[test]
fn test_read_only_paths_are_not_checked() {
    let patch = PatchBuilder::new().replace("meta", json!({"version": "W/\"1\""})).build();
    assert_error_kinds!(validate_patch(&patch), []);
}
