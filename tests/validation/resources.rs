//! Resource validation against the embedded schema table.

use serde_json::json;

use crate::assert_error_kinds;
use crate::common::builders::ResourceBuilder;
use crate::common::{fixtures, validate};
use scim_conformance::schema::{AGENT_URN, ENTERPRISE_USER_URN, GROUP_URN, USER_URN};

#[test]
fn test_minimal_resources_are_valid() {
    for resource in [
        ResourceBuilder::user().build(),
        ResourceBuilder::group().build(),
        ResourceBuilder::agent().build(),
        ResourceBuilder::agentic_application().build(),
    ] {
        let errors = validate(&resource);
        assert!(errors.is_empty(), "{} -> {:#?}", resource, errors);
    }
}

#[test]
fn test_rfc_examples_are_valid() {
    assert_error_kinds!(validate(&fixtures::user_full()), []);
    assert_error_kinds!(validate(&fixtures::group_with_members()), []);
    assert_error_kinds!(validate(&fixtures::agent_full()), []);
    assert_error_kinds!(validate(&fixtures::agentic_application()), []);
}

#[test]
fn test_user_without_user_name() {
    let errors = validate(&ResourceBuilder::user().without("userName").build());

    assert_error_kinds!(errors, [MissingRequiredAttribute]);
    assert_eq!(errors[0].path, "userName");
    assert_eq!(errors[0].schema.as_deref(), Some(USER_URN));
}

#[test]
fn test_required_attribute_per_kind() {
    let cases = [
        (ResourceBuilder::group().without("displayName").build(), "displayName"),
        (ResourceBuilder::agent().without("name").build(), "name"),
        (ResourceBuilder::agentic_application().with("name", json!("")).build(), "name"),
    ];
    for (resource, path) in cases {
        let errors = validate(&resource);
        assert_error_kinds!(errors, [MissingRequiredAttribute]);
        assert_eq!(errors[0].path, path);
    }
}

#[test]
fn test_server_attributes_are_read_only() {
    let errors = validate(&ResourceBuilder::user().with_server_attributes().build());

    // meta sub-attributes are not reported again
    assert_error_kinds!(errors, [ImmutableAttributeViolation, ImmutableAttributeViolation]);
    let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["id", "meta"]);
    assert!(errors[0].message.contains("readOnly"));
}

#[test]
fn test_null_read_only_attribute_is_still_set() {
    let user = ResourceBuilder::user().with_null("id").with_null("groups").build();
    let errors = validate(&user);

    assert_error_kinds!(
        errors,
        [
            ImmutableAttributeViolation,
            NullValueViolation,
            ImmutableAttributeViolation,
            NullValueViolation
        ]
    );
    let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["id", "id", "groups", "groups"]);
}

#[test]
fn test_agent_server_managed_attributes() {
    let agent = ResourceBuilder::agent()
        .with("parent", json!({"value": "a-1"}))
        .with("applications", json!([{"value": "app-1"}]))
        .with("protocols", json!([{"type": "A2A"}]))
        .build();
    let errors = validate(&agent);

    assert_error_kinds!(
        errors,
        [
            ImmutableAttributeViolation,
            ImmutableAttributeViolation,
            ImmutableAttributeViolation
        ]
    );
    assert!(errors.iter().all(|e| e.schema.as_deref() == Some(AGENT_URN)));
}

#[test]
fn test_null_values_anywhere() {
    let user = ResourceBuilder::user()
        .with_null("displayName")
        .with("emails", json!([{"value": null, "type": "work"}]))
        .with("favoriteColor", json!({"shade": null}))
        .build();
    let errors = validate(&user);

    assert_error_kinds!(errors, [NullValueViolation, NullValueViolation, NullValueViolation]);
    let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["displayName", "emails[0].value", "favoriteColor.shade"]);
}

#[test]
fn test_shape_violations() {
    let group = ResourceBuilder::group()
        .with("members", json!({"value": "u1"}))
        .with("displayName", json!(["Admins"]))
        .build();
    let errors = validate(&group);

    assert_error_kinds!(errors, [StructuralShapeViolation, StructuralShapeViolation]);
    assert_eq!(errors[0].path, "displayName");
    assert_eq!(errors[1].path, "members");
}

#[test]
fn test_schema_resolution_errors() {
    let cases = [
        ResourceBuilder::user().without("schemas").build(),
        ResourceBuilder::user().with_schemas(&[]).build(),
        ResourceBuilder::user().with("schemas", json!(USER_URN)).build(),
        ResourceBuilder::user().with_schemas(&[USER_URN, GROUP_URN]).build(),
        ResourceBuilder::user().with_schemas(&[ENTERPRISE_USER_URN]).build(),
        ResourceBuilder::user().with_schemas(&["urn:example:Device"]).build(),
    ];
    for resource in cases {
        let errors = validate(&resource);
        assert_eq!(
            errors.first().map(|e| e.kind),
            Some(scim_conformance::ValidationErrorKind::InvalidSchema),
            "{} -> {:#?}",
            resource,
            errors
        );
        let schema_errors = errors
            .iter()
            .filter(|e| e.kind == scim_conformance::ValidationErrorKind::InvalidSchema)
            .count();
        assert_eq!(schema_errors, 1);
    }
}

#[test]
fn test_errors_are_collected_in_order() {
    let user = ResourceBuilder::user()
        .with_schemas(&[USER_URN, "urn:example:custom"])
        .without("userName")
        .with("id", json!("abc"))
        .with_null("nickName")
        .build();
    let errors = validate(&user);

    assert_error_kinds!(
        errors,
        [
            InvalidSchema,
            ImmutableAttributeViolation,
            NullValueViolation,
            MissingRequiredAttribute
        ]
    );
}

#[test]
fn test_enterprise_extension_attributes() {
    let user = ResourceBuilder::user()
        .with_enterprise(json!({"employeeNumber": "701984", "costCenter": null}))
        .build();
    let errors = validate(&user);

    assert_error_kinds!(errors, [NullValueViolation]);
    assert_eq!(errors[0].path, format!("{}:costCenter", ENTERPRISE_USER_URN));
}

#[test]
fn test_display_names_the_location() {
    let errors = validate(&ResourceBuilder::user().with_null("title").build());
    assert!(errors[0].to_string().ends_with("(at 'title')"));
}
