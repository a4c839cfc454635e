//! Attribute rules for full SCIM resources.
//!
//! Walks a payload once, in document order, and collects every violation:
//! schema resolution, nulls, mutability, multi-valued and complex shape.
//! Required-attribute checks run after the walk since a missing attribute has
//! no position in the document.

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::schema::{AttributeDefinition, ResourceTypeDefinition, Schema, SchemaRegistry};

pub(super) struct ResourceRules<'a> {
    registry: &'a SchemaRegistry,
    errors: Vec<ValidationError>,
}

impl<'a> ResourceRules<'a> {
    pub(super) fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            errors: Vec::new(),
        }
    }

    pub(super) fn check(mut self, payload: &Value) -> Vec<ValidationError> {
        let Some(object) = payload.as_object() else {
            self.errors.push(ValidationError::invalid_json(
                "SCIM resource must be a JSON object",
            ));
            return self.errors;
        };

        let registry = self.registry;
        let definition = self.check_schemas(object);

        for (key, value) in object {
            if key == "schemas" {
                self.check_nulls(value, key);
                continue;
            }

            let Some(definition) = definition else {
                self.check_nulls(value, key);
                continue;
            };

            if definition.allows_extension(key) {
                if let Some(extension) = registry.extension(key) {
                    self.check_extension(extension, value, key);
                    continue;
                }
            }

            match definition.schema.attribute(key) {
                Some(attribute) => {
                    self.check_attribute(attribute, value, key, definition.core_urn(), true)
                }
                None => self.check_nulls(value, key),
            }
        }

        if let Some(definition) = definition {
            self.check_required(object, definition);
        }

        self.errors
    }

    /// Validate the `schemas` attribute and return the definition attribute
    /// checks run against. At most one `InvalidSchema` error is produced.
    fn check_schemas(&mut self, object: &Map<String, Value>) -> Option<&'a ResourceTypeDefinition> {
        let registry = self.registry;
        let urns = match object.get("schemas") {
            None => {
                self.errors.push(ValidationError::invalid_schema(
                    "Missing required 'schemas' attribute; list the core schema URN of the resource",
                ));
                return None;
            }
            Some(Value::Array(items)) if items.is_empty() => {
                self.errors.push(ValidationError::invalid_schema(
                    "'schemas' must be a non-empty array of schema URNs",
                ));
                return None;
            }
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.errors.push(ValidationError::invalid_schema(
                    "'schemas' must be an array of schema URN strings",
                ));
                return None;
            }
        };

        let strings: Vec<&str> = urns.iter().filter_map(Value::as_str).collect();
        let resolved = registry.resolve_resource_type(&strings);

        if strings.len() != urns.len() {
            self.errors.push(ValidationError::invalid_schema(
                "every entry of 'schemas' must be a schema URN string",
            ));
            return resolved.ok().and_then(|kind| registry.lookup(kind));
        }

        match resolved {
            Ok(kind) => registry.lookup(kind),
            Err(error) => {
                self.errors
                    .push(ValidationError::invalid_schema(error.to_string()));
                registry.lookup(error.best_guess())
            }
        }
    }

    fn check_extension(&mut self, extension: &Schema, value: &Value, path: &str) {
        let Some(block) = value.as_object() else {
            if value.is_null() {
                self.errors.push(ValidationError::null_value(path));
            } else {
                self.errors.push(ValidationError::shape(
                    path,
                    format!("Extension '{}' must be a JSON object of its attributes", path),
                ));
                self.check_nulls(value, path);
            }
            return;
        };

        for (key, value) in block {
            let attribute_path = format!("{}:{}", extension.id, key);
            match extension.attribute(key) {
                Some(attribute) => {
                    self.check_attribute(attribute, value, &attribute_path, &extension.id, true)
                }
                None => self.check_nulls(value, &attribute_path),
            }
        }
    }

    fn check_attribute(
        &mut self,
        attribute: &AttributeDefinition,
        value: &Value,
        path: &str,
        schema_urn: &str,
        check_mutability: bool,
    ) {
        // Present means set, whatever the value.
        if check_mutability && !attribute.is_client_writable() {
            self.errors.push(ValidationError::immutable(
                path,
                schema_urn,
                attribute.mutability.as_str(),
            ));
        }

        if value.is_null() {
            self.errors.push(ValidationError::null_value(path));
            return;
        }
        // Sub-attributes of a server-managed attribute are not reported again.
        let check_children = check_mutability && attribute.is_client_writable();

        match value {
            Value::Array(items) if attribute.multi_valued => {
                for (index, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, index);
                    self.check_element(attribute, item, &item_path, schema_urn, check_children);
                }
            }
            Value::Array(_) => {
                self.errors.push(ValidationError::shape(
                    path,
                    format!("'{}' is single-valued and must not be an array", path),
                ));
                self.check_nulls(value, path);
            }
            _ if attribute.multi_valued => {
                self.errors.push(ValidationError::shape(
                    path,
                    format!("'{}' is multi-valued and must be an array", path),
                ));
                self.check_nulls(value, path);
            }
            _ => self.check_element(attribute, value, path, schema_urn, check_children),
        }
    }

    /// A single value of an attribute: the attribute itself when
    /// single-valued, or one array element when multi-valued.
    fn check_element(
        &mut self,
        attribute: &AttributeDefinition,
        value: &Value,
        path: &str,
        schema_urn: &str,
        check_mutability: bool,
    ) {
        match value {
            Value::Null => self.errors.push(ValidationError::null_value(path)),
            Value::Object(fields) if attribute.is_complex() => {
                for (key, child) in fields {
                    let child_path = format!("{}.{}", path, key);
                    match attribute.sub_attribute(key) {
                        Some(sub) => self.check_attribute(
                            sub,
                            child,
                            &child_path,
                            schema_urn,
                            check_mutability,
                        ),
                        None => self.check_nulls(child, &child_path),
                    }
                }
            }
            _ if attribute.is_complex() => {
                self.errors.push(ValidationError::shape(
                    path,
                    format!("'{}' is a complex attribute and must be a JSON object", path),
                ));
                self.check_nulls(value, path);
            }
            Value::Object(_) => {
                self.errors.push(ValidationError::shape(
                    path,
                    format!("'{}' is not a complex attribute and must not be an object", path),
                ));
                self.check_nulls(value, path);
            }
            Value::Array(_) => {
                self.errors.push(ValidationError::shape(
                    path,
                    format!("'{}' must not contain nested arrays", path),
                ));
                self.check_nulls(value, path);
            }
            _ => {}
        }
    }

    /// Report every null nested anywhere in a value
    fn check_nulls(&mut self, value: &Value, path: &str) {
        match value {
            Value::Null => self.errors.push(ValidationError::null_value(path)),
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    self.check_nulls(item, &format!("{}[{}]", path, index));
                }
            }
            Value::Object(fields) => {
                for (key, child) in fields {
                    self.check_nulls(child, &format!("{}.{}", path, key));
                }
            }
            _ => {}
        }
    }

    fn check_required(&mut self, object: &Map<String, Value>, definition: &ResourceTypeDefinition) {
        for attribute in definition.schema.required_attributes() {
            if !is_present(find_key(object, &attribute.name)) {
                self.errors.push(ValidationError::missing_required(
                    attribute.name.clone(),
                    definition.core_urn(),
                ));
            }
        }

        for urn in &definition.extensions {
            let registry = self.registry;
            let (Some(Value::Object(block)), Some(extension)) =
                (object.get(urn.as_str()), registry.extension(urn))
            else {
                continue;
            };
            for attribute in extension.required_attributes() {
                if !is_present(find_key(block, &attribute.name)) {
                    self.errors.push(ValidationError::missing_required(
                        format!("{}:{}", urn, attribute.name),
                        urn,
                    ));
                }
            }
        }
    }
}

fn find_key<'v>(object: &'v Map<String, Value>, name: &str) -> Option<&'v Value> {
    object
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}
