//! Schema types and builders
//!
//! Resources and data sources describe their attributes with [`SchemaBuilder`]
//! and [`AttributeBuilder`]. A schema can validate a configuration and fill in
//! declared defaults before it reaches a handler.

use crate::types::{Config, Diagnostics, Dynamic};
use crate::validator::Validator;
use std::collections::HashMap;
use std::sync::Arc;

/// Terraform attribute types
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List(Box<AttributeType>),
    Map(Box<AttributeType>),
    Object(HashMap<String, AttributeType>),
}

impl AttributeType {
    /// Whether `value` conforms to this type. Unknown and null always conform.
    pub fn accepts(&self, value: &Dynamic) -> bool {
        match (self, value) {
            (_, Dynamic::Unknown) | (_, Dynamic::Null) => true,
            (AttributeType::String, Dynamic::String(_)) => true,
            (AttributeType::Number, Dynamic::Number(_)) => true,
            (AttributeType::Bool, Dynamic::Bool(_)) => true,
            (AttributeType::List(elem), Dynamic::List(items)) => {
                items.iter().all(|item| elem.accepts(item))
            }
            (AttributeType::Map(elem), Dynamic::Map(entries)) => {
                entries.values().all(|item| elem.accepts(item))
            }
            (AttributeType::Object(fields), Dynamic::Map(entries)) => entries
                .iter()
                .all(|(k, v)| fields.get(k).is_some_and(|t| t.accepts(v))),
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Changing the value requires replacing the resource
    pub force_new: bool,
    pub default: Option<Dynamic>,
    pub validators: Vec<Arc<dyn Validator>>,
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("force_new", &self.force_new)
            .field("default", &self.default)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .finish()
    }
}

/// Fluent builder for attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                force_new: false,
                default: None,
                validators: Vec::new(),
            },
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn number(name: &str) -> Self {
        Self::new(name, AttributeType::Number)
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, AttributeType::Bool)
    }

    pub fn string_list(name: &str) -> Self {
        Self::new(name, AttributeType::List(Box::new(AttributeType::String)))
    }

    pub fn string_map(name: &str) -> Self {
        Self::new(name, AttributeType::Map(Box::new(AttributeType::String)))
    }

    /// List of objects with the given field types
    pub fn object_list(name: &str, fields: HashMap<String, AttributeType>) -> Self {
        Self::new(
            name,
            AttributeType::List(Box::new(AttributeType::Object(fields))),
        )
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.attribute.force_new = true;
        self
    }

    pub fn default(mut self, value: impl Into<Dynamic>) -> Self {
        self.attribute.default = Some(value.into());
        self
    }

    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.attribute.validators.push(Arc::new(validator));
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub version: i64,
    pub description: String,
    pub attributes: HashMap<String, Attribute>,
}

pub type ResourceSchema = Schema;
pub type DataSourceSchema = Schema;

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Checks required attributes, types and attribute validators
    pub fn validate(&self, config: &Config) -> Diagnostics {
        let mut diags = Diagnostics::new();

        for name in config.values.keys() {
            if !self.attributes.contains_key(name) {
                diags.add_attribute_error(
                    name,
                    format!("Unsupported argument \"{}\"", name),
                    None::<String>,
                );
            }
        }

        let mut names: Vec<&String> = self.attributes.keys().collect();
        names.sort();

        for name in names {
            let attribute = &self.attributes[name];
            let value = config.values.get(name).unwrap_or(&Dynamic::Null);

            if value.is_null() {
                if attribute.required {
                    diags.add_attribute_error(
                        name,
                        format!("Missing required argument \"{}\"", name),
                        None::<String>,
                    );
                }
                continue;
            }

            if !attribute.r#type.accepts(value) {
                diags.add_attribute_error(
                    name,
                    format!("Incorrect attribute value type for \"{}\"", name),
                    Some(format!("Got {}", value.type_name())),
                );
                continue;
            }

            if value.is_unknown() {
                continue;
            }

            for validator in &attribute.validators {
                validator.validate(value, name, &mut diags);
            }
        }

        diags
    }

    /// Fills unset attributes that declare a default
    pub fn apply_defaults(&self, config: &mut Config) {
        for (name, attribute) in &self.attributes {
            if let Some(default) = &attribute.default {
                let unset = config.values.get(name).map_or(true, |v| v.is_null());
                if unset {
                    config.values.insert(name.clone(), default.clone());
                }
            }
        }
    }
}

/// Fluent builder for schemas
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema::default(),
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.description = desc.to_string();
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.attributes.insert(attr.name.clone(), attr);
        self
    }

    pub fn attributes(mut self, attrs: impl IntoIterator<Item = Attribute>) -> Self {
        for attr in attrs {
            self.schema.attributes.insert(attr.name.clone(), attr);
        }
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::StringInSliceValidator;

    fn vpc_schema() -> Schema {
        SchemaBuilder::new()
            .description("VPC")
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .description("Name of the VPC")
                    .build(),
            )
            .attribute(AttributeBuilder::string("cidr").required().force_new().build())
            .attribute(
                AttributeBuilder::bool("enable_ipv6")
                    .optional()
                    .default(false)
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("payment_timing")
                    .optional()
                    .validator(StringInSliceValidator::new(&["Prepaid", "Postpaid"]))
                    .build(),
            )
            .build()
    }

    fn config(pairs: &[(&str, Dynamic)]) -> Config {
        Config::from_values(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::string("name")
            .description("The name of the resource")
            .required()
            .build();

        assert_eq!(attr.name, "name");
        assert_eq!(attr.r#type, AttributeType::String);
        assert!(attr.required);
        assert!(!attr.optional);
    }

    #[test]
    fn validate_reports_missing_required() {
        let diags = vpc_schema().validate(&config(&[("name", "a".into())]));

        assert_eq!(diags.errors.len(), 1);
        assert!(diags.errors[0].summary.contains("\"cidr\""));
    }

    #[test]
    fn validate_reports_unsupported_and_mistyped() {
        let diags = vpc_schema().validate(&config(&[
            ("name", Dynamic::Number(1.0)),
            ("cidr", "10.0.0.0/16".into()),
            ("bogus", "x".into()),
        ]));

        assert_eq!(diags.errors.len(), 2);
        assert!(diags
            .errors
            .iter()
            .any(|d| d.summary.contains("Unsupported argument")));
        assert!(diags
            .errors
            .iter()
            .any(|d| d.summary.contains("Incorrect attribute value type")));
    }

    #[test]
    fn validate_runs_attribute_validators() {
        let diags = vpc_schema().validate(&config(&[
            ("name", "a".into()),
            ("cidr", "10.0.0.0/16".into()),
            ("payment_timing", "Monthly".into()),
        ]));

        assert_eq!(diags.errors.len(), 1);
        assert!(diags.errors[0].summary.contains("payment_timing"));
    }

    #[test]
    fn unknown_values_skip_validation() {
        let diags = vpc_schema().validate(&config(&[
            ("name", Dynamic::Unknown),
            ("cidr", Dynamic::Unknown),
            ("payment_timing", Dynamic::Unknown),
        ]));

        assert!(!diags.has_errors());
    }

    #[test]
    fn apply_defaults_fills_only_unset_values() {
        let schema = vpc_schema();
        let mut cfg = config(&[("name", "a".into())]);
        schema.apply_defaults(&mut cfg);
        assert_eq!(cfg.get_bool("enable_ipv6"), Some(false));

        let mut cfg = config(&[("enable_ipv6", true.into())]);
        schema.apply_defaults(&mut cfg);
        assert_eq!(cfg.get_bool("enable_ipv6"), Some(true));
    }

    #[test]
    fn object_list_type_checks_fields() {
        let filter_type = AttributeType::List(Box::new(AttributeType::Object(HashMap::from([
            ("name".to_string(), AttributeType::String),
            (
                "values".to_string(),
                AttributeType::List(Box::new(AttributeType::String)),
            ),
        ]))));

        let good = Dynamic::from(serde_json::json!([{"name": "status", "values": ["Running"]}]));
        let bad = Dynamic::from(serde_json::json!([{"name": "status", "values": "Running"}]));

        assert!(filter_type.accepts(&good));
        assert!(!filter_type.accepts(&bad));
    }
}
