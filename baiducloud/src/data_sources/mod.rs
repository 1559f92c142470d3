//! Data source implementations
//!
//! Every data source lists objects through a service, flattens them into
//! rows, narrows the rows with the `filter` blocks and, when `output_file` is
//! set, writes the remaining rows there as JSON.

pub mod ccev2_cluster_instances;
pub mod eips;
pub mod instances;
pub mod subnets;
pub mod vpcs;

pub use ccev2_cluster_instances::CceV2ClusterInstancesDataSource;
pub use eips::EipsDataSource;
pub use instances::InstancesDataSource;
pub use subnets::SubnetsDataSource;
pub use vpcs::VpcsDataSource;

use crate::errors::{wrap_error, ErrorSource, ProviderError};
use crate::utils::{stable_id, write_to_file};
use std::collections::HashMap;
use tfplug::helper::filter::{filter_attribute, validate_filter_config, FILTER_ATTRIBUTE};
use tfplug::helper::{apply_filter, rows_to_dynamic, DataSourceFilter, Row};
use tfplug::schema::Attribute;
use tfplug::{AttributeBuilder, AttributeType, Config, Diagnostics, Schema, State};

pub(crate) const OUTPUT_FILE_ATTRIBUTE: &str = "output_file";

/// `id`, `filter` and `output_file`
pub(crate) fn common_attributes() -> Vec<Attribute> {
    vec![
        AttributeBuilder::string("id")
            .computed()
            .description("Hash of the ids in the result")
            .build(),
        filter_attribute(),
        AttributeBuilder::string(OUTPUT_FILE_ATTRIBUTE)
            .optional()
            .description("Path to write the result to as JSON")
            .build(),
    ]
}

/// Computed list of result rows with the given field types
pub(crate) fn rows_attribute(
    name: &str,
    description: &str,
    fields: &[(&str, AttributeType)],
) -> Attribute {
    let fields: HashMap<String, AttributeType> = fields
        .iter()
        .map(|(field, ty)| (field.to_string(), ty.clone()))
        .collect();
    AttributeBuilder::object_list(name, fields)
        .computed()
        .description(description)
        .build()
}

pub(crate) fn string_list() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::String))
}

pub(crate) fn string_map() -> AttributeType {
    AttributeType::Map(Box::new(AttributeType::String))
}

pub(crate) fn validate_config(schema: &Schema, config: &Config) -> Diagnostics {
    let mut diagnostics = schema.validate(config);
    validate_filter_config(config.get(FILTER_ATTRIBUTE), &mut diagnostics);
    diagnostics
}

/// Filters `rows`, writes `output_file` and builds the data source state.
/// `id_field` names the row field hashed into the data source id.
pub(crate) async fn finish_read(
    type_name: &str,
    config: &Config,
    rows_key: &str,
    id_field: &str,
    mut rows: Vec<Row>,
) -> Result<State, ProviderError> {
    let filter = DataSourceFilter::from_config(config.get(FILTER_ATTRIBUTE));
    apply_filter(&mut rows, filter.as_ref());

    let id = stable_id(
        rows.iter()
            .map(|row| row.get(id_field).and_then(|v| v.as_str()).unwrap_or_default()),
    );

    if let Some(path) = config.get_non_empty_string(OUTPUT_FILE_ATTRIBUTE) {
        write_to_file(&path, &rows)
            .await
            .map_err(|e| wrap_error(e, type_name, "read", ErrorSource::Provider))?;
    }

    let mut state = config.clone();
    state.set_id(id);
    state.set(rows_key, rows_to_dynamic(rows));
    Ok(state)
}

/// Flattening failures are provider bugs rather than API errors
pub(crate) fn flatten_error(err: tfplug::TfplugError, type_name: &str) -> ProviderError {
    wrap_error(err, type_name, "read", ErrorSource::Provider)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use tfplug::Dynamic;

    fn rows() -> Vec<Row> {
        [
            json!({"vpc_id": "vpc-1", "name": "prod", "is_default": false}),
            json!({"vpc_id": "vpc-2", "name": "default", "is_default": true}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect()
    }

    fn name_filter(value: &str) -> Dynamic {
        let block: HashMap<String, Dynamic> = HashMap::from([
            ("name".to_string(), Dynamic::from("name")),
            (
                "values".to_string(),
                Dynamic::List(vec![Dynamic::from(value)]),
            ),
        ]);
        Dynamic::List(vec![Dynamic::Map(block)])
    }

    #[tokio::test]
    async fn filter_narrows_rows_and_id() {
        let mut config = Config::new();
        config.set(FILTER_ATTRIBUTE, name_filter("^pro"));

        let state = finish_read("baiducloud_vpcs", &config, "vpcs", "vpc_id", rows())
            .await
            .unwrap();

        let vpcs = state.get_list("vpcs").unwrap();
        assert_eq!(vpcs.len(), 1);
        assert_eq!(state.id(), Some(stable_id(["vpc-1"])));
    }

    #[tokio::test]
    async fn output_file_receives_filtered_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/vpcs.json");
        let mut config = Config::new();
        config.set(FILTER_ATTRIBUTE, name_filter("default"));
        config.set(OUTPUT_FILE_ATTRIBUTE, path.to_string_lossy().to_string());

        finish_read("baiducloud_vpcs", &config, "vpcs", "vpc_id", rows())
            .await
            .unwrap();

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, json!([{"vpc_id": "vpc-2", "name": "default", "is_default": true}]));
    }

    #[tokio::test]
    async fn unwritable_output_is_reported() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let mut config = Config::new();
        config.set(
            OUTPUT_FILE_ATTRIBUTE,
            blocker.join("nested.json").to_string_lossy().to_string(),
        );

        let err = finish_read("baiducloud_vpcs", &config, "vpcs", "vpc_id", rows())
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Resource baiducloud_vpcs read Failed!!! [terraform-provider]"));
    }

    #[test]
    fn empty_filter_values_warn() {
        let schema = tfplug::SchemaBuilder::new()
            .attributes(common_attributes())
            .build();
        let mut config = Config::new();
        let block: HashMap<String, Dynamic> = HashMap::from([
            ("name".to_string(), Dynamic::from("name")),
            ("values".to_string(), Dynamic::List(vec![])),
        ]);
        config.set(FILTER_ATTRIBUTE, Dynamic::List(vec![Dynamic::Map(block)]));

        let diags = validate_config(&schema, &config);
        assert!(!diags.has_errors());
        assert_eq!(diags.warnings.len(), 1);
    }
}
