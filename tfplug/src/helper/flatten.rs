//! Turning typed API objects into attribute rows

use super::filter::Row;
use crate::error::{Result, TfplugError};
use crate::types::Dynamic;
use serde::Serialize;
use serde_json::Value;

/// Serializes `item` into a row. `item` must serialize to a JSON object.
pub fn flatten<T: Serialize>(item: &T) -> Result<Row> {
    match serde_json::to_value(item)? {
        Value::Object(row) => Ok(row),
        other => Err(TfplugError::TypeMismatch {
            expected: "object".to_string(),
            actual: json_type_name(&other).to_string(),
        }),
    }
}

pub fn flatten_all<'a, T, I>(items: I) -> Result<Vec<Row>>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items.into_iter().map(flatten).collect()
}

/// Rows as a Terraform list of objects
pub fn rows_to_dynamic(rows: Vec<Row>) -> Dynamic {
    Dynamic::List(
        rows.into_iter()
            .map(|row| Dynamic::from(Value::Object(row)))
            .collect(),
    )
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Subnet {
        subnet_id: String,
        cidr: String,
        available_ip: u32,
        ipv6: bool,
    }

    #[test]
    fn flatten_keeps_field_names_and_types() {
        let subnet = Subnet {
            subnet_id: "sbn-1".to_string(),
            cidr: "192.168.0.0/24".to_string(),
            available_ip: 250,
            ipv6: false,
        };

        let row = flatten(&subnet).unwrap();

        assert_eq!(row["subnet_id"], json!("sbn-1"));
        assert_eq!(row["available_ip"], json!(250));
        assert_eq!(row["ipv6"], json!(false));
    }

    #[test]
    fn flatten_rejects_non_objects() {
        let err = flatten(&vec![1, 2]).unwrap_err();
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn rows_become_list_of_maps() {
        let rows = flatten_all(&[json!({"id": "a"}), json!({"id": "b"})]).unwrap();
        let value = rows_to_dynamic(rows);

        let items = value.as_list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[1].as_map().unwrap()["id"].as_string(),
            Some(&"b".to_string())
        );
    }
}
