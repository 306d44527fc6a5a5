mod csv;
mod json;
mod table;
mod yaml;

pub use csv::CsvFormatter;
pub use json::JsonFormatter;
pub use table::TableFormatter;
pub use yaml::YamlFormatter;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DynamicObject;
use k8slive::kubernetes::PartialObjectMetadata;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::cli::OutputFormat;

const METADATA_COLUMNS: &[&str] = &["namespace", "name", "kind", "resource_version", "labels"];

/// Columns holding JSON documents, emitted as nested values in json/yaml
const JSON_COLUMNS: &[&str] = &["labels", "spec", "status", "data"];

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryResult {
    /// One row per object, with its spec/status (or data) documents
    pub fn from_objects<'a>(objects: impl IntoIterator<Item = &'a DynamicObject>) -> Self {
        let mut columns: Vec<String> = METADATA_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.extend(["spec", "status", "data"].iter().map(|c| c.to_string()));

        let rows = objects
            .into_iter()
            .map(|obj| {
                let kind = obj.types.as_ref().map(|t| t.kind.as_str()).unwrap_or("");
                let mut row = metadata_row(&obj.metadata, kind);
                for field in ["spec", "status", "data"] {
                    row.push(obj.data.get(field).map(document).unwrap_or_default());
                }
                row
            })
            .collect();

        Self { columns, rows }
    }

    /// One row per object, metadata columns only
    pub fn from_metadata<'a>(items: impl IntoIterator<Item = &'a PartialObjectMetadata>) -> Self {
        let rows = items
            .into_iter()
            .map(|item| {
                let kind = item.types.as_ref().map(|t| t.kind.as_str()).unwrap_or("");
                metadata_row(&item.metadata, kind)
            })
            .collect();

        Self {
            columns: METADATA_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn format(&self, format: &OutputFormat, no_headers: bool) -> String {
        match format {
            OutputFormat::Table => TableFormatter::format(self, no_headers),
            OutputFormat::Json => JsonFormatter::format(self),
            OutputFormat::Csv => CsvFormatter::format(self, no_headers),
            OutputFormat::Yaml => YamlFormatter::format(self),
        }
    }

    /// Rows as JSON objects keyed by column, with document columns nested
    pub fn to_json_rows(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let fields: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(col, val)| (col.clone(), cell_value(col, val)))
                    .collect();
                Value::Object(fields)
            })
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn metadata_row(meta: &ObjectMeta, kind: &str) -> Vec<String> {
    vec![
        meta.namespace.clone().unwrap_or_default(),
        meta.name.clone().unwrap_or_default(),
        kind.to_string(),
        meta.resource_version.clone().unwrap_or_default(),
        labels(meta.labels.as_ref()),
    ]
}

fn labels(labels: Option<&BTreeMap<String, String>>) -> String {
    match labels {
        Some(labels) if !labels.is_empty() => serde_json::to_string(labels).unwrap_or_default(),
        _ => String::new(),
    }
}

fn document(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cell_value(column: &str, value: &str) -> Value {
    if value.is_empty() {
        return Value::Null;
    }
    if JSON_COLUMNS.contains(&column)
        && let Ok(parsed) = serde_json::from_str::<Value>(value)
        && (parsed.is_object() || parsed.is_array())
    {
        return parsed;
    }
    Value::String(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pod() -> DynamicObject {
        serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": "web-0",
                "namespace": "default",
                "resourceVersion": "42",
                "labels": { "app": "web" }
            },
            "spec": { "nodeName": "node-1" }
        }))
        .unwrap()
    }

    #[test]
    fn test_from_objects_columns() {
        let obj = pod();
        let result = QueryResult::from_objects([&obj]);
        assert_eq!(result.row_count(), 1);
        assert_eq!(result.columns[1], "name");
        let row = &result.rows[0];
        assert_eq!(row[0], "default");
        assert_eq!(row[1], "web-0");
        assert_eq!(row[2], "Pod");
        assert_eq!(row[3], "42");
        assert_eq!(row[4], r#"{"app":"web"}"#);
        assert_eq!(row[5], r#"{"nodeName":"node-1"}"#);
        // no status, no data
        assert_eq!(row[6], "");
        assert_eq!(row[7], "");
    }

    #[test]
    fn test_from_metadata_has_no_documents() {
        let obj = pod();
        let meta = PartialObjectMetadata::from(&obj);
        let result = QueryResult::from_metadata([&meta]);
        assert_eq!(result.columns.len(), METADATA_COLUMNS.len());
        assert!(!result.columns.contains(&"spec".to_string()));
        assert_eq!(result.rows[0][1], "web-0");
    }

    #[test]
    fn test_to_json_rows_nests_documents() {
        let obj = pod();
        let rows = QueryResult::from_objects([&obj]).to_json_rows();
        assert_eq!(rows[0]["name"], json!("web-0"));
        assert_eq!(rows[0]["labels"], json!({ "app": "web" }));
        assert_eq!(rows[0]["spec"]["nodeName"], json!("node-1"));
        assert_eq!(rows[0]["status"], Value::Null);
    }

    #[test]
    fn test_empty_result() {
        let result = QueryResult::from_metadata(std::iter::empty());
        assert!(result.is_empty());
        assert!(result.to_json_rows().is_empty());
    }
}
