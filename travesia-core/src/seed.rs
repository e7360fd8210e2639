//! Loading of the JSON and CSV seed files kept in the data directory.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::graph::{NodeSpec, RelationSpec};
use crate::reservation::Attributes;
use crate::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Invalid entry {index} in {path}: {source}")]
    Record {
        path: PathBuf,
        index: usize,
        #[source]
        source: StoreError,
    },
}

/// Reads `data_dir/file_name` and deserializes it.
pub fn load_json<T: DeserializeOwned>(data_dir: &Path, file_name: &str) -> Result<T, SeedError> {
    let path = data_dir.join(file_name);
    let raw = fs::read_to_string(&path).map_err(|source| SeedError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SeedError::Json { path, source })
}

/// Reads an array of node objects. The first key of each object is its identity property.
pub fn load_nodes(data_dir: &Path, file_name: &str) -> Result<Vec<NodeSpec>, SeedError> {
    let path = data_dir.join(file_name);
    let objects: Vec<serde_json::Map<String, Value>> = load_json(data_dir, file_name)?;

    objects
        .iter()
        .enumerate()
        .map(|(index, object)| {
            NodeSpec::from_json(object).map_err(|source| SeedError::Record {
                path: path.clone(),
                index,
                source,
            })
        })
        .collect()
}

pub fn load_relations(data_dir: &Path, file_name: &str) -> Result<Vec<RelationSpec>, SeedError> {
    load_json(data_dir, file_name)
}

/// Reads a headed CSV file; each row becomes an object keyed by column name,
/// in column order, with every value kept as a string.
pub fn load_csv(data_dir: &Path, file_name: &str) -> Result<Vec<Attributes>, SeedError> {
    let path = data_dir.join(file_name);
    let csv_err = |source: csv::Error| SeedError::Csv {
        path: path.clone(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(&path).map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let row: Attributes = headers
            .iter()
            .zip(record.iter())
            .map(|(column, value)| (column.to_string(), Value::String(value.to_string())))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeLabel, PropertyValue, RelationshipType};
    use tempfile::TempDir;

    fn scratch_dir() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_load_nodes() {
        let tmp = scratch_dir();
        let dir = tmp.path();
        fs::write(
            dir.join("usuarios.json"),
            r#"[{"usuario_id": 1, "nombre": "Ana"}, {"usuario_id": 2, "nombre": "Luis", "ciudad": "Rosario"}]"#,
        )
        .unwrap();

        let nodes = load_nodes(dir, "usuarios.json").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].key.as_str(), "usuario_id");
        assert_eq!(nodes[1].value, PropertyValue::Integer(2));
        assert_eq!(nodes[1].properties.len(), 2);
    }

    #[test]
    fn test_load_relations() {
        let tmp = scratch_dir();
        let dir = tmp.path();
        fs::write(
            dir.join("visitas.json"),
            r#"[{"label_origen": "Usuario", "prop_origen": "usuario_id", "valor_origen": 1,
                 "label_destino": "Destino", "prop_destino": "destino_id", "valor_destino": 10,
                 "tipo": "VISITO"}]"#,
        )
        .unwrap();

        let relations = load_relations(dir, "visitas.json").unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].to_label, NodeLabel::Destination);
        assert_eq!(relations[0].kind, RelationshipType::Visited);
    }

    #[test]
    fn test_bad_entry_reports_its_index() {
        let tmp = scratch_dir();
        let dir = tmp.path();
        fs::write(dir.join("destinos.json"), r#"[{"destino_id": 1}, {}]"#).unwrap();

        match load_nodes(dir, "destinos.json") {
            Err(SeedError::Record { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let tmp = scratch_dir();
        let dir = tmp.path();
        let result: Result<Value, _> = load_json(dir, "nope.json");
        assert!(matches!(result, Err(SeedError::Io { .. })));
    }

    #[test]
    fn test_load_csv_keys_rows_by_header() {
        let tmp = scratch_dir();
        let dir = tmp.path();
        fs::write(
            dir.join("hoteles.csv"),
            "hotel_id,nombre,ciudad\n1,Hotel Sol,Cusco\n2,\"Posada, del Rio\",Salta\n",
        )
        .unwrap();

        let rows = load_csv(dir, "hoteles.csv").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["hotel_id", "nombre", "ciudad"]);
        assert_eq!(rows[0]["hotel_id"], Value::String("1".into()));
        assert_eq!(rows[1]["nombre"], Value::String("Posada, del Rio".into()));
    }

    #[test]
    fn test_load_csv_rejects_ragged_rows() {
        let tmp = scratch_dir();
        let dir = tmp.path();
        fs::write(dir.join("actividades.csv"), "actividad_id,nombre\n1\n").unwrap();

        assert!(matches!(load_csv(dir, "actividades.csv"), Err(SeedError::Csv { .. })));
        assert!(matches!(load_csv(dir, "nope.csv"), Err(SeedError::Csv { .. })));
    }
}
