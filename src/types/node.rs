//! Requested node types and the CSV list formats the command line accepts.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A geographic point a caller wants data for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Caller-chosen node identifier, echoed into output file names.
    pub id: i64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

/// A node with a generator of the given nameplate capacity attached.
///
/// Used by the actual-power and forecast-power requests, where site data is
/// scaled and aggregated to match the requested capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneratorNode {
    pub node: Node,
    /// Requested generator capacity in MW.
    pub capacity_mw: f64,
}

#[derive(Debug, Error)]
pub enum NodeListError {
    #[error("failed to read node list '{0}'")]
    Read(PathBuf, #[source] PolarsError),

    #[error("node list '{path}' is missing or cannot parse column(s) '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("node list '{path}' row {row} has an empty value in column '{column}'")]
    MissingValue {
        path: PathBuf,
        row: usize,
        column: String,
    },

    #[error("no generator capacity given for node {node_id}")]
    MissingCapacity { node_id: i64 },

    #[error("generator capacity for node {node_id} must be positive, got {capacity_mw}")]
    NonPositiveCapacity { node_id: i64, capacity_mw: f64 },
}

fn read_columns(
    path: &Path,
    columns: &[&str],
) -> Result<DataFrame, NodeListError> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| NodeListError::Read(path.to_path_buf(), e))?
        .finish()
        .map_err(|e| NodeListError::Read(path.to_path_buf(), e))?;

    // Cast up front so integer-looking latitude columns still extract as f64.
    let exprs: Vec<Expr> = columns
        .iter()
        .map(|name| {
            if *name == "node_id" {
                col(*name).cast(DataType::Int64)
            } else {
                col(*name).cast(DataType::Float64)
            }
        })
        .collect();

    df.lazy()
        .select(exprs)
        .collect()
        .map_err(|_| NodeListError::MissingColumn {
            path: path.to_path_buf(),
            column: columns.join(", "),
        })
}

impl Node {
    /// Reads a node list CSV with header `node_id,latitude,longitude`.
    pub fn list_from_csv(path: &Path) -> Result<Vec<Node>, NodeListError> {
        let df = read_columns(path, &["node_id", "latitude", "longitude"])?;

        let ids = df
            .column("node_id")
            .and_then(|c| c.i64())
            .map_err(|e| NodeListError::Read(path.to_path_buf(), e))?;
        let lats = df
            .column("latitude")
            .and_then(|c| c.f64())
            .map_err(|e| NodeListError::Read(path.to_path_buf(), e))?;
        let lons = df
            .column("longitude")
            .and_then(|c| c.f64())
            .map_err(|e| NodeListError::Read(path.to_path_buf(), e))?;

        let mut nodes = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let value = |column: &str, v: Option<f64>| {
                v.ok_or_else(|| NodeListError::MissingValue {
                    path: path.to_path_buf(),
                    row,
                    column: column.to_string(),
                })
            };
            nodes.push(Node {
                id: ids.get(row).ok_or_else(|| NodeListError::MissingValue {
                    path: path.to_path_buf(),
                    row,
                    column: "node_id".to_string(),
                })?,
                latitude: value("latitude", lats.get(row))?,
                longitude: value("longitude", lons.get(row))?,
            });
        }
        Ok(nodes)
    }
}

impl GeneratorNode {
    /// Attaches the same capacity to every node.
    pub fn with_uniform_capacity(
        nodes: &[Node],
        capacity_mw: f64,
    ) -> Result<Vec<GeneratorNode>, NodeListError> {
        nodes
            .iter()
            .map(|node| {
                if capacity_mw <= 0.0 {
                    return Err(NodeListError::NonPositiveCapacity {
                        node_id: node.id,
                        capacity_mw,
                    });
                }
                Ok(GeneratorNode {
                    node: *node,
                    capacity_mw,
                })
            })
            .collect()
    }

    /// Joins nodes against a generator list CSV with header
    /// `node_id,capacity_mw`. Every node must have a matching row.
    pub fn from_capacity_csv(
        nodes: &[Node],
        path: &Path,
    ) -> Result<Vec<GeneratorNode>, NodeListError> {
        let df = read_columns(path, &["node_id", "capacity_mw"])?;

        let ids = df
            .column("node_id")
            .and_then(|c| c.i64())
            .map_err(|e| NodeListError::Read(path.to_path_buf(), e))?;
        let caps = df
            .column("capacity_mw")
            .and_then(|c| c.f64())
            .map_err(|e| NodeListError::Read(path.to_path_buf(), e))?;

        nodes
            .iter()
            .map(|node| {
                let capacity_mw = (0..df.height())
                    .find(|row| ids.get(*row) == Some(node.id))
                    .and_then(|row| caps.get(row))
                    .ok_or(NodeListError::MissingCapacity { node_id: node.id })?;
                if capacity_mw <= 0.0 {
                    return Err(NodeListError::NonPositiveCapacity {
                        node_id: node.id,
                        capacity_mw,
                    });
                }
                Ok(GeneratorNode {
                    node: *node,
                    capacity_mw,
                })
            })
            .collect()
    }
}
