// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

use arrow::datatypes::DataType;
use arrow_schema::extension::ExtensionType;
use arrow_schema::ArrowError;
use serde::{Deserialize, Serialize};
use serde_json::{from_str, to_string};

/// Arrow extension type marking the column-index field of a sparse row.
///
/// The extension carries the number of columns, so a row array knows the
/// width of the matrix it belongs to even when trailing columns are empty.
#[derive(Debug, Clone)]
pub struct SparseIndexType {
    meta: SparseMeta,
}

/// Metadata for sparse matrix rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseMeta {
    /// The number of columns in the sparse row.
    pub dimension: usize,
}

impl SparseIndexType {
    /// Create a new sparse index extension for the given dimension.
    pub fn create(dim: usize) -> SparseIndexType {
        SparseIndexType {
            meta: SparseMeta { dimension: dim },
        }
    }

    /// Get the dimension of the sparse row indices.
    pub fn dimension(&self) -> usize {
        self.meta.dimension
    }
}

impl ExtensionType for SparseIndexType {
    type Metadata = SparseMeta;

    const NAME: &'static str = "trackrec.sparse_index";

    fn metadata(&self) -> &Self::Metadata {
        &self.meta
    }

    fn serialize_metadata(&self) -> Option<String> {
        to_string(&self.meta).ok()
    }

    fn deserialize_metadata(metadata: Option<&str>) -> Result<Self::Metadata, ArrowError> {
        let meta_str = metadata
            .ok_or_else(|| ArrowError::SchemaError("sparse index requires metadata".into()))?;
        from_str(meta_str).map_err(|e| ArrowError::JsonError(e.to_string()))
    }

    fn supports_data_type(&self, data_type: &DataType) -> Result<(), ArrowError> {
        match data_type {
            DataType::Int32 => Ok(()),
            t => Err(ArrowError::InvalidArgumentError(format!(
                "expected Int32 indices, got {}",
                t
            ))),
        }
    }

    fn try_new(data_type: &DataType, metadata: Self::Metadata) -> Result<Self, ArrowError> {
        let ext = Self { meta: metadata };
        ext.supports_data_type(data_type)?;
        Ok(ext)
    }
}

#[test]
fn test_metadata_json() {
    let ext = SparseIndexType::create(42);
    let meta = ext.serialize_metadata().unwrap();
    assert_eq!(meta, r#"{"dimension":42}"#);
    let back = SparseIndexType::deserialize_metadata(Some(&meta)).unwrap();
    assert_eq!(back.dimension, 42);
}

#[test]
fn test_missing_metadata() {
    assert!(SparseIndexType::deserialize_metadata(None).is_err());
}

#[test]
fn test_rejects_float_indices() {
    let ext = SparseIndexType::create(3);
    assert!(ext.supports_data_type(&DataType::Float32).is_err());
}
