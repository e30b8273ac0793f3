// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Fields};
use arrow_schema::extension::ExtensionType;
use arrow_schema::ArrowError;

use super::SparseIndexType;

/// Logical type of a sparse row array: a list of `{index, value}` structs.
#[derive(Debug)]
pub struct SparseRowType {
    pub offset_type: DataType,
    pub index_type: SparseIndexType,
    pub value_type: DataType,
}

impl SparseRowType {
    /// Get the number of columns described by the row type.
    pub fn dimension(&self) -> usize {
        self.index_type.dimension()
    }

    /// Arrow fields for the row entries of a matrix with `dim` columns.
    pub fn entry_fields(dim: usize) -> Fields {
        Fields::from(vec![
            Field::new("index", DataType::Int32, false)
                .with_extension_type(SparseIndexType::create(dim)),
            Field::new("value", DataType::Float32, false),
        ])
    }

    /// Arrow list field for rows made of the given entry fields.
    pub fn list_field(entries: Fields) -> Arc<Field> {
        Arc::new(Field::new("rows", DataType::Struct(entries), false))
    }
}

impl TryFrom<&DataType> for SparseRowType {
    type Error = ArrowError;

    fn try_from(value: &DataType) -> Result<Self, Self::Error> {
        let (offset_type, elt_t) = match value {
            DataType::List(f) => (DataType::Int32, f.data_type()),
            DataType::LargeList(f) => (DataType::Int64, f.data_type()),
            _ => {
                return Err(ArrowError::InvalidArgumentError(format!(
                    "unsupported data type {}",
                    value
                )))
            }
        };
        let fields = match elt_t {
            DataType::Struct(fs) => fs,
            t => {
                return Err(ArrowError::InvalidArgumentError(format!(
                    "unsupported element type {}",
                    t
                )))
            }
        };

        if fields.len() != 2 {
            return Err(ArrowError::InvalidArgumentError(format!(
                "entries must have 2 fields, found {}",
                fields.len()
            )));
        }

        let idx_f = &fields[0];
        if idx_f.name() != "index" {
            return Err(ArrowError::InvalidArgumentError(format!(
                "first field must be 'index', found {}",
                idx_f.name()
            )));
        }
        let index_type: SparseIndexType = idx_f.try_extension_type()?;

        let val_f = &fields[1];
        if val_f.name() != "value" {
            return Err(ArrowError::InvalidArgumentError(format!(
                "second field must be 'value', found {}",
                val_f.name()
            )));
        }

        Ok(SparseRowType {
            offset_type,
            index_type,
            value_type: val_f.data_type().clone(),
        })
    }
}

#[test]
fn test_row_type_roundtrip() {
    let field = SparseRowType::list_field(SparseRowType::entry_fields(17));
    let dt = DataType::LargeList(field);
    let srt = SparseRowType::try_from(&dt).unwrap();
    assert_eq!(srt.dimension(), 17);
    assert_eq!(srt.offset_type, DataType::Int64);
    assert_eq!(srt.value_type, DataType::Float32);
}

#[test]
fn test_row_type_rejects_plain_ints() {
    let dt = DataType::LargeList(Arc::new(Field::new("rows", DataType::Int32, false)));
    assert!(SparseRowType::try_from(&dt).is_err());
}
