// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Dispatches take across the value and index container kinds

use arrow_array::{new_empty_array, Array, ArrayRef, RecordBatch, RecordBatchOptions};

use crate::chunked::{take_chunked, ChunkedArray};
use crate::concat::concat;
use crate::error::SelectionError;
use crate::table::Table;
use crate::take::TakeOptions;

/// A columnar value of any supported container kind
#[derive(Clone, Debug)]
pub enum ColumnarValue {
    /// A single array
    Array(ArrayRef),
    /// A chunked array
    Chunked(ChunkedArray),
    /// A record batch of equal-length array columns
    RecordBatch(RecordBatch),
    /// A table of equal-length chunked columns
    Table(Table),
}

impl ColumnarValue {
    /// Returns the logical number of rows
    pub fn len(&self) -> usize {
        match self {
            ColumnarValue::Array(array) => array.len(),
            ColumnarValue::Chunked(chunked) => chunked.len(),
            ColumnarValue::RecordBatch(batch) => batch.num_rows(),
            ColumnarValue::Table(table) => table.num_rows(),
        }
    }

    /// Returns true if there are no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<ArrayRef> for ColumnarValue {
    fn from(array: ArrayRef) -> Self {
        ColumnarValue::Array(array)
    }
}

impl From<ChunkedArray> for ColumnarValue {
    fn from(chunked: ChunkedArray) -> Self {
        ColumnarValue::Chunked(chunked)
    }
}

impl From<RecordBatch> for ColumnarValue {
    fn from(batch: RecordBatch) -> Self {
        ColumnarValue::RecordBatch(batch)
    }
}

impl From<Table> for ColumnarValue {
    fn from(table: Table) -> Self {
        ColumnarValue::Table(table)
    }
}

/// Take rows by index across any supported container combination
///
/// | values \ indices | array | chunked array |
/// |---|---|---|
/// | array | array take | one output chunk per index chunk |
/// | chunked array | chunked take | chunked take per index chunk, one chunk each |
/// | record batch | per-column array take | unsupported |
/// | table | per-column chunked take | per-column, per-index-chunk |
///
/// Combinations outside the table return
/// [`SelectionError::NotImplemented`].
pub fn take(
    values: &ColumnarValue,
    indices: &ColumnarValue,
    options: Option<TakeOptions>,
) -> Result<ColumnarValue, SelectionError> {
    match (values, indices) {
        (ColumnarValue::Array(values), ColumnarValue::Array(indices)) => {
            let taken = crate::take::take(values.as_ref(), indices.as_ref(), options)?;
            Ok(ColumnarValue::Array(taken))
        }
        (ColumnarValue::Array(values), ColumnarValue::Chunked(indices)) => {
            let chunks = indices
                .chunks()
                .iter()
                .map(|chunk| crate::take::take(values.as_ref(), chunk.as_ref(), options))
                .collect::<Result<Vec<_>, _>>()?;
            let taken = ChunkedArray::try_new(chunks, values.data_type().clone())?;
            Ok(ColumnarValue::Chunked(taken))
        }
        (ColumnarValue::Chunked(values), ColumnarValue::Array(indices)) => {
            let taken = take_chunked(values, indices.as_ref(), options)?;
            Ok(ColumnarValue::Chunked(taken))
        }
        (ColumnarValue::Chunked(values), ColumnarValue::Chunked(indices)) => {
            let taken = take_chunked_chunked(values, indices, options)?;
            Ok(ColumnarValue::Chunked(taken))
        }
        (ColumnarValue::RecordBatch(batch), ColumnarValue::Array(indices)) => {
            let columns = batch
                .columns()
                .iter()
                .map(|column| crate::take::take(column.as_ref(), indices.as_ref(), options))
                .collect::<Result<Vec<_>, _>>()?;
            let batch_options = RecordBatchOptions::new().with_row_count(Some(indices.len()));
            let taken =
                RecordBatch::try_new_with_options(batch.schema(), columns, &batch_options)?;
            Ok(ColumnarValue::RecordBatch(taken))
        }
        (ColumnarValue::Table(table), ColumnarValue::Array(indices)) => {
            let columns = table
                .columns()
                .iter()
                .map(|column| take_chunked(column, indices.as_ref(), options))
                .collect::<Result<Vec<_>, _>>()?;
            let taken = Table::try_new(table.schema().clone(), columns)?;
            Ok(ColumnarValue::Table(taken))
        }
        (ColumnarValue::Table(table), ColumnarValue::Chunked(indices)) => {
            let columns = table
                .columns()
                .iter()
                .map(|column| take_chunked_chunked(column, indices, options))
                .collect::<Result<Vec<_>, _>>()?;
            let taken = Table::try_new(table.schema().clone(), columns)?;
            Ok(ColumnarValue::Table(taken))
        }
        _ => Err(SelectionError::NotImplemented(
            "Unsupported combination of values and indices containers for take".to_string(),
        )),
    }
}

/// Chunked take per index chunk, each result collapsed to a single chunk
fn take_chunked_chunked(
    values: &ChunkedArray,
    indices: &ChunkedArray,
    options: Option<TakeOptions>,
) -> Result<ChunkedArray, SelectionError> {
    let mut chunks = Vec::with_capacity(indices.num_chunks());
    for index_chunk in indices.chunks() {
        let taken = take_chunked(values, index_chunk.as_ref(), options)?;
        let chunk = match taken.chunks() {
            [] => new_empty_array(values.data_type()),
            [single] => single.clone(),
            many => concat(&many.iter().map(|c| c.as_ref()).collect::<Vec<_>>())?,
        };
        chunks.push(chunk);
    }
    ChunkedArray::try_new(chunks, values.data_type().clone())
}
