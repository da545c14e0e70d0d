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

//! A table of chunked columns under one schema

use arrow_schema::SchemaRef;

use crate::chunked::ChunkedArray;
use crate::error::SelectionError;

/// Ordered chunked columns of equal logical length
///
/// Unlike a record batch, each column carries its own chunk boundaries;
/// only the logical lengths must line up.
#[derive(Clone, Debug)]
pub struct Table {
    schema: SchemaRef,
    columns: Vec<ChunkedArray>,
    row_count: usize,
}

impl Table {
    /// Creates a table from a schema and matching chunked columns
    pub fn try_new(schema: SchemaRef, columns: Vec<ChunkedArray>) -> Result<Self, SelectionError> {
        if schema.fields().len() != columns.len() {
            return Err(SelectionError::Invalid(format!(
                "Table schema has {} fields but {} columns were provided",
                schema.fields().len(),
                columns.len()
            )));
        }
        for (field, column) in schema.fields().iter().zip(&columns) {
            if field.data_type() != column.data_type() {
                return Err(SelectionError::Invalid(format!(
                    "Column for field {} has type {}, expected {}",
                    field.name(),
                    column.data_type(),
                    field.data_type()
                )));
            }
        }
        let row_count = columns.first().map(|column| column.len()).unwrap_or(0);
        if columns.iter().any(|column| column.len() != row_count) {
            return Err(SelectionError::Invalid(
                "Table columns must have equal logical lengths".to_string(),
            ));
        }
        Ok(Self {
            schema,
            columns,
            row_count,
        })
    }

    /// Returns the table schema
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Returns the number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns the logical number of rows
    pub fn num_rows(&self) -> usize {
        self.row_count
    }

    /// Returns the column at `index`
    pub fn column(&self, index: usize) -> &ChunkedArray {
        &self.columns[index]
    }

    /// Returns all columns
    pub fn columns(&self) -> &[ChunkedArray] {
        &self.columns
    }
}
