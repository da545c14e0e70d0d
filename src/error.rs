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

//! Error types for the selection kernels

use std::error::Error;
use std::fmt::{Display, Formatter};

use arrow_schema::ArrowError;

/// Errors returned by the selection kernels
///
/// Errors are always returned by value; on error no partial output is
/// handed back to the caller.
#[derive(Debug)]
pub enum SelectionError {
    /// The allocator failed to provide memory for an output buffer
    OutOfMemory(String),
    /// An index failed the bounds check, or a chunk resolution overflowed
    Index(String),
    /// Inputs are structurally inconsistent, e.g. a filter whose length
    /// differs from the values length
    Invalid(String),
    /// The requested combination of inputs is not supported
    NotImplemented(String),
}

impl Display for SelectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionError::OutOfMemory(msg) => write!(f, "Out of memory: {msg}"),
            SelectionError::Index(msg) => write!(f, "Index error: {msg}"),
            SelectionError::Invalid(msg) => write!(f, "Invalid: {msg}"),
            SelectionError::NotImplemented(msg) => write!(f, "Not implemented: {msg}"),
        }
    }
}

impl Error for SelectionError {}

impl From<ArrowError> for SelectionError {
    fn from(error: ArrowError) -> Self {
        match error {
            ArrowError::MemoryError(msg) => SelectionError::OutOfMemory(msg),
            ArrowError::NotYetImplemented(msg) => SelectionError::NotImplemented(msg),
            other => SelectionError::Invalid(other.to_string()),
        }
    }
}
