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

//! Selection kernels for columnar data: gather rows by index (`take`) and
//! select rows by mask (`filter`), over arrays, chunked arrays, record
//! batches and tables.
//!
//! The kernels are synchronous pure functions: inputs are borrowed
//! immutably, outputs are freshly allocated, and errors are returned by
//! value as [`error::SelectionError`].
//!
//! ```
//! use arrow_array::{BooleanArray, Int32Array, UInt32Array};
//! use arrow_array::cast::AsArray;
//! use arrow_array::types::Int32Type;
//! use columnar_select::filter::{filter, DEFAULT_FILTER_OPTIONS};
//! use columnar_select::take::take;
//!
//! let values = Int32Array::from(vec![10, 20, 30, 40]);
//!
//! let indices = UInt32Array::from(vec![3, 0, 0]);
//! let taken = take(&values, &indices, None).unwrap();
//! assert_eq!(taken.as_primitive::<Int32Type>().values(), &[40, 10, 10]);
//!
//! let mask = BooleanArray::from(vec![true, false, true, false]);
//! let selected = filter(&values, &mask, &DEFAULT_FILTER_OPTIONS).unwrap();
//! assert_eq!(selected.as_primitive::<Int32Type>().values(), &[10, 30]);
//! ```

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod bit_block;
pub mod chunked;
pub mod concat;
pub mod error;
pub mod filter;
pub mod selection;
pub mod table;
pub mod take;
