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

//! Concatenates arrays of one type into a single array

use arrow_array::{make_array, Array, ArrayRef};
use arrow_data::transform::MutableArrayData;

use crate::error::SelectionError;

/// Concatenates `arrays` into one array holding their rows in order
pub fn concat(arrays: &[&dyn Array]) -> Result<ArrayRef, SelectionError> {
    if arrays.is_empty() {
        return Err(SelectionError::Invalid(
            "concat requires input of at least one array".to_string(),
        ));
    }
    let data_type = arrays[0].data_type();
    if arrays.iter().skip(1).any(|a| a.data_type() != data_type) {
        return Err(SelectionError::Invalid(format!(
            "It is not possible to concatenate arrays of different data types, expected {data_type}"
        )));
    }
    if arrays.len() == 1 {
        let array = arrays[0];
        return Ok(array.slice(0, array.len()));
    }

    let capacity = arrays.iter().map(|a| a.len()).sum();
    let data: Vec<_> = arrays.iter().map(|a| a.to_data()).collect();
    let data: Vec<&_> = data.iter().collect();
    let mut mutable = MutableArrayData::new(data, false, capacity);
    for (i, array) in arrays.iter().enumerate() {
        mutable.extend(i, 0, array.len());
    }
    Ok(make_array(mutable.freeze()))
}
