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

//! A chunked array container and its take kernel

use arrow_array::cast::AsArray;
use arrow_array::types::*;
use arrow_array::*;
use arrow_buffer::ArrowNativeType;
use arrow_data::transform::MutableArrayData;
use arrow_data::ArrayData;
use arrow_schema::DataType;

use crate::error::SelectionError;
use crate::take::{check_bounds, take, TakeOptions, ToIndices};

/// An ordered sequence of same-type arrays forming one logical sequence
///
/// Chunk boundaries are invisible to readers addressing logical rows; the
/// chunks share nothing but their type.
#[derive(Clone, Debug)]
pub struct ChunkedArray {
    chunks: Vec<ArrayRef>,
    data_type: DataType,
    length: usize,
}

impl ChunkedArray {
    /// Creates a chunked array from `chunks`, all of type `data_type`
    pub fn try_new(chunks: Vec<ArrayRef>, data_type: DataType) -> Result<Self, SelectionError> {
        for chunk in &chunks {
            if chunk.data_type() != &data_type {
                return Err(SelectionError::Invalid(format!(
                    "Chunk of type {} in chunked array of type {data_type}",
                    chunk.data_type()
                )));
            }
        }
        let length = chunks.iter().map(|chunk| chunk.len()).sum();
        Ok(Self {
            chunks,
            data_type,
            length,
        })
    }

    /// Creates a chunked array of `data_type` with no chunks and no rows
    pub fn new_empty(data_type: DataType) -> Self {
        Self {
            chunks: Vec::new(),
            data_type,
            length: 0,
        }
    }

    /// Returns the logical number of rows across all chunks
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns true if the chunked array has no rows
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the type shared by every chunk
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Returns the number of chunks
    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Returns the chunk at `index`
    pub fn chunk(&self, index: usize) -> &ArrayRef {
        &self.chunks[index]
    }

    /// Returns all chunks
    pub fn chunks(&self) -> &[ArrayRef] {
        &self.chunks
    }

    /// Returns the total number of null rows across all chunks
    pub fn null_count(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.null_count()).sum()
    }
}

/// A logical row position resolved into a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLocation {
    /// Index of the chunk holding the row. Equals the chunk count when the
    /// logical index was beyond the end.
    pub chunk_index: usize,
    /// Row position within that chunk
    pub index_in_chunk: usize,
}

/// Maps logical row indices of a chunked array to chunk-local positions
///
/// Built once per selection from the cumulative chunk lengths and queried
/// by binary search; out-of-range indices resolve to a chunk index one
/// past the last chunk rather than an error, leaving the policy to the
/// caller.
#[derive(Debug)]
pub struct ChunkResolver {
    /// Cumulative row counts, one entry per chunk boundary
    offsets: Vec<usize>,
}

impl ChunkResolver {
    /// Creates a resolver for `chunks`
    pub fn new(chunks: &[ArrayRef]) -> Self {
        let mut offsets = Vec::with_capacity(chunks.len() + 1);
        let mut total = 0usize;
        offsets.push(0);
        for chunk in chunks {
            total += chunk.len();
            offsets.push(total);
        }
        Self { offsets }
    }

    /// Resolves a logical row index into a chunk and a position within it
    pub fn resolve(&self, index: usize) -> ChunkLocation {
        // first boundary past `index`; empty chunks are skipped because
        // their boundary equals the next one
        let chunk_index = self.offsets.partition_point(|offset| *offset <= index) - 1;
        ChunkLocation {
            chunk_index,
            index_in_chunk: index - self.offsets[chunk_index],
        }
    }
}

/// Take rows by logical index from a [`ChunkedArray`]
///
/// Indices are grouped per chunk in request order, each touched chunk is
/// gathered once, and the per-chunk results are stitched back together in
/// request order by appending contiguous runs. The output is a single
/// chunk.
pub fn take_chunked(
    values: &ChunkedArray,
    indices: &dyn Array,
    options: Option<TakeOptions>,
) -> Result<ChunkedArray, SelectionError> {
    let options = options.unwrap_or_default();
    macro_rules! helper {
        ($t:ty, $values:expr, $indices:expr, $options:expr) => {{
            let indices = $indices.as_primitive::<$t>();
            if $options.boundscheck {
                check_bounds($values.len(), indices)?;
            }
            take_chunked_impl($values, &indices.to_indices())
        }};
    }
    downcast_integer! {
        indices.data_type() => (helper, values, indices, options),
        d => Err(SelectionError::NotImplemented(format!(
            "Take only supported for integer indices, got {d}"
        )))
    }
}

fn take_chunked_impl<I>(
    values: &ChunkedArray,
    indices: &PrimitiveArray<I>,
) -> Result<ChunkedArray, SelectionError>
where
    I: ArrowPrimitiveType,
{
    let num_chunks = values.num_chunks();

    if indices.is_empty() {
        return Ok(ChunkedArray::new_empty(values.data_type().clone()));
    }

    if num_chunks <= 1 {
        let chunk: ArrayRef = match values.chunks().first() {
            Some(chunk) => chunk.clone(),
            None => new_empty_array(values.data_type()),
        };
        let taken = take(
            chunk.as_ref(),
            indices,
            Some(TakeOptions { boundscheck: false }),
        )?;
        return ChunkedArray::try_new(vec![taken], values.data_type().clone());
    }

    // The indices are not necessarily sorted, so each one is resolved to
    // the chunk it addresses; the sentinel value `num_chunks` marks a null
    // index.
    let resolver = ChunkResolver::new(values.chunks());
    let mut assignments = Vec::with_capacity(indices.len());
    let mut per_chunk: Vec<Vec<u64>> = vec![Vec::new(); num_chunks];
    for i in 0..indices.len() {
        if indices.is_valid(i) {
            let index = indices.values()[i].as_usize();
            let location = resolver.resolve(index);
            if location.chunk_index >= num_chunks {
                return Err(SelectionError::Index(format!(
                    "Index {index} out of bounds for chunked array of {} rows",
                    values.len()
                )));
            }
            per_chunk[location.chunk_index].push(location.index_in_chunk as u64);
            assignments.push(location.chunk_index);
        } else {
            assignments.push(num_chunks);
        }
    }

    // Gather each touched chunk once; a single batched take per chunk is
    // far cheaper than one dispatch per row.
    let mut slot_of_chunk = vec![usize::MAX; num_chunks];
    let mut lookups: Vec<ArrayData> = Vec::new();
    for (chunk_index, rows) in per_chunk.iter_mut().enumerate() {
        if rows.is_empty() {
            continue;
        }
        let rows = UInt64Array::from(std::mem::take(rows));
        let taken = take(
            values.chunk(chunk_index).as_ref(),
            &rows,
            Some(TakeOptions { boundscheck: false }),
        )?;
        slot_of_chunk[chunk_index] = lookups.len();
        lookups.push(taken.into_data());
    }

    if lookups.is_empty() {
        // every index was null
        let nulls = new_null_array(values.data_type(), indices.len());
        return ChunkedArray::try_new(vec![nulls], values.data_type().clone());
    }

    // Reassemble in request order: contiguous runs of one chunk become a
    // single slice append, with a read cursor advancing per chunk.
    let mut runs: Vec<(usize, usize)> = Vec::new();
    for &assignment in &assignments {
        match runs.last_mut() {
            Some((chunk, length)) if *chunk == assignment => *length += 1,
            _ => runs.push((assignment, 1)),
        }
    }

    let has_null_indices = indices.null_count() > 0;
    let lookup_refs: Vec<&ArrayData> = lookups.iter().collect();
    let mut mutable = MutableArrayData::new(lookup_refs, has_null_indices, indices.len());
    let mut cursors = vec![0usize; num_chunks];
    for (chunk, length) in runs {
        if chunk == num_chunks {
            mutable.extend_nulls(length);
        } else {
            let start = cursors[chunk];
            mutable.extend(slot_of_chunk[chunk], start, start + length);
            cursors[chunk] = start + length;
        }
    }

    let out = make_array(mutable.freeze());
    ChunkedArray::try_new(vec![out], values.data_type().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn chunked_i32(chunks: Vec<Vec<Option<i32>>>) -> ChunkedArray {
        let chunks = chunks
            .into_iter()
            .map(|chunk| Arc::new(Int32Array::from(chunk)) as ArrayRef)
            .collect();
        ChunkedArray::try_new(chunks, DataType::Int32).unwrap()
    }

    #[test]
    fn test_resolver() {
        let values = chunked_i32(vec![
            vec![Some(1), Some(2), Some(3)],
            vec![Some(4), Some(5)],
            vec![Some(6)],
        ]);
        let resolver = ChunkResolver::new(values.chunks());
        assert_eq!(
            resolver.resolve(0),
            ChunkLocation {
                chunk_index: 0,
                index_in_chunk: 0
            }
        );
        assert_eq!(
            resolver.resolve(4),
            ChunkLocation {
                chunk_index: 1,
                index_in_chunk: 1
            }
        );
        assert_eq!(
            resolver.resolve(5),
            ChunkLocation {
                chunk_index: 2,
                index_in_chunk: 0
            }
        );
        // one past the end resolves past the last chunk
        assert_eq!(resolver.resolve(6).chunk_index, 3);
    }

    #[test]
    fn test_resolver_skips_empty_chunks() {
        let values = chunked_i32(vec![vec![], vec![Some(1)], vec![], vec![Some(2)]]);
        let resolver = ChunkResolver::new(values.chunks());
        assert_eq!(resolver.resolve(0).chunk_index, 1);
        assert_eq!(resolver.resolve(1).chunk_index, 3);
    }

    #[test]
    fn test_take_across_chunks() {
        let values = chunked_i32(vec![
            vec![Some(1), Some(2), Some(3)],
            vec![Some(4), Some(5)],
            vec![Some(6)],
        ]);
        let indices = UInt32Array::from(vec![5, 0, 3, 2]);
        let taken = take_chunked(&values, &indices, None).unwrap();
        assert_eq!(taken.num_chunks(), 1);
        let chunk = taken.chunk(0).as_primitive::<Int32Type>();
        assert_eq!(chunk.values(), &[6, 1, 4, 3]);
    }

    #[test]
    fn test_take_contiguous_runs() {
        // runs from a single chunk collapse into slice appends
        let values = chunked_i32(vec![
            vec![Some(0), Some(1), Some(2)],
            vec![Some(3), Some(4), Some(5)],
        ]);
        let indices = UInt32Array::from(vec![3, 4, 5, 0, 1, 2]);
        let taken = take_chunked(&values, &indices, None).unwrap();
        let chunk = taken.chunk(0).as_primitive::<Int32Type>();
        assert_eq!(chunk.values(), &[3, 4, 5, 0, 1, 2]);
    }

    #[test]
    fn test_take_null_indices() {
        let values = chunked_i32(vec![vec![Some(1), None], vec![Some(3)]]);
        let indices = UInt32Array::from(vec![Some(2), None, Some(1), Some(0)]);
        let taken = take_chunked(&values, &indices, None).unwrap();
        let chunk = taken.chunk(0).as_primitive::<Int32Type>();
        let expected = Int32Array::from(vec![Some(3), None, None, Some(1)]);
        assert_eq!(chunk, &expected);
    }

    #[test]
    fn test_take_all_null_indices() {
        let values = chunked_i32(vec![vec![Some(1)], vec![Some(2)]]);
        let indices = UInt32Array::from(vec![None, None]);
        let taken = take_chunked(&values, &indices, None).unwrap();
        assert_eq!(taken.len(), 2);
        assert_eq!(taken.null_count(), 2);
    }

    #[test]
    fn test_take_empty_indices() {
        let values = chunked_i32(vec![vec![Some(1)], vec![Some(2)]]);
        let indices = UInt32Array::from(Vec::<u32>::new());
        let taken = take_chunked(&values, &indices, None).unwrap();
        assert_eq!(taken.num_chunks(), 0);
        assert_eq!(taken.len(), 0);
        assert_eq!(taken.data_type(), &DataType::Int32);
    }

    #[test]
    fn test_take_single_chunk() {
        let values = chunked_i32(vec![vec![Some(1), Some(2), Some(3)]]);
        let indices = UInt32Array::from(vec![2, 0]);
        let taken = take_chunked(&values, &indices, None).unwrap();
        assert_eq!(taken.num_chunks(), 1);
        let chunk = taken.chunk(0).as_primitive::<Int32Type>();
        assert_eq!(chunk.values(), &[3, 1]);
    }

    #[test]
    fn test_take_no_chunks() {
        let values = ChunkedArray::new_empty(DataType::Int32);
        let indices = UInt32Array::from(Vec::<u32>::new());
        let taken = take_chunked(&values, &indices, None).unwrap();
        assert_eq!(taken.len(), 0);

        let indices = UInt32Array::from(vec![0]);
        assert!(matches!(
            take_chunked(&values, &indices, None),
            Err(SelectionError::Index(_))
        ));
    }

    #[test]
    fn test_take_out_of_bounds() {
        let values = chunked_i32(vec![vec![Some(1), Some(2)], vec![Some(3)]]);
        let indices = UInt32Array::from(vec![3]);
        assert!(matches!(
            take_chunked(&values, &indices, None),
            Err(SelectionError::Index(_))
        ));
    }

    #[test]
    fn test_take_out_of_bounds_without_boundscheck() {
        // the resolver overflow check still fires: grouping needs a chunk
        let values = chunked_i32(vec![vec![Some(1), Some(2)], vec![Some(3)]]);
        let indices = UInt32Array::from(vec![9]);
        let options = Some(TakeOptions { boundscheck: false });
        assert!(matches!(
            take_chunked(&values, &indices, options),
            Err(SelectionError::Index(_))
        ));
    }

    #[test]
    fn test_take_string_chunks() {
        let chunks: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec!["a", "b"])),
            Arc::new(StringArray::from(vec![Some("c"), None])),
        ];
        let values = ChunkedArray::try_new(chunks, DataType::Utf8).unwrap();
        let indices = UInt32Array::from(vec![3, 2, 0]);
        let taken = take_chunked(&values, &indices, None).unwrap();
        let chunk = taken.chunk(0).as_string::<i32>();
        assert!(chunk.is_null(0));
        assert_eq!(chunk.value(1), "c");
        assert_eq!(chunk.value(2), "a");
    }

    #[test]
    fn test_chunked_type_mismatch() {
        let chunks: Vec<ArrayRef> = vec![
            Arc::new(Int32Array::from(vec![1])),
            Arc::new(StringArray::from(vec!["x"])),
        ];
        assert!(matches!(
            ChunkedArray::try_new(chunks, DataType::Int32),
            Err(SelectionError::Invalid(_))
        ));
    }
}
