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

//! Converts boolean and run-end-encoded selection masks into take indices

use std::sync::Arc;

use arrow_array::builder::PrimitiveBuilder;
use arrow_array::cast::AsArray;
use arrow_array::types::*;
use arrow_array::*;
use arrow_buffer::bit_iterator::BitSliceIterator;
use arrow_buffer::{ArrowNativeType, BufferBuilder, ScalarBuffer};
use arrow_schema::DataType;

use crate::bit_block::{BinaryBitBlockScanner, BitBlockScanner};
use crate::error::SelectionError;
use crate::take::{take, TakeOptions};

/// How null mask entries contribute to the selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NullSelection {
    /// A null mask entry selects a null output row
    #[default]
    EmitNull,
    /// A null mask entry selects nothing
    Drop,
}

/// Options that define how a selection mask is interpreted
#[derive(Clone, Copy, Debug, Default)]
pub struct FilterOptions {
    /// Policy for null mask entries
    pub null_selection: NullSelection,
}

/// Process-wide default options, read-only after initialization
pub static DEFAULT_FILTER_OPTIONS: FilterOptions = FilterOptions {
    null_selection: NullSelection::EmitNull,
};

/// Converts a selection mask into an array of take indices
///
/// The mask is either a [`BooleanArray`] or a run-end-encoded boolean
/// array. For boolean masks the output uses the smallest unsigned index
/// type that can address every row: `u16` up to 65535 rows, `u32` beyond.
/// For run-end-encoded masks the output index type equals the run-end
/// type, reusing the width the encoder already picked for the same domain.
///
/// Under [`NullSelection::Drop`] the output contains one index per
/// selected row and no nulls. Under [`NullSelection::EmitNull`] each null
/// mask entry additionally emits a null index slot, so
/// `take(values, indices)` reproduces `filter(values, mask)` exactly.
///
/// # Errors
/// * [`SelectionError::NotImplemented`] for boolean masks longer than
///   `u32::MAX` rows, and for mask types other than the two above
pub fn take_indices(
    filter: &dyn Array,
    options: &FilterOptions,
) -> Result<ArrayRef, SelectionError> {
    match filter.data_type() {
        DataType::Boolean => mask_indices_sized(filter.as_boolean(), options.null_selection),
        DataType::RunEndEncoded(run_ends, _) => match run_ends.data_type() {
            DataType::Int16 => run_indices::<Int16Type>(filter, options.null_selection),
            DataType::Int32 => run_indices::<Int32Type>(filter, options.null_selection),
            DataType::Int64 => run_indices::<Int64Type>(filter, options.null_selection),
            t => Err(SelectionError::Invalid(format!(
                "Run ends must be Int16, Int32 or Int64, got {t}"
            ))),
        },
        t => Err(SelectionError::NotImplemented(format!(
            "Filter must be boolean or run-end encoded boolean, got {t}"
        ))),
    }
}

/// Selects rows of `values` according to a boolean or run-end-encoded mask
///
/// Implemented as a take over the indices of [`take_indices`]; the indices
/// are in bounds by construction, so the gather skips its bounds check.
pub fn filter(
    values: &dyn Array,
    predicate: &dyn Array,
    options: &FilterOptions,
) -> Result<ArrayRef, SelectionError> {
    if predicate.len() != values.len() {
        return Err(SelectionError::Invalid(format!(
            "Filter length {} differs from values length {}",
            predicate.len(),
            values.len()
        )));
    }
    let indices = take_indices(predicate, options)?;
    take(values, indices.as_ref(), Some(TakeOptions { boundscheck: false }))
}

/// Applies one selection mask to every column of a record batch
pub fn filter_record_batch(
    batch: &RecordBatch,
    predicate: &dyn Array,
    options: &FilterOptions,
) -> Result<RecordBatch, SelectionError> {
    if predicate.len() != batch.num_rows() {
        return Err(SelectionError::Invalid(format!(
            "Filter length {} differs from batch row count {}",
            predicate.len(),
            batch.num_rows()
        )));
    }
    let indices = take_indices(predicate, options)?;
    let columns = batch
        .columns()
        .iter()
        .map(|column| {
            take(
                column.as_ref(),
                indices.as_ref(),
                Some(TakeOptions { boundscheck: false }),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    let batch_options = RecordBatchOptions::new().with_row_count(Some(indices.len()));
    RecordBatch::try_new_with_options(batch.schema(), columns, &batch_options)
        .map_err(Into::into)
}

fn mask_indices_sized(
    filter: &BooleanArray,
    null_selection: NullSelection,
) -> Result<ArrayRef, SelectionError> {
    if filter.len() <= u16::MAX as usize {
        mask_indices::<UInt16Type>(filter, null_selection)
    } else if filter.len() <= u32::MAX as usize {
        mask_indices::<UInt32Type>(filter, null_selection)
    } else {
        // Selecting from beyond four billion rows wants a different
        // strategy than materialized indices.
        Err(SelectionError::NotImplemented(format!(
            "Filter length {} exceeds the u32 index range",
            filter.len()
        )))
    }
}

fn mask_indices<T>(
    filter: &BooleanArray,
    null_selection: NullSelection,
) -> Result<ArrayRef, SelectionError>
where
    T: ArrowPrimitiveType,
{
    let selected = filter.values();
    let len = selected.len();
    let nulls = filter.nulls().filter(|n| n.null_count() > 0);

    let nulls = match nulls {
        Some(nulls) => nulls,
        None => {
            // No nulls: every run of set bits becomes a run of consecutive
            // indices.
            let mut builder = BufferBuilder::<T::Native>::new(0);
            for (start, end) in BitSliceIterator::new(selected.values(), selected.offset(), len)
            {
                for position in start..end {
                    builder.append(T::Native::usize_as(position));
                }
            }
            return Ok(finish_indices::<T>(builder));
        }
    };

    match null_selection {
        NullSelection::EmitNull => {
            // Ternary per row: null emits a null slot, true emits an index,
            // false emits nothing. Blocks of `selected OR NOT valid` skip
            // regions that are entirely dropped; when such a block is full
            // and its validity block is also full, every row is selected.
            let mut builder = PrimitiveBuilder::<T>::new();
            let mut selected_or_null = BinaryBitBlockScanner::new(
                selected.values(),
                selected.offset(),
                nulls.validity(),
                nulls.offset(),
                len,
            );
            let mut valid = BitBlockScanner::new(nulls.validity(), nulls.offset(), len);
            let mut position = 0usize;
            while position < len {
                let block = selected_or_null.next_or_not();
                let valid_block = valid.next_block();
                let block_len = block.length as usize;
                if block.none_set() {
                    position += block_len;
                } else if block.all_set() && valid_block.all_set() {
                    for _ in 0..block_len {
                        builder.append_value(T::Native::usize_as(position));
                        position += 1;
                    }
                } else {
                    for _ in 0..block_len {
                        if nulls.is_valid(position) {
                            if selected.value(position) {
                                builder.append_value(T::Native::usize_as(position));
                            }
                        } else {
                            builder.append_null();
                        }
                        position += 1;
                    }
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        NullSelection::Drop => {
            let mut builder = BufferBuilder::<T::Native>::new(0);
            let mut selected_and_valid = BinaryBitBlockScanner::new(
                selected.values(),
                selected.offset(),
                nulls.validity(),
                nulls.offset(),
                len,
            );
            let mut position = 0usize;
            while position < len {
                let block = selected_and_valid.next_and();
                let block_len = block.length as usize;
                if block.all_set() {
                    for _ in 0..block_len {
                        builder.append(T::Native::usize_as(position));
                        position += 1;
                    }
                } else if !block.none_set() {
                    for _ in 0..block_len {
                        if nulls.is_valid(position) && selected.value(position) {
                            builder.append(T::Native::usize_as(position));
                        }
                        position += 1;
                    }
                } else {
                    position += block_len;
                }
            }
            Ok(finish_indices::<T>(builder))
        }
    }
}

fn finish_indices<T>(mut builder: BufferBuilder<T::Native>) -> ArrayRef
where
    T: ArrowPrimitiveType,
{
    let len = builder.len();
    let values = ScalarBuffer::new(builder.finish(), 0, len);
    Arc::new(PrimitiveArray::<T>::new(values, None))
}

/// Walks the logical runs of a run-end-encoded boolean mask
///
/// Runs coalesce equal values, so scanning the tiny physical values bitmap
/// block-at-a-time buys nothing; each run is emitted or skipped whole.
fn run_indices<R>(
    filter: &dyn Array,
    null_selection: NullSelection,
) -> Result<ArrayRef, SelectionError>
where
    R: RunEndIndexType,
{
    let filter = filter
        .as_any()
        .downcast_ref::<RunArray<R>>()
        .ok_or_else(|| SelectionError::Invalid("expected a run-end encoded array".to_string()))?;
    if filter.values().data_type() != &DataType::Boolean {
        return Err(SelectionError::NotImplemented(format!(
            "Filter must select with booleans, got run-end encoded {}",
            filter.values().data_type()
        )));
    }
    let values = filter.values().as_boolean();
    let run_ends = filter.run_ends();
    let offset = run_ends.offset();
    let len = run_ends.len();

    if len == 0 {
        let values = ScalarBuffer::from(Vec::<R::Native>::new());
        return Ok(Arc::new(PrimitiveArray::<R>::new(values, None)));
    }

    let first_run = run_ends.get_start_physical_index();
    let last_run = run_ends.get_end_physical_index();
    let ends = run_ends.values();

    if values.null_count() > 0 && null_selection == NullSelection::EmitNull {
        let mut builder = PrimitiveBuilder::<R>::new();
        let mut position = 0usize;
        for run in first_run..=last_run {
            let end = (ends[run].as_usize() - offset).min(len);
            let run_length = end - position;
            if values.is_null(run) {
                builder.append_nulls(run_length);
            } else if values.value(run) {
                for logical in position..end {
                    builder.append_value(R::Native::usize_as(logical));
                }
            }
            position = end;
        }
        return Ok(Arc::new(builder.finish()));
    }

    let mut builder = BufferBuilder::<R::Native>::new(0);
    let mut position = 0usize;
    for run in first_run..=last_run {
        let end = (ends[run].as_usize() - offset).min(len);
        if values.is_valid(run) && values.value(run) {
            for logical in position..end {
                builder.append(R::Native::usize_as(logical));
            }
        }
        position = end;
    }
    Ok(finish_indices::<R>(builder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::take::take;

    fn indices_as_u16(array: &ArrayRef) -> Vec<Option<u16>> {
        array.as_primitive::<UInt16Type>().iter().collect()
    }

    #[test]
    fn test_drop_vs_emit_null() {
        let mask = BooleanArray::from(vec![Some(true), None, Some(false), Some(true)]);

        let dropped = take_indices(
            &mask,
            &FilterOptions {
                null_selection: NullSelection::Drop,
            },
        )
        .unwrap();
        assert_eq!(indices_as_u16(&dropped), vec![Some(0), Some(3)]);
        assert_eq!(dropped.null_count(), 0);

        let emitted = take_indices(&mask, &DEFAULT_FILTER_OPTIONS).unwrap();
        assert_eq!(indices_as_u16(&emitted), vec![Some(0), None, Some(3)]);
        assert_eq!(emitted.null_count(), 1);
    }

    #[test]
    fn test_no_null_mask_emits_runs() {
        let mask = BooleanArray::from(vec![false, true, true, false, true]);
        let indices = take_indices(&mask, &DEFAULT_FILTER_OPTIONS).unwrap();
        assert_eq!(indices_as_u16(&indices), vec![Some(1), Some(2), Some(4)]);
    }

    #[test]
    fn test_empty_mask() {
        let mask = BooleanArray::from(Vec::<bool>::new());
        let indices = take_indices(&mask, &DEFAULT_FILTER_OPTIONS).unwrap();
        assert_eq!(indices.len(), 0);
        assert_eq!(indices.data_type(), &DataType::UInt16);
    }

    #[test]
    fn test_sliced_mask() {
        let mask = BooleanArray::from(vec![true, false, true, true, false]);
        let sliced = mask.slice(1, 4); // [false, true, true, false]
        let indices = take_indices(&sliced, &DEFAULT_FILTER_OPTIONS).unwrap();
        assert_eq!(indices_as_u16(&indices), vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_all_null_mask() {
        let mask = BooleanArray::from(vec![None, None, None]);
        let emitted = take_indices(&mask, &DEFAULT_FILTER_OPTIONS).unwrap();
        assert_eq!(emitted.len(), 3);
        assert_eq!(emitted.null_count(), 3);

        let dropped = take_indices(
            &mask,
            &FilterOptions {
                null_selection: NullSelection::Drop,
            },
        )
        .unwrap();
        assert_eq!(dropped.len(), 0);
    }

    #[test]
    fn test_index_type_widens_beyond_u16() {
        let len = (u16::MAX as usize) + 2;
        let mut mask_values = vec![false; len];
        mask_values[0] = true;
        *mask_values.last_mut().unwrap() = true;
        let mask = BooleanArray::from(mask_values);
        let indices = take_indices(&mask, &DEFAULT_FILTER_OPTIONS).unwrap();
        assert_eq!(indices.data_type(), &DataType::UInt32);
        let indices = indices.as_primitive::<UInt32Type>();
        assert_eq!(indices.values(), &[0, (len - 1) as u32]);
    }

    #[test]
    fn test_blocks_with_scattered_selection() {
        // several 64-bit blocks: one fully selected, one fully dropped,
        // one mixed with nulls
        let mut mask_values: Vec<Option<bool>> = Vec::new();
        mask_values.extend(std::iter::repeat(Some(true)).take(64));
        mask_values.extend(std::iter::repeat(Some(false)).take(64));
        mask_values.extend([Some(true), None, Some(false), Some(true)]);
        let mask = BooleanArray::from(mask_values);

        let emitted = take_indices(&mask, &DEFAULT_FILTER_OPTIONS).unwrap();
        let emitted = emitted.as_primitive::<UInt16Type>();
        assert_eq!(emitted.len(), 64 + 3);
        assert!(emitted.is_valid(63));
        assert_eq!(emitted.value(64), 128);
        assert!(emitted.is_null(65));
        assert_eq!(emitted.value(66), 131);

        let dropped = take_indices(
            &mask,
            &FilterOptions {
                null_selection: NullSelection::Drop,
            },
        )
        .unwrap();
        let dropped = dropped.as_primitive::<UInt16Type>();
        assert_eq!(dropped.len(), 64 + 2);
        assert_eq!(dropped.value(64), 128);
        assert_eq!(dropped.value(65), 131);
    }

    #[test]
    fn test_filter_round_trip() {
        let values = Int32Array::from(vec![Some(10), Some(20), None, Some(40)]);
        let mask = BooleanArray::from(vec![Some(true), None, Some(true), Some(false)]);

        let emitted = filter(&values, &mask, &DEFAULT_FILTER_OPTIONS).unwrap();
        let expected = Int32Array::from(vec![Some(10), None, None]);
        assert_eq!(emitted.as_primitive::<Int32Type>(), &expected);

        let dropped = filter(
            &values,
            &mask,
            &FilterOptions {
                null_selection: NullSelection::Drop,
            },
        )
        .unwrap();
        let expected = Int32Array::from(vec![Some(10), None]);
        assert_eq!(dropped.as_primitive::<Int32Type>(), &expected);
    }

    #[test]
    fn test_filter_equals_take_of_indices() {
        let values = Int32Array::from((0..300).map(Some).collect::<Vec<_>>());
        let mask_values: Vec<Option<bool>> = (0..300)
            .map(|i| match i % 7 {
                0 => None,
                1..=3 => Some(true),
                _ => Some(false),
            })
            .collect();
        let mask = BooleanArray::from(mask_values);
        let options = FilterOptions {
            null_selection: NullSelection::Drop,
        };
        let indices = take_indices(&mask, &options).unwrap();
        let via_take = take(&values, indices.as_ref(), None).unwrap();
        let direct = filter(&values, &mask, &options).unwrap();
        assert_eq!(&via_take, &direct);
    }

    #[test]
    fn test_filter_length_mismatch() {
        let values = Int32Array::from(vec![1, 2, 3]);
        let mask = BooleanArray::from(vec![true, false]);
        assert!(matches!(
            filter(&values, &mask, &DEFAULT_FILTER_OPTIONS),
            Err(SelectionError::Invalid(_))
        ));
    }

    #[test]
    fn test_non_boolean_filter() {
        let values = Int32Array::from(vec![1, 2, 3]);
        let mask = Int32Array::from(vec![1, 0, 1]);
        assert!(matches!(
            take_indices(&mask, &DEFAULT_FILTER_OPTIONS),
            Err(SelectionError::NotImplemented(_))
        ));
        assert!(matches!(
            filter(&values, &mask, &DEFAULT_FILTER_OPTIONS),
            Err(SelectionError::NotImplemented(_))
        ));
    }

    fn ree_mask(runs: &[(i32, Option<bool>)]) -> RunArray<Int32Type> {
        let run_ends = Int32Array::from(runs.iter().map(|(end, _)| *end).collect::<Vec<_>>());
        let values = BooleanArray::from(runs.iter().map(|(_, v)| *v).collect::<Vec<_>>());
        RunArray::try_new(&run_ends, &values).unwrap()
    }

    #[test]
    fn test_ree_mask_drop() {
        // rows: [T T T] [F F] [null null] [T]
        let mask = ree_mask(&[(3, Some(true)), (5, Some(false)), (7, None), (8, Some(true))]);
        let indices = take_indices(
            &mask,
            &FilterOptions {
                null_selection: NullSelection::Drop,
            },
        )
        .unwrap();
        assert_eq!(indices.data_type(), &DataType::Int32);
        let indices = indices.as_primitive::<Int32Type>();
        assert_eq!(indices.values(), &[0, 1, 2, 7]);
        assert_eq!(indices.null_count(), 0);
    }

    #[test]
    fn test_ree_mask_emit_null() {
        let mask = ree_mask(&[(3, Some(true)), (5, Some(false)), (7, None), (8, Some(true))]);
        let indices = take_indices(&mask, &DEFAULT_FILTER_OPTIONS).unwrap();
        let indices = indices.as_primitive::<Int32Type>();
        let collected: Vec<Option<i32>> = indices.iter().collect();
        assert_eq!(
            collected,
            vec![Some(0), Some(1), Some(2), None, None, Some(7)]
        );
    }

    #[test]
    fn test_ree_mask_i16_run_ends() {
        let run_ends = Int16Array::from(vec![2i16, 4]);
        let values = BooleanArray::from(vec![false, true]);
        let mask = RunArray::try_new(&run_ends, &values).unwrap();
        let indices = take_indices(&mask, &DEFAULT_FILTER_OPTIONS).unwrap();
        assert_eq!(indices.data_type(), &DataType::Int16);
        let indices = indices.as_primitive::<Int16Type>();
        assert_eq!(indices.values(), &[2, 3]);
    }

    #[test]
    fn test_ree_mask_sliced() {
        // logical rows [T T F F T T], sliced to the middle four
        let mask = ree_mask(&[(2, Some(true)), (4, Some(false)), (6, Some(true))]);
        let sliced = mask.slice(1, 4); // [T F F T]
        let indices = take_indices(&sliced, &DEFAULT_FILTER_OPTIONS).unwrap();
        let indices = indices.as_primitive::<Int32Type>();
        assert_eq!(indices.values(), &[0, 3]);
    }

    #[test]
    fn test_ree_filter_values() {
        let values = StringArray::from(vec!["a", "b", "c", "d"]);
        let mask = ree_mask(&[(2, Some(true)), (4, Some(false))]);
        let selected = filter(&values, &mask, &DEFAULT_FILTER_OPTIONS).unwrap();
        let selected = selected.as_string::<i32>();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected.value(0), "a");
        assert_eq!(selected.value(1), "b");
    }

    #[test]
    fn test_filter_record_batch() {
        use arrow_schema::{Field, Schema};
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(vec![1, 2, 3])),
                Arc::new(StringArray::from(vec![Some("a"), None, Some("c")])),
            ],
        )
        .unwrap();
        let mask = BooleanArray::from(vec![true, false, true]);
        let selected = filter_record_batch(&batch, &mask, &DEFAULT_FILTER_OPTIONS).unwrap();
        assert_eq!(selected.num_rows(), 2);
        assert_eq!(
            selected.column(0).as_primitive::<Int32Type>().values(),
            &[1, 3]
        );
        assert_eq!(selected.column(1).as_string::<i32>().value(1), "c");
    }
}
