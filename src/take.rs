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

//! Defines the take kernel for [Array]

use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::types::*;
use arrow_array::*;
use arrow_buffer::{
    bit_util, ArrowNativeType, BooleanBuffer, BooleanBufferBuilder, BufferBuilder, MutableBuffer,
    NullBuffer, NullBufferBuilder, OffsetBuffer, ScalarBuffer,
};
use arrow_data::ArrayData;
use arrow_schema::{DataType, UnionFields, UnionMode};
use num::ToPrimitive;

use crate::bit_block::OptionalBitBlockScanner;
use crate::error::SelectionError;

/// Options that define how `take` should behave
#[derive(Clone, Copy, Debug)]
pub struct TakeOptions {
    /// Verify every non-null index against the values length before taking.
    ///
    /// When disabled the caller guarantees that all indices are in bounds;
    /// an out-of-range index may then panic, but defined inputs never read
    /// outside their buffers.
    pub boundscheck: bool,
}

/// Process-wide default options, read-only after initialization
pub static DEFAULT_TAKE_OPTIONS: TakeOptions = TakeOptions { boundscheck: true };

impl Default for TakeOptions {
    fn default() -> Self {
        DEFAULT_TAKE_OPTIONS
    }
}

/// Take elements by index from [Array], creating a new [Array] from those indexes.
///
/// ```text
/// ┌─────────────────┐      ┌─────────┐                              ┌─────────────────┐
/// │        A        │      │    0    │                              │        A        │
/// ├─────────────────┤      ├─────────┤                              ├─────────────────┤
/// │        D        │      │    2    │                              │        B        │
/// ├─────────────────┤      ├─────────┤   take(values, indices)      ├─────────────────┤
/// │        B        │      │    3    │ ─────────────────────────▶   │        C        │
/// ├─────────────────┤      ├─────────┤                              ├─────────────────┤
/// │        C        │      │    1    │                              │        D        │
/// ├─────────────────┤      └─────────┘                              └─────────────────┘
/// │        E        │
/// └─────────────────┘
///    values array          indices array                              result
/// ```
///
/// A null index produces a null output row; a valid index referring to a
/// null value produces a null output row; otherwise row `j` of the output
/// equals `values[indices[j]]`.
///
/// Indices may be any integer type of byte width 1, 2, 4 or 8. Signed
/// indices are reinterpreted as unsigned once the bounds check has ruled
/// out negative values, so both signednesses share one gather per width.
///
/// # Errors
/// * [`SelectionError::Index`] if an index is out of bounds and
///   `options.boundscheck` is set (the default)
/// * [`SelectionError::NotImplemented`] if the indices are not integers or
///   the values type has no take kernel
///
/// # Examples
/// ```
/// # use arrow_array::{Int32Array, UInt32Array};
/// # use arrow_array::cast::AsArray;
/// # use arrow_array::types::Int32Type;
/// # use columnar_select::take::take;
/// let values = Int32Array::from(vec![10, 20, 30]);
/// let indices = UInt32Array::from(vec![2, 0]);
/// let taken = take(&values, &indices, None).unwrap();
/// assert_eq!(taken.as_primitive::<Int32Type>().values(), &[30, 10]);
/// ```
pub fn take(
    values: &dyn Array,
    indices: &dyn Array,
    options: Option<TakeOptions>,
) -> Result<ArrayRef, SelectionError> {
    let options = options.unwrap_or_default();
    macro_rules! helper {
        ($t:ty, $values:expr, $indices:expr, $options:expr) => {{
            let indices = $indices.as_primitive::<$t>();
            if $options.boundscheck {
                check_bounds($values.len(), indices)?;
            }
            take_unsigned($values, &indices.to_indices())
        }};
    }
    downcast_integer! {
        indices.data_type() => (helper, values, indices, options),
        d => Err(SelectionError::NotImplemented(format!(
            "Take only supported for integer indices, got {d}"
        )))
    }
}

/// Verifies that every non-null index addresses one of `len` rows
pub(crate) fn check_bounds<I>(
    len: usize,
    indices: &PrimitiveArray<I>,
) -> Result<(), SelectionError>
where
    I: ArrowPrimitiveType,
    I::Native: ToPrimitive,
{
    let check = |index: I::Native| {
        let ix = ToPrimitive::to_usize(&index).ok_or_else(|| {
            SelectionError::Index(format!("Index {index:?} cannot address an array row"))
        })?;
        if ix >= len {
            return Err(SelectionError::Index(format!(
                "Index {ix} out of bounds, cannot take from {len} rows"
            )));
        }
        Ok(())
    };
    if indices.null_count() > 0 {
        indices.iter().flatten().try_for_each(check)
    } else {
        indices.values().iter().copied().try_for_each(check)
    }
}

/// Reinterprets an index array as its unsigned counterpart of equal width
///
/// Sound only after [`check_bounds`] has ruled out negative values; the
/// shared buffer is re-typed, not copied.
pub(crate) trait ToIndices {
    type Unsigned: ArrowPrimitiveType;
    fn to_indices(&self) -> PrimitiveArray<Self::Unsigned>;
}

macro_rules! to_indices_identity {
    ($t:ty) => {
        impl ToIndices for PrimitiveArray<$t> {
            type Unsigned = $t;
            fn to_indices(&self) -> PrimitiveArray<$t> {
                self.clone()
            }
        }
    };
}

macro_rules! to_indices_reinterpret {
    ($from:ty, $to:ty) => {
        impl ToIndices for PrimitiveArray<$from> {
            type Unsigned = $to;
            fn to_indices(&self) -> PrimitiveArray<$to> {
                let values = ScalarBuffer::new(self.values().inner().clone(), 0, self.len());
                PrimitiveArray::new(values, self.nulls().cloned())
            }
        }
    };
}

to_indices_identity!(UInt8Type);
to_indices_identity!(UInt16Type);
to_indices_identity!(UInt32Type);
to_indices_identity!(UInt64Type);
to_indices_reinterpret!(Int8Type, UInt8Type);
to_indices_reinterpret!(Int16Type, UInt16Type);
to_indices_reinterpret!(Int32Type, UInt32Type);
to_indices_reinterpret!(Int64Type, UInt64Type);

/// Take dispatch over the values type, with indices already boundschecked
fn take_unsigned<I>(
    values: &dyn Array,
    indices: &PrimitiveArray<I>,
) -> Result<ArrayRef, SelectionError>
where
    I: ArrowPrimitiveType,
{
    match values.data_type() {
        DataType::Null => Ok(Arc::new(NullArray::new(indices.len()))),
        DataType::Boolean => Ok(Arc::new(take_boolean(values.as_boolean(), indices))),
        DataType::Utf8 => Ok(Arc::new(take_bytes(values.as_string::<i32>(), indices)?)),
        DataType::LargeUtf8 => Ok(Arc::new(take_bytes(values.as_string::<i64>(), indices)?)),
        DataType::Binary => Ok(Arc::new(take_bytes(values.as_binary::<i32>(), indices)?)),
        DataType::LargeBinary => Ok(Arc::new(take_bytes(values.as_binary::<i64>(), indices)?)),
        DataType::Utf8View => Ok(Arc::new(take_byte_view(values.as_string_view(), indices))),
        DataType::BinaryView => Ok(Arc::new(take_byte_view(values.as_binary_view(), indices))),
        DataType::FixedSizeBinary(size) => {
            let values = values
                .as_any()
                .downcast_ref::<FixedSizeBinaryArray>()
                .ok_or_else(|| {
                    SelectionError::Invalid("expected a fixed size binary array".to_string())
                })?;
            Ok(Arc::new(take_fixed_size_binary(values, indices, *size)))
        }
        DataType::List(_) => Ok(Arc::new(take_list(values.as_list::<i32>(), indices)?)),
        DataType::LargeList(_) => Ok(Arc::new(take_list(values.as_list::<i64>(), indices)?)),
        DataType::FixedSizeList(_, _) => {
            let values = values
                .as_any()
                .downcast_ref::<FixedSizeListArray>()
                .ok_or_else(|| {
                    SelectionError::Invalid("expected a fixed size list array".to_string())
                })?;
            Ok(Arc::new(take_fixed_size_list(values, indices)?))
        }
        DataType::Map(_, _) => Ok(Arc::new(take_map(values.as_map(), indices)?)),
        DataType::Struct(_) => Ok(Arc::new(take_struct(values.as_struct(), indices)?)),
        DataType::Union(fields, mode) => {
            let union = values
                .as_any()
                .downcast_ref::<UnionArray>()
                .ok_or_else(|| SelectionError::Invalid("expected a union array".to_string()))?;
            Ok(Arc::new(take_union(union, indices, fields.clone(), *mode)?))
        }
        DataType::Dictionary(_, _) => downcast_dictionary_array! {
            values => Ok(Arc::new(take_dict(values, indices)?)),
            t => Err(SelectionError::NotImplemented(format!(
                "Take not supported for dictionary type {t}"
            )))
        },
        t if t.primitive_width().is_some() => {
            Ok(make_array(take_fixed_width(&values.to_data(), indices)?))
        }
        t => Err(SelectionError::NotImplemented(format!(
            "Take not supported for {t}"
        ))),
    }
}

/// Fixed-width take, dispatched once on the physical byte width
///
/// Every logical type of a given byte width shares one gather, so a
/// timestamp take and an `i64` take are the same code.
fn take_fixed_width<I>(
    values: &ArrayData,
    indices: &PrimitiveArray<I>,
) -> Result<ArrayData, SelectionError>
where
    I: ArrowPrimitiveType,
{
    let width = values.data_type().primitive_width().ok_or_else(|| {
        SelectionError::NotImplemented(format!(
            "Take for non-fixed-width type {}",
            values.data_type()
        ))
    })?;
    match width {
        1 => Ok(take_width::<1, I>(values, indices)),
        2 => Ok(take_width::<2, I>(values, indices)),
        4 => Ok(take_width::<4, I>(values, indices)),
        8 => Ok(take_width::<8, I>(values, indices)),
        16 => Ok(take_width::<16, I>(values, indices)),
        32 => Ok(take_width::<32, I>(values, indices)),
        w => Err(SelectionError::NotImplemented(format!(
            "Take for primitive byte width {w}"
        ))),
    }
}

/// Gathers `W`-byte values block by block over the indices validity bitmap
///
/// Each block from the scanner picks one of four paths from two booleans:
/// whether the values may contain nulls, and whether the block of indices
/// is all-valid. All-set blocks over non-null values degrade to a straight
/// per-row memcpy with a bulk validity write; none-set blocks skip their
/// rows entirely. Null output slots hold deterministic zeros.
fn take_width<const W: usize, I>(values: &ArrayData, indices: &PrimitiveArray<I>) -> ArrayData
where
    I: ArrowPrimitiveType,
{
    let len = indices.len();
    let values_bytes =
        &values.buffers()[0].as_slice()[values.offset() * W..][..values.len() * W];
    let values_nulls = values.nulls().filter(|n| n.null_count() > 0);
    let indices_values = indices.values();
    let indices_nulls = indices.nulls().filter(|n| n.null_count() > 0);

    let mut out = MutableBuffer::from_len_zeroed(len * W);
    let out_bytes = out.as_slice_mut();
    let mut out_valid = BooleanBufferBuilder::new(len);
    let mut valid_count = 0usize;
    let mut position = 0usize;

    let mut scanner =
        OptionalBitBlockScanner::new(indices_nulls.map(|n| (n.validity(), n.offset())), len);

    match values_nulls {
        None => {
            while position < len {
                let block = scanner.next_block();
                let block_len = block.length as usize;
                valid_count += block.popcount as usize;
                if block.all_set() {
                    out_valid.append_n(block_len, true);
                    for _ in 0..block_len {
                        let start = indices_values[position].as_usize() * W;
                        out_bytes[position * W..position * W + W]
                            .copy_from_slice(&values_bytes[start..start + W]);
                        position += 1;
                    }
                } else if !block.none_set() {
                    for _ in 0..block_len {
                        if indices.is_valid(position) {
                            out_valid.append(true);
                            let start = indices_values[position].as_usize() * W;
                            out_bytes[position * W..position * W + W]
                                .copy_from_slice(&values_bytes[start..start + W]);
                        } else {
                            out_valid.append(false);
                        }
                        position += 1;
                    }
                } else {
                    out_valid.append_n(block_len, false);
                    position += block_len;
                }
            }
        }
        Some(nulls) => {
            while position < len {
                let block = scanner.next_block();
                let block_len = block.length as usize;
                if block.all_set() {
                    for _ in 0..block_len {
                        let index = indices_values[position].as_usize();
                        if nulls.is_valid(index) {
                            out_valid.append(true);
                            valid_count += 1;
                            out_bytes[position * W..position * W + W]
                                .copy_from_slice(&values_bytes[index * W..index * W + W]);
                        } else {
                            out_valid.append(false);
                        }
                        position += 1;
                    }
                } else if !block.none_set() {
                    for _ in 0..block_len {
                        if indices.is_valid(position) {
                            let index = indices_values[position].as_usize();
                            if nulls.is_valid(index) {
                                out_valid.append(true);
                                valid_count += 1;
                                out_bytes[position * W..position * W + W]
                                    .copy_from_slice(&values_bytes[index * W..index * W + W]);
                            } else {
                                out_valid.append(false);
                            }
                        } else {
                            out_valid.append(false);
                        }
                        position += 1;
                    }
                } else {
                    out_valid.append_n(block_len, false);
                    position += block_len;
                }
            }
        }
    }

    let nulls = NullBuffer::new(out_valid.finish());
    debug_assert_eq!(nulls.null_count(), len - valid_count);
    // The output validity bitmap is always allocated, even when no row
    // turned out null.
    let builder = ArrayData::builder(values.data_type().clone())
        .len(len)
        .add_buffer(out.into())
        .nulls(Some(nulls));
    unsafe { builder.build_unchecked() }
}

/// 1-bit specialization of the fixed-width take
///
/// The output values buffer is pre-zeroed so null and `false` slots are
/// byte-identical across runs; writes only ever set bits.
fn take_boolean<I>(values: &BooleanArray, indices: &PrimitiveArray<I>) -> BooleanArray
where
    I: ArrowPrimitiveType,
{
    let len = indices.len();
    let values_bits = values.values();
    let values_nulls = values.nulls().filter(|n| n.null_count() > 0);
    let indices_values = indices.values();
    let indices_nulls = indices.nulls().filter(|n| n.null_count() > 0);

    let mut out = MutableBuffer::new_null(len);
    let out_bytes = out.as_slice_mut();
    let mut out_valid = BooleanBufferBuilder::new(len);
    let mut position = 0usize;

    let mut scanner =
        OptionalBitBlockScanner::new(indices_nulls.map(|n| (n.validity(), n.offset())), len);

    match values_nulls {
        None => {
            while position < len {
                let block = scanner.next_block();
                let block_len = block.length as usize;
                if block.all_set() {
                    out_valid.append_n(block_len, true);
                    for _ in 0..block_len {
                        if values_bits.value(indices_values[position].as_usize()) {
                            bit_util::set_bit(out_bytes, position);
                        }
                        position += 1;
                    }
                } else if !block.none_set() {
                    for _ in 0..block_len {
                        if indices.is_valid(position) {
                            out_valid.append(true);
                            if values_bits.value(indices_values[position].as_usize()) {
                                bit_util::set_bit(out_bytes, position);
                            }
                        } else {
                            out_valid.append(false);
                        }
                        position += 1;
                    }
                } else {
                    out_valid.append_n(block_len, false);
                    position += block_len;
                }
            }
        }
        Some(nulls) => {
            while position < len {
                let block = scanner.next_block();
                let block_len = block.length as usize;
                if block.none_set() {
                    out_valid.append_n(block_len, false);
                    position += block_len;
                    continue;
                }
                let indices_all_valid = block.all_set();
                for _ in 0..block_len {
                    if indices_all_valid || indices.is_valid(position) {
                        let index = indices_values[position].as_usize();
                        if nulls.is_valid(index) {
                            out_valid.append(true);
                            if values_bits.value(index) {
                                bit_util::set_bit(out_bytes, position);
                            }
                        } else {
                            out_valid.append(false);
                        }
                    } else {
                        out_valid.append(false);
                    }
                    position += 1;
                }
            }
        }
    }

    let values = BooleanBuffer::new(out.into(), 0, len);
    BooleanArray::new(values, Some(NullBuffer::new(out_valid.finish())))
}

/// Take for variable-width binary and string arrays
///
/// Offsets are rebuilt front to back while values bytes are appended per
/// selected row.
fn take_bytes<T, I>(
    array: &GenericByteArray<T>,
    indices: &PrimitiveArray<I>,
) -> Result<GenericByteArray<T>, SelectionError>
where
    T: ByteArrayType,
    I: ArrowPrimitiveType,
{
    let len = indices.len();
    let value_offsets = array.value_offsets();
    let value_bytes = array.value_data();
    let mut offsets = BufferBuilder::<T::Offset>::new(len + 1);
    let mut values = MutableBuffer::new(0);
    let mut length_so_far = 0usize;
    let offset = |total: usize| {
        T::Offset::from_usize(total).ok_or_else(|| {
            SelectionError::Invalid(format!(
                "Take output of {total} bytes exceeds the {} offset range",
                T::DATA_TYPE
            ))
        })
    };
    offsets.append(offset(0)?);

    // byte extent of row `index`, in absolute values-buffer positions
    let extent = |index: usize| {
        (
            value_offsets[index].as_usize(),
            value_offsets[index + 1].as_usize(),
        )
    };

    let nulls = match (array.null_count() > 0, indices.null_count() > 0) {
        (false, false) => {
            for i in 0..len {
                let (start, end) = extent(indices.values()[i].as_usize());
                length_so_far += end - start;
                values.extend_from_slice(&value_bytes[start..end]);
                offsets.append(offset(length_so_far)?);
            }
            None
        }
        (true, false) => {
            let mut null_builder = NullBufferBuilder::new(len);
            for i in 0..len {
                let index = indices.values()[i].as_usize();
                if array.is_valid(index) {
                    let (start, end) = extent(index);
                    length_so_far += end - start;
                    values.extend_from_slice(&value_bytes[start..end]);
                    null_builder.append_non_null();
                } else {
                    null_builder.append_null();
                }
                offsets.append(offset(length_so_far)?);
            }
            null_builder.finish()
        }
        (false, true) => {
            for i in 0..len {
                if indices.is_valid(i) {
                    let (start, end) = extent(indices.values()[i].as_usize());
                    length_so_far += end - start;
                    values.extend_from_slice(&value_bytes[start..end]);
                }
                offsets.append(offset(length_so_far)?);
            }
            indices.nulls().cloned()
        }
        (true, true) => {
            let mut null_builder = NullBufferBuilder::new(len);
            for i in 0..len {
                if indices.is_valid(i) {
                    let index = indices.values()[i].as_usize();
                    if array.is_valid(index) {
                        let (start, end) = extent(index);
                        length_so_far += end - start;
                        values.extend_from_slice(&value_bytes[start..end]);
                        null_builder.append_non_null();
                    } else {
                        null_builder.append_null();
                    }
                } else {
                    null_builder.append_null();
                }
                offsets.append(offset(length_so_far)?);
            }
            null_builder.finish()
        }
    };

    let builder = ArrayData::builder(T::DATA_TYPE)
        .len(len)
        .add_buffer(offsets.finish())
        .add_buffer(values.into())
        .nulls(nulls);
    Ok(GenericByteArray::from(unsafe { builder.build_unchecked() }))
}

/// Take for view arrays gathers the fixed 16-byte views and shares the
/// data buffers with the input
fn take_byte_view<T, I>(
    array: &GenericByteViewArray<T>,
    indices: &PrimitiveArray<I>,
) -> GenericByteViewArray<T>
where
    T: ByteViewType,
    I: ArrowPrimitiveType,
{
    let len = indices.len();
    let views = array.views();
    let mut taken_views = Vec::with_capacity(len);
    let mut null_builder = NullBufferBuilder::new(len);
    for i in 0..len {
        if indices.is_valid(i) {
            let index = indices.values()[i].as_usize();
            if array.is_valid(index) {
                taken_views.push(views[index]);
                null_builder.append_non_null();
                continue;
            }
        }
        taken_views.push(0);
        null_builder.append_null();
    }
    // Safety: views are copied verbatim from a valid array whose data
    // buffers are carried over unchanged; null slots hold the empty view.
    unsafe {
        GenericByteViewArray::new_unchecked(
            ScalarBuffer::from(taken_views),
            array.data_buffers().to_vec(),
            null_builder.finish(),
        )
    }
}

fn take_fixed_size_binary<I>(
    values: &FixedSizeBinaryArray,
    indices: &PrimitiveArray<I>,
    size: i32,
) -> FixedSizeBinaryArray
where
    I: ArrowPrimitiveType,
{
    let len = indices.len();
    let width = size as usize;
    let mut out = MutableBuffer::from_len_zeroed(len * width);
    let out_bytes = out.as_slice_mut();
    let mut null_builder = NullBufferBuilder::new(len);
    for i in 0..len {
        if indices.is_valid(i) {
            let index = indices.values()[i].as_usize();
            if values.is_valid(index) {
                out_bytes[i * width..(i + 1) * width].copy_from_slice(values.value(index));
                null_builder.append_non_null();
                continue;
            }
        }
        null_builder.append_null();
    }
    let builder = ArrayData::builder(DataType::FixedSizeBinary(size))
        .len(len)
        .add_buffer(out.into())
        .nulls(null_builder.finish());
    FixedSizeBinaryArray::from(unsafe { builder.build_unchecked() })
}

/// Take for list arrays
///
/// Expands each selected list into the positions of its child rows, takes
/// the child once with those positions, and rebuilds the offsets. Output
/// row `i` is null when its index is null or refers to a null list; empty
/// lists stay valid.
fn take_list<O, I>(
    values: &GenericListArray<O>,
    indices: &PrimitiveArray<I>,
) -> Result<GenericListArray<O>, SelectionError>
where
    O: OffsetSizeTrait,
    I: ArrowPrimitiveType,
{
    let len = indices.len();
    let offsets = values.value_offsets();
    let mut child_indices = Vec::new();
    let mut new_offsets = Vec::with_capacity(len + 1);
    let mut null_builder = NullBufferBuilder::new(len);
    let mut total = 0usize;
    new_offsets.push(O::usize_as(0));
    for i in 0..len {
        if indices.is_valid(i) {
            let index = indices.values()[i].as_usize();
            if values.is_valid(index) {
                let start = offsets[index].as_usize();
                let end = offsets[index + 1].as_usize();
                for position in start..end {
                    child_indices.push(position as u64);
                }
                total += end - start;
                null_builder.append_non_null();
            } else {
                null_builder.append_null();
            }
        } else {
            null_builder.append_null();
        }
        let offset = O::from_usize(total).ok_or_else(|| {
            SelectionError::Invalid("Take output exceeds the list offset range".to_string())
        })?;
        new_offsets.push(offset);
    }

    let child = take(
        values.values().as_ref(),
        &UInt64Array::from(child_indices),
        Some(TakeOptions { boundscheck: false }),
    )?;
    let field = match values.data_type() {
        DataType::List(field) | DataType::LargeList(field) => field.clone(),
        _ => unreachable!("list array with non-list type"),
    };
    GenericListArray::try_new(
        field,
        OffsetBuffer::new(ScalarBuffer::from(new_offsets)),
        child,
        null_builder.finish(),
    )
    .map_err(Into::into)
}

/// Take for fixed-size lists
///
/// Every output row owns exactly `size` child slots, so null rows
/// contribute `size` null child indices rather than nothing.
fn take_fixed_size_list<I>(
    values: &FixedSizeListArray,
    indices: &PrimitiveArray<I>,
) -> Result<FixedSizeListArray, SelectionError>
where
    I: ArrowPrimitiveType,
{
    let len = indices.len();
    let size = values.value_length() as usize;
    let mut child_indices = Vec::with_capacity(len * size);
    let mut null_builder = NullBufferBuilder::new(len);
    for i in 0..len {
        if indices.is_valid(i) {
            let index = indices.values()[i].as_usize();
            if values.is_valid(index) {
                let start = values.value_offset(index) as u64;
                child_indices.extend((start..start + size as u64).map(Some));
                null_builder.append_non_null();
                continue;
            }
        }
        child_indices.extend(std::iter::repeat(None).take(size));
        null_builder.append_null();
    }

    let child = take(
        values.values().as_ref(),
        &UInt64Array::from(child_indices),
        Some(TakeOptions { boundscheck: false }),
    )?;
    let field = match values.data_type() {
        DataType::FixedSizeList(field, _) => field.clone(),
        _ => unreachable!("fixed size list array with non-list type"),
    };
    FixedSizeListArray::try_new(field, size as i32, child, null_builder.finish())
        .map_err(Into::into)
}

/// Take for map arrays, structurally a list of key/value entries
fn take_map<I>(values: &MapArray, indices: &PrimitiveArray<I>) -> Result<MapArray, SelectionError>
where
    I: ArrowPrimitiveType,
{
    let len = indices.len();
    let offsets = values.value_offsets();
    let mut entry_indices = Vec::new();
    let mut new_offsets = Vec::with_capacity(len + 1);
    let mut null_builder = NullBufferBuilder::new(len);
    let mut total = 0i32;
    new_offsets.push(0i32);
    for i in 0..len {
        if indices.is_valid(i) {
            let index = indices.values()[i].as_usize();
            if values.is_valid(index) {
                let start = offsets[index] as usize;
                let end = offsets[index + 1] as usize;
                for position in start..end {
                    entry_indices.push(position as u64);
                }
                total += (end - start) as i32;
                null_builder.append_non_null();
            } else {
                null_builder.append_null();
            }
        } else {
            null_builder.append_null();
        }
        new_offsets.push(total);
    }

    let entries = take(
        values.entries(),
        &UInt64Array::from(entry_indices),
        Some(TakeOptions { boundscheck: false }),
    )?;
    let (field, ordered) = match values.data_type() {
        DataType::Map(field, ordered) => (field.clone(), *ordered),
        _ => unreachable!("map array with non-map type"),
    };
    MapArray::try_new(
        field,
        OffsetBuffer::new(ScalarBuffer::from(new_offsets)),
        entries.as_struct().clone(),
        null_builder.finish(),
        ordered,
    )
    .map_err(Into::into)
}

/// Take for struct arrays recurses into every child with the same indices
fn take_struct<I>(
    values: &StructArray,
    indices: &PrimitiveArray<I>,
) -> Result<StructArray, SelectionError>
where
    I: ArrowPrimitiveType,
{
    let len = indices.len();
    let mut null_builder = NullBufferBuilder::new(len);
    for i in 0..len {
        if indices.is_valid(i) {
            let index = indices.values()[i].as_usize();
            null_builder.append(values.is_valid(index));
        } else {
            null_builder.append_null();
        }
    }
    let nulls = null_builder.finish();

    let fields = match values.data_type() {
        DataType::Struct(fields) => fields.clone(),
        _ => unreachable!("struct array with non-struct type"),
    };
    if fields.is_empty() {
        return Ok(StructArray::new_empty_fields(len, nulls));
    }
    let columns = values
        .columns()
        .iter()
        .map(|column| take_unsigned(column.as_ref(), indices))
        .collect::<Result<Vec<_>, _>>()?;
    StructArray::try_new(fields, columns, nulls).map_err(Into::into)
}

/// Take for dense and sparse unions
///
/// Each output row routes its child position through per-child index
/// lists; unreferenced children survive with zero rows so the output keeps
/// the full union type. Unions carry no top-level validity, so a null
/// index becomes a null row of the first declared field.
fn take_union<I>(
    values: &UnionArray,
    indices: &PrimitiveArray<I>,
    fields: UnionFields,
    mode: UnionMode,
) -> Result<UnionArray, SelectionError>
where
    I: ArrowPrimitiveType,
{
    let len = indices.len();
    let type_ids = values.type_ids();
    let first_type_id = fields
        .iter()
        .map(|(type_id, _)| type_id)
        .next()
        .ok_or_else(|| SelectionError::Invalid("union with no fields".to_string()))?;

    // resolve the child row addressed by logical row `index`
    let child_row = |index: usize| -> Result<usize, SelectionError> {
        match mode {
            UnionMode::Dense => {
                let offsets = values.offsets().ok_or_else(|| {
                    SelectionError::Invalid("dense union without offsets".to_string())
                })?;
                Ok(offsets[index] as usize)
            }
            UnionMode::Sparse => Ok(index),
        }
    };

    match mode {
        UnionMode::Sparse => {
            // every child of a sparse union spans all rows, so each child is
            // gathered over the full output length with nulls at rows of
            // other types
            let mut type_ids_out = Vec::with_capacity(len);
            for i in 0..len {
                if indices.is_valid(i) {
                    type_ids_out.push(type_ids[indices.values()[i].as_usize()]);
                } else {
                    type_ids_out.push(first_type_id);
                }
            }
            let children = fields
                .iter()
                .map(|(type_id, _)| {
                    let mut rows: Vec<Option<u64>> = Vec::with_capacity(len);
                    for i in 0..len {
                        if indices.is_valid(i) {
                            let index = indices.values()[i].as_usize();
                            if type_ids[index] == type_id {
                                rows.push(Some(child_row(index)? as u64));
                                continue;
                            }
                        }
                        rows.push(None);
                    }
                    take(
                        values.child(type_id).as_ref(),
                        &UInt64Array::from(rows),
                        Some(TakeOptions { boundscheck: false }),
                    )
                })
                .collect::<Result<Vec<_>, _>>()?;
            UnionArray::try_new(fields, ScalarBuffer::from(type_ids_out), None, children)
                .map_err(Into::into)
        }
        UnionMode::Dense => {
            let slots: Vec<i8> = fields.iter().map(|(type_id, _)| type_id).collect();
            let slot_of = |type_id: i8| -> Result<usize, SelectionError> {
                slots.iter().position(|id| *id == type_id).ok_or_else(|| {
                    SelectionError::Invalid(format!("union row with unknown type id {type_id}"))
                })
            };
            let mut child_indices: Vec<Vec<Option<u64>>> = vec![Vec::new(); slots.len()];
            let mut type_ids_out = Vec::with_capacity(len);
            let mut offsets_out = Vec::with_capacity(len);
            for i in 0..len {
                let (slot, row) = if indices.is_valid(i) {
                    let index = indices.values()[i].as_usize();
                    let type_id = type_ids[index];
                    type_ids_out.push(type_id);
                    (slot_of(type_id)?, Some(child_row(index)? as u64))
                } else {
                    type_ids_out.push(first_type_id);
                    (0, None)
                };
                child_indices[slot].push(row);
                offsets_out.push((child_indices[slot].len() - 1) as i32);
            }
            let children = slots
                .iter()
                .zip(child_indices)
                .map(|(type_id, rows)| {
                    take(
                        values.child(*type_id).as_ref(),
                        &UInt64Array::from(rows),
                        Some(TakeOptions { boundscheck: false }),
                    )
                })
                .collect::<Result<Vec<_>, _>>()?;
            UnionArray::try_new(
                fields,
                ScalarBuffer::from(type_ids_out),
                Some(ScalarBuffer::from(offsets_out)),
                children,
            )
            .map_err(Into::into)
        }
    }
}

/// Take for dictionary arrays
///
/// Only the keys are gathered; the output shares the input dictionary by
/// reference rather than copying it.
fn take_dict<K, I>(
    values: &DictionaryArray<K>,
    indices: &PrimitiveArray<I>,
) -> Result<DictionaryArray<K>, SelectionError>
where
    K: ArrowDictionaryKeyType,
    I: ArrowPrimitiveType,
{
    let keys_data = take_fixed_width(&values.keys().to_data(), indices)?;
    let keys = PrimitiveArray::<K>::from(keys_data);
    DictionaryArray::try_new(keys, Arc::clone(values.values())).map_err(Into::into)
}
