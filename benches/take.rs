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

use std::hint::black_box;
use std::sync::Arc;

use arrow_array::{ArrayRef, Int64Array, StringArray, UInt32Array};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use columnar_select::chunked::{take_chunked, ChunkedArray};
use columnar_select::take::take;

const LEN: usize = 4096;

fn bench_take(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);

    let values = Int64Array::from((0..LEN as i64).collect::<Vec<_>>());
    let nullable_values: Int64Array = (0..LEN as i64)
        .map(|v| (v % 7 != 0).then_some(v))
        .collect();
    let indices: UInt32Array = (0..LEN)
        .map(|_| Some(rng.gen_range(0..LEN as u32)))
        .collect();
    let nullable_indices: UInt32Array = (0..LEN)
        .map(|_| {
            if rng.gen_bool(0.1) {
                None
            } else {
                Some(rng.gen_range(0..LEN as u32))
            }
        })
        .collect();

    c.bench_function("take_i64_4096", |b| {
        b.iter(|| black_box(take(&values, &indices, None).unwrap()))
    });

    c.bench_function("take_i64_nullable_values_4096", |b| {
        b.iter(|| black_box(take(&nullable_values, &indices, None).unwrap()))
    });

    c.bench_function("take_i64_nullable_indices_4096", |b| {
        b.iter(|| black_box(take(&values, &nullable_indices, None).unwrap()))
    });

    let strings: StringArray = (0..LEN).map(|i| Some(format!("value-{i}"))).collect();
    c.bench_function("take_utf8_4096", |b| {
        b.iter(|| black_box(take(&strings, &indices, None).unwrap()))
    });

    let chunks: Vec<ArrayRef> = (0..8)
        .map(|chunk| {
            let start = (chunk * LEN / 8) as i64;
            Arc::new(Int64Array::from(
                (start..start + (LEN / 8) as i64).collect::<Vec<_>>(),
            )) as ArrayRef
        })
        .collect();
    let chunked = ChunkedArray::try_new(chunks, arrow_schema::DataType::Int64).unwrap();
    c.bench_function("take_chunked_i64_8x512", |b| {
        b.iter(|| black_box(take_chunked(&chunked, &indices, None).unwrap()))
    });
}

criterion_group!(benches, bench_take);
criterion_main!(benches);
