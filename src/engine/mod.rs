// Copyright 2026 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Engine abstraction for data-parallel record generation.
//!
//! Builders never spawn tasks directly; they describe their work as a lazy
//! collection ([`EngineData`]) obtained from an [`EngineContext`] and
//! transformed with `map` / `flat_map` / `union`. The parallel engine runs
//! async stages with bounded concurrency; the sequential engine runs the
//! identical pipeline one element at a time, which keeps tests
//! deterministic.

use futures::stream::{self, BoxStream, StreamExt};
use std::future::Future;

/// Capability producing lazy collections for the builders.
pub trait EngineContext: Send + Sync {
    /// Lift a materialized vector into a lazy collection with the given
    /// stage parallelism.
    fn parallelize<T>(&self, items: Vec<T>, parallelism: usize) -> EngineData<T>
    where
        T: Send + 'static;

    /// An empty collection.
    fn empty<T>(&self) -> EngineData<T>
    where
        T: Send + 'static,
    {
        self.parallelize(Vec::new(), 1)
    }
}

/// Engine that runs async stages concurrently, bounded by each stage's
/// parallelism.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParallelEngine;

impl EngineContext for ParallelEngine {
    fn parallelize<T>(&self, items: Vec<T>, parallelism: usize) -> EngineData<T>
    where
        T: Send + 'static,
    {
        EngineData {
            stream: stream::iter(items).boxed(),
            parallelism: parallelism.max(1),
            ordered: false,
        }
    }
}

/// Engine that runs every stage with parallelism one, preserving input
/// order. Interchangeable with [`ParallelEngine`] anywhere an
/// [`EngineContext`] is accepted.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialEngine;

impl EngineContext for SequentialEngine {
    fn parallelize<T>(&self, items: Vec<T>, _parallelism: usize) -> EngineData<T>
    where
        T: Send + 'static,
    {
        EngineData {
            stream: stream::iter(items).boxed(),
            parallelism: 1,
            ordered: true,
        }
    }
}

/// A lazy, partition-friendly collection of items.
///
/// Nothing runs until [`EngineData::collect`] (or `try_collect`) is
/// awaited; transformations compose the underlying stream. Async stages
/// suspend only at their own I/O.
pub struct EngineData<T> {
    stream: BoxStream<'static, T>,
    parallelism: usize,
    ordered: bool,
}

impl<T: Send + 'static> EngineData<T> {
    /// Transform each element synchronously.
    pub fn map<U, F>(self, f: F) -> EngineData<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        EngineData {
            stream: self.stream.map(f).boxed(),
            parallelism: self.parallelism,
            ordered: self.ordered,
        }
    }

    /// Transform each element through an async stage, running up to the
    /// stage parallelism concurrently.
    pub fn map_async<U, F, Fut>(self, f: F) -> EngineData<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = U> + Send + 'static,
    {
        let pending = self.stream.map(f);
        let stream = if self.ordered {
            pending.buffered(self.parallelism).boxed()
        } else {
            pending.buffer_unordered(self.parallelism).boxed()
        };
        EngineData {
            stream,
            parallelism: self.parallelism,
            ordered: self.ordered,
        }
    }

    /// Expand each element into zero or more outputs through an async
    /// stage, running up to the stage parallelism concurrently.
    pub fn flat_map<U, F, Fut>(self, f: F) -> EngineData<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = Vec<U>> + Send + 'static,
    {
        self.map_async(f).flatten_vec()
    }

    /// Concatenate with another collection. The result carries the larger
    /// of the two stage parallelisms and stays ordered only if both sides
    /// were.
    pub fn union(self, other: EngineData<T>) -> EngineData<T> {
        EngineData {
            stream: self.stream.chain(other.stream).boxed(),
            parallelism: self.parallelism.max(other.parallelism),
            ordered: self.ordered && other.ordered,
        }
    }

    /// Materialize the collection.
    pub async fn collect(self) -> Vec<T> {
        self.stream.collect().await
    }
}

impl<T: Send + 'static> EngineData<Vec<T>> {
    fn flatten_vec(self) -> EngineData<T> {
        EngineData {
            stream: self.stream.map(stream::iter).flatten().boxed(),
            parallelism: self.parallelism,
            ordered: self.ordered,
        }
    }
}

impl<T, E> EngineData<Result<T, E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Materialize the collection, stopping at the first error.
    pub async fn try_collect(self) -> Result<Vec<T>, E> {
        let mut stream = self.stream;
        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_map_and_collect() {
        let engine = ParallelEngine;
        let out = engine
            .parallelize(vec![1, 2, 3], 4)
            .map(|v| v * 10)
            .collect()
            .await;
        let mut sorted = out.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn test_sequential_engine_preserves_order() {
        let engine = SequentialEngine;
        let out = engine
            .parallelize(vec![3, 1, 2], 16)
            .map_async(|v| async move { v * 2 })
            .collect()
            .await;
        assert_eq!(out, vec![6, 2, 4]);
    }

    #[tokio::test]
    async fn test_flat_map_expands_and_drops() {
        let engine = SequentialEngine;
        let out = engine
            .parallelize(vec![0, 1, 2, 3], 1)
            .flat_map(|v| async move {
                if v % 2 == 0 {
                    vec![]
                } else {
                    vec![v, v]
                }
            })
            .collect()
            .await;
        assert_eq!(out, vec![1, 1, 3, 3]);
    }

    #[tokio::test]
    async fn test_union_concatenates() {
        let engine = SequentialEngine;
        let left = engine.parallelize(vec!["a"], 1);
        let right = engine.parallelize(vec!["b", "c"], 1);
        assert_eq!(left.union(right).collect().await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_empty() {
        let engine = ParallelEngine;
        let out: Vec<u64> = engine.empty().collect().await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_parallel_engine_bounds_concurrency() {
        let engine = ParallelEngine;
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let in_flight_clone = Arc::clone(&in_flight);
        let max_seen_clone = Arc::clone(&max_seen);
        let out = engine
            .parallelize((0..32).collect::<Vec<_>>(), 4)
            .map_async(move |v| {
                let in_flight = Arc::clone(&in_flight_clone);
                let max_seen = Arc::clone(&max_seen_clone);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    v
                }
            })
            .collect()
            .await;

        assert_eq!(out.len(), 32);
        assert!(max_seen.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn test_try_collect_stops_on_error() {
        let engine = SequentialEngine;
        let result: Result<Vec<i32>, String> = engine
            .parallelize(vec![Ok(1), Err("boom".to_string()), Ok(3)], 1)
            .try_collect()
            .await;
        assert_eq!(result.unwrap_err(), "boom");
    }

    #[tokio::test]
    async fn test_parallelism_clamped_to_one() {
        let engine = ParallelEngine;
        let out = engine
            .parallelize(vec![1], 0)
            .map_async(|v| async move { v })
            .collect()
            .await;
        assert_eq!(out, vec![1]);
    }
}
