//! Splitting a sequence into fixed-size chunks.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::iter::{FusedIterator, Map};

/// One group of items, numbered from 1 in the order produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<T> {
    pub number: usize,
    pub items: Vec<T>,
}

impl<T> Chunk<T> {
    /// Returns the number of items in the chunk.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the chunk holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consumes the chunk, returning its items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Error returned for a chunk size of zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSizeError(pub usize);

impl fmt::Display for ChunkSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk size must be greater than 0, got {}", self.0)
    }
}

impl std::error::Error for ChunkSizeError {}

/// Lazy iterator over the chunks of an underlying iterator.
///
/// Only one chunk is held in memory at a time. The iterator consumes its
/// source, so it cannot be restarted.
#[derive(Debug)]
pub struct Chunks<I> {
    source: I,
    size: usize,
    emitted: usize,
    done: bool,
}

impl<I: Iterator> Iterator for Chunks<I> {
    type Item = Chunk<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut items = Vec::with_capacity(self.size);
        for item in self.source.by_ref() {
            items.push(item);
            if items.len() == self.size {
                break;
            }
        }

        if items.len() < self.size {
            self.done = true;
        }
        if items.is_empty() {
            return None;
        }

        self.emitted += 1;
        Some(Chunk {
            number: self.emitted,
            items,
        })
    }
}

impl<I: Iterator> FusedIterator for Chunks<I> {}

/// Splits `data` into chunks of `size` items, preserving order.
///
/// Every chunk but the last holds exactly `size` items; the last holds the
/// remainder. No empty chunk is produced.
///
/// # Examples
///
/// ```
/// use hataori::split_in_chunks;
///
/// let chunks: Vec<_> = split_in_chunks(1..=10, 3)?
///     .map(|chunk| (chunk.number, chunk.items))
///     .collect();
///
/// assert_eq!(
///     chunks,
///     vec![
///         (1, vec![1, 2, 3]),
///         (2, vec![4, 5, 6]),
///         (3, vec![7, 8, 9]),
///         (4, vec![10]),
///     ]
/// );
/// # Ok::<(), hataori::ChunkSizeError>(())
/// ```
pub fn split_in_chunks<D>(data: D, size: usize) -> Result<Chunks<D::IntoIter>, ChunkSizeError>
where
    D: IntoIterator,
{
    if size == 0 {
        return Err(ChunkSizeError(size));
    }
    Ok(Chunks {
        source: data.into_iter(),
        size,
        emitted: 0,
        done: false,
    })
}

/// Like [`split_in_chunks`], but each element is projected through `f`
/// before being added to a chunk.
pub fn split_in_chunks_by<D, F, U>(
    data: D,
    size: usize,
    f: F,
) -> Result<Chunks<Map<D::IntoIter, F>>, ChunkSizeError>
where
    D: IntoIterator,
    F: FnMut(D::Item) -> U,
{
    split_in_chunks(data.into_iter().map(f), size)
}

/// A record with named columns.
pub trait ColumnRow {
    type Value;

    /// Takes the value of `column` out of the row.
    fn take_column(self, column: &str) -> Option<Self::Value>;
}

impl<V> ColumnRow for HashMap<String, V> {
    type Value = V;

    fn take_column(mut self, column: &str) -> Option<V> {
        self.remove(column)
    }
}

impl<V> ColumnRow for BTreeMap<String, V> {
    type Value = V;

    fn take_column(mut self, column: &str) -> Option<V> {
        self.remove(column)
    }
}

impl ColumnRow for serde_json::Value {
    type Value = serde_json::Value;

    fn take_column(self, column: &str) -> Option<serde_json::Value> {
        match self {
            serde_json::Value::Object(mut map) => map.remove(column),
            _ => None,
        }
    }
}

/// Splits rows into chunks of one column's values.
///
/// A row without the column contributes `None`, so chunk sizes are the same
/// as with [`split_in_chunks`].
///
/// # Examples
///
/// ```
/// use hataori::split_in_chunks_by_column;
/// use serde_json::json;
///
/// let rows = vec![json!({"id": 1}), json!({"id": 2}), json!({"name": "x"})];
/// let ids: Vec<_> = split_in_chunks_by_column(rows, 2, "id")?
///     .map(|chunk| chunk.items)
///     .collect();
///
/// assert_eq!(ids, vec![vec![Some(json!(1)), Some(json!(2))], vec![None]]);
/// # Ok::<(), hataori::ChunkSizeError>(())
/// ```
pub fn split_in_chunks_by_column<D>(
    data: D,
    size: usize,
    column: impl Into<String>,
) -> Result<Chunks<ColumnValues<D::IntoIter>>, ChunkSizeError>
where
    D: IntoIterator,
    D::Item: ColumnRow,
{
    split_in_chunks(
        ColumnValues {
            rows: data.into_iter(),
            column: column.into(),
        },
        size,
    )
}

/// Iterator over one column of a sequence of rows.
#[derive(Debug)]
pub struct ColumnValues<I> {
    rows: I,
    column: String,
}

impl<I> Iterator for ColumnValues<I>
where
    I: Iterator,
    I::Item: ColumnRow,
{
    type Item = Option<<I::Item as ColumnRow>::Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(|row| row.take_column(&self.column))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uneven_split() {
        let data: Vec<String> = (1..=10).map(|i| format!("e{i}")).collect();
        let chunks: Vec<Chunk<String>> = split_in_chunks(data.clone(), 3).unwrap().collect();

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].number, 1);
        assert_eq!(chunks[0].items, vec!["e1", "e2", "e3"]);
        assert_eq!(chunks[1].items, vec!["e4", "e5", "e6"]);
        assert_eq!(chunks[2].items, vec!["e7", "e8", "e9"]);
        assert_eq!(chunks[3].number, 4);
        assert_eq!(chunks[3].items, vec!["e10"]);

        let flattened: Vec<String> = chunks.into_iter().flat_map(Chunk::into_items).collect();
        assert_eq!(flattened, data);
    }

    #[test]
    fn test_even_split_has_no_partial_chunk() {
        let chunks: Vec<_> = split_in_chunks(1..=9, 3).unwrap().collect();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|chunk| chunk.len() == 3));
        assert_eq!(chunks[2].number, 3);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let mut chunks = split_in_chunks(Vec::<u32>::new(), 4).unwrap();
        assert!(chunks.next().is_none());
        assert!(chunks.next().is_none());
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let result = split_in_chunks(vec![1, 2], 0);
        assert_eq!(result.unwrap_err(), ChunkSizeError(0));
    }

    #[test]
    fn test_size_larger_than_input() {
        let chunks: Vec<_> = split_in_chunks(vec!['a', 'b'], 5).unwrap().collect();
        assert_eq!(chunks, vec![Chunk { number: 1, items: vec!['a', 'b'] }]);
    }

    #[test]
    fn test_chunks_are_produced_lazily() {
        let mut pulled = 0;
        let source = std::iter::from_fn(|| {
            pulled += 1;
            Some(pulled)
        });
        let mut chunks = split_in_chunks(source, 2).unwrap();
        assert_eq!(chunks.next().map(Chunk::into_items), Some(vec![1, 2]));
        assert_eq!(chunks.next().map(Chunk::into_items), Some(vec![3, 4]));
    }

    #[test]
    fn test_projection() {
        let chunks: Vec<_> = split_in_chunks_by(vec![1, 2, 3], 2, |n| n * 10)
            .unwrap()
            .map(Chunk::into_items)
            .collect();
        assert_eq!(chunks, vec![vec![10, 20], vec![30]]);
    }

    #[test]
    fn test_column_projection_from_maps() {
        let rows: Vec<HashMap<String, i64>> = (1..=5)
            .map(|i| {
                let mut row = HashMap::new();
                row.insert("id".to_string(), i);
                row.insert("qty".to_string(), i * 100);
                row
            })
            .collect();

        let chunks: Vec<_> = split_in_chunks_by_column(rows, 2, "qty")
            .unwrap()
            .collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].items, vec![Some(100), Some(200)]);
        assert_eq!(chunks[2].items, vec![Some(500)]);
        assert_eq!(chunks[2].number, 3);
    }

    #[test]
    fn test_missing_column_keeps_position() {
        let mut with_sku = BTreeMap::new();
        with_sku.insert("sku".to_string(), "A-1".to_string());
        let rows = vec![with_sku, BTreeMap::new()];

        let chunks: Vec<_> = split_in_chunks_by_column(rows, 5, "sku")
            .unwrap()
            .collect();
        assert_eq!(chunks[0].items, vec![Some("A-1".to_string()), None]);
    }
}
