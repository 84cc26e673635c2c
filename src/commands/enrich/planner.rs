use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Chunk<'a> {
    pub(super) sequence: u64,
    pub(super) items: &'a [WorkItem],
}

/// Consecutive batches of at most `batch_size` items, numbered from
/// `first_sequence`. Lazy; input order is kept.
pub(super) fn plan_chunks(
    items: &[WorkItem],
    batch_size: usize,
    first_sequence: u64,
) -> impl Iterator<Item = Chunk<'_>> {
    items
        .chunks(batch_size.max(1))
        .zip(first_sequence..)
        .map(|(items, sequence)| Chunk { sequence, items })
}

pub(super) fn planned_chunk_count(item_count: usize, batch_size: usize) -> usize {
    item_count.div_ceil(batch_size.max(1))
}
