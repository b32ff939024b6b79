/// Split `ids` into consecutive batches of at most `size` elements.
///
/// Order is preserved and no batch is empty; an empty input yields no batches.
/// `size` must be non-zero.
pub fn chunk_ids<T: Clone>(ids: &[T], size: usize) -> Vec<Vec<T>> {
    assert!(size > 0, "batch size must be non-zero");
    ids.chunks(size).map(<[T]>::to_vec).collect()
}
