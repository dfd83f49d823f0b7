/// Splits `items` into consecutive slices of at most `size` elements.
///
/// Order is preserved within and across chunks: chunk `i` holds
/// `items[i * size..(i + 1) * size]`, the last one possibly shorter.
/// Empty input yields no chunks.
///
/// # Panics
///
/// Panics if `size` is zero.
pub fn chunk<T>(items: &[T], size: usize) -> impl ExactSizeIterator<Item = &[T]> {
    assert!(size > 0, "chunk size must be positive");
    items.chunks(size)
}
