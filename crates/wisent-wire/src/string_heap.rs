use crate::error::WireError;

/// The heap is read in 32-byte chunks.
pub const CHUNK_SIZE: usize = 32;

/// Read the string starting at `offset` in the string heap.
///
/// Each chunk is conceptually NUL-padded: its text ends at the first NUL
/// byte. A chunk that is filled completely with no NUL continues into the
/// next chunk at `offset + 32`. A chunk cut short by the end of the heap,
/// or an empty chunk, ends the string.
///
/// ```text
///   offset                 +32                    +64
///   │ 32 bytes, no NUL      │ "…tail\0"            │
///   └──── continuation ─────┴── terminated ────────┘
/// ```
///
/// Consecutive chunks are adjacent in the heap, so the result is always a
/// borrowed slice; nothing is copied. Validation runs on the complete
/// byte range, which lets a multi-byte character straddle a chunk
/// boundary.
///
/// A string that ends exactly at the end of the heap without a NUL is
/// read up to the heap end. The format cannot tell such a string apart
/// from a truncated one.
///
/// # Errors
///
/// - [`WireError::StringOffsetOutOfRange`] if `offset` is past the heap.
/// - [`WireError::InvalidStringEncoding`] if the bytes are not UTF-8.
pub fn read_string(strings: &[u8], offset: u64) -> Result<&str, WireError> {
    let start = usize::try_from(offset)
        .ok()
        .filter(|&start| start <= strings.len())
        .ok_or(WireError::StringOffsetOutOfRange {
            offset,
            len: strings.len(),
        })?;

    let mut cursor = start;
    let end = loop {
        let chunk_end = cursor.saturating_add(CHUNK_SIZE).min(strings.len());
        let chunk = &strings[cursor..chunk_end];
        if let Some(nul) = chunk.iter().position(|&b| b == 0) {
            break cursor + nul;
        }
        if chunk.len() < CHUNK_SIZE {
            break chunk_end;
        }
        cursor = chunk_end;
    };

    std::str::from_utf8(&strings[start..end])
        .map_err(|_| WireError::InvalidStringEncoding { offset })
}
