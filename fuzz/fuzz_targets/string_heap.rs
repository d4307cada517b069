#![no_main]

use libfuzzer_sys::fuzz_target;
use wisent_wire::string_heap::read_string;

// Fuzz target: chunked string reads from an arbitrary heap.
//
// Input format:
//   bytes 0..2: offset (u16, little-endian)
//   bytes 2..:  heap
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let offset = u64::from(u16::from_le_bytes([data[0], data[1]]));
    let heap = &data[2..];
    if let Ok(s) = read_string(heap, offset) {
        assert!(s.len() <= heap.len());
    }
});
