#![no_main]

use libfuzzer_sys::fuzz_target;
use wisent_wire::{Regions, TagBlocks};

// Fuzz target: tag walking over every expression's child range.
//
// Catches bugs in:
// - Run length words past the argument types
// - Runs spilling past a child range
// - Blocks that overlap or leave gaps
fuzz_target!(|data: &[u8]| {
    let Ok(regions) = Regions::parse(data) else {
        return;
    };
    for index in 0..regions.expr_count() as u64 {
        let Ok(range) = regions.child_range(index) else {
            continue;
        };
        let mut cursor = range.start;
        for block in TagBlocks::new(regions, range.clone()) {
            let Ok(block) = block else {
                break;
            };
            assert_eq!(block.slots.start, cursor);
            assert!(block.slots.end > block.slots.start);
            assert!(block.slots.end <= range.end);
            cursor = block.slots.end;
        }
    }
});
