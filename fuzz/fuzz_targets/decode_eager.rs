#![no_main]

use libfuzzer_sys::fuzz_target;
use wisent_decoder::{EagerDecoder, LazyView};

// Fuzz target: full eager decode of arbitrary bytes.
//
// Any input must decode or fail with an error, and a successful decode
// must agree with a lazy materialize of the same buffer. The depth limit
// is kept low: an expression that refers to itself twice doubles the
// work at every level.
fuzz_target!(|data: &[u8]| {
    let decoder = EagerDecoder::new().with_max_depth(16);
    let Ok(eager) = decoder.decode_buffer(data) else {
        return;
    };
    if let Ok(lazy) = LazyView::root(data).and_then(|root| root.materialize()) {
        // NaN never equals itself; compare renderings instead.
        assert_eq!(lazy.to_string(), eager.to_string());
    }
});
