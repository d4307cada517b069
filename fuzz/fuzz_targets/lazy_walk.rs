#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use wisent_decoder::LazyView;

#[derive(Arbitrary, Debug)]
enum Step {
    At(u8),
    Lookup(String),
    Column(String),
    Drain,
}

#[derive(Arbitrary, Debug)]
struct Input {
    buf: Vec<u8>,
    steps: Vec<Step>,
}

// Fuzz target: navigate a lazy view along an arbitrary path.
//
// Catches bugs in:
// - Run skipping in positional access
// - Lookups over corrupt child ranges
// - Iterators that keep going after an error
fuzz_target!(|input: Input| {
    let Ok(mut view) = LazyView::root(&input.buf) else {
        return;
    };
    for step in &input.steps {
        let next = match step {
            Step::At(n) => view.at(usize::from(*n)).ok().and_then(|value| value.as_view()),
            Step::Lookup(key) => view.map_lookup(key).ok(),
            Step::Column(name) => view.column(name).ok(),
            Step::Drain => {
                let mut seen_error = false;
                for argument in view.arguments().take(1 << 16) {
                    assert!(!seen_error, "argument after an error");
                    seen_error = argument.is_err();
                }
                None
            }
        };
        match next {
            Some(child) => view = child,
            None => return,
        }
    }
});
