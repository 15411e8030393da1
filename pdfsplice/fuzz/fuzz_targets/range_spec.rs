#![no_main]

use libfuzzer_sys::fuzz_target;
use pdfsplice::parse_range_spec;

fuzz_target!(|data: (&str, u16)| {
    let (spec, total) = data;
    let total = usize::from(total);

    if let Ok(ranges) = parse_range_spec(spec, total) {
        for range in ranges {
            assert!(range.start >= 1);
            assert!(range.start <= range.end);
            assert!(range.end <= total);
        }
    }
});
