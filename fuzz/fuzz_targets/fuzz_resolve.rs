#![no_main]
use ipcountry::{IntervalRecord, RangeIndex};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let index = RangeIndex::from_records(
        [
            ("0.0.0.0", "0.255.255.255", "AA"),
            ("1.0.0.0", "1.255.255.255", "BB"),
            ("10.0.0.0", "10.255.255.255", "CC"),
            ("255.255.255.255", "255.255.255.255", "ZZ"),
            ("2001:db8::", "2001:db8::ffff", "DD"),
        ]
        .iter()
        .filter_map(|(s, e, l)| IntervalRecord::parse(s, e, l).ok()),
    )
    .unwrap();

    // Parsing edge cases: malformed text, mapped addresses, zone ids, ...
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = index.resolve_str(s);
    }
});
