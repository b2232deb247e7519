#![no_main]
use ipcountry::{DatasetLoader, RangeIndex};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes, plain or gzip: must never panic
    let Ok(outcome) = DatasetLoader::new().load_bytes(data) else {
        return;
    };
    assert_eq!(outcome.records.len() + outcome.skipped.len(), outcome.rows_read);

    // Every record that made it through must be well formed
    for rec in &outcome.records {
        assert!(rec.start() <= rec.end());
        assert!(!rec.label().is_empty());
    }

    // Building either succeeds or reports an overlap
    if let Ok(index) = RangeIndex::from_records(outcome.records.clone()) {
        for rec in &outcome.records {
            let found = index.resolve(&rec.start_address()).unwrap();
            assert_eq!(found.label(), Some(rec.label()));
        }
    }
});
