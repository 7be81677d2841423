#![no_main]
use libfuzzer_sys::fuzz_target;

use checkpoint_core::group::{index_groups, CheckpointGroup};
use checkpoint_core::report::RawReport;
use checkpoint_engine::reconcile::reconcile;

fuzz_target!(|data: &[u8]| {
    // First half: report batch. Second half: previous groups.
    let mid = data.len() / 2;
    let (left, right) = data.split_at(mid);
    let Ok(reports) = serde_json::from_slice::<Vec<RawReport>>(left) else {
        return;
    };
    let previous = serde_json::from_slice::<Vec<CheckpointGroup>>(right)
        .map(index_groups)
        .unwrap_or_default();

    let once = reconcile(&reports, &previous);
    assert!(once.iter().all(|g| !g.is_empty()));
    assert!(once.windows(2).all(|w| w[0].key() < w[1].key()));
    assert_eq!(once, reconcile(&reports, &previous));
});
