//! Fuzz target for interval extraction and model scoring on arbitrary
//! timestamps, including NaN and infinities.

#![no_main]

use libfuzzer_sys::fuzz_target;
use lva_core::hmm::GaussianHmm;
use lva_core::interval::intervals_from_timestamps;

fuzz_target!(|timestamps: Vec<f64>| {
    let Ok(seq) = intervals_from_timestamps(&timestamps) else {
        return;
    };
    assert_eq!(seq.len(), timestamps.len() - 1);
    assert!(seq.as_slice().iter().all(|g| *g >= 0.0));

    let model = GaussianHmm::degenerate(1e-3);
    let _ = model.log_likelihood(seq.as_slice());
    if let Some(post) = model.filtering_posterior(seq.as_slice()) {
        assert!(post.iter().all(|p| p.is_finite()));
    }
});
