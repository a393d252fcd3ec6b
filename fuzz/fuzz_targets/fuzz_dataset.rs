//! Fuzz target for dataset parsing.
//!
//! Any parsed dataset is pushed through feature extraction and the rate
//! baseline, which must reject bad timestamps with errors.

#![no_main]

use libfuzzer_sys::fuzz_target;
use lva_config::BaselineConfig;
use lva_core::dataset::parse_dataset;
use lva_core::features::vectorize;
use lva_core::learner::{Predictor, SimpleRateLearner};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(dataset) = parse_dataset(text, 2) else {
        return;
    };
    let baseline = SimpleRateLearner::new(&BaselineConfig::default());
    for ex in &dataset.examples {
        let _ = vectorize(&ex.history);
        let _ = ex.outcome.activity_rate();
        let _ = baseline.predict(&ex.query(), 86_400.0);
    }
});
