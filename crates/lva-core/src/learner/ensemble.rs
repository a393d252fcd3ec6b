//! Fixed-weight linear blend of predictors.

use super::Predictor;
use lva_common::{Error, Result, TrainingExample, UserHistory};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

pub struct EnsembleCombiner {
    members: Vec<(Box<dyn Predictor>, f64)>,
}

impl std::fmt::Debug for EnsembleCombiner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleCombiner")
            .field("name", &self.name())
            .field("weights", &self.weights())
            .finish()
    }
}

impl EnsembleCombiner {
    /// Weights must be finite, non-negative and sum to 1.
    pub fn new(members: Vec<(Box<dyn Predictor>, f64)>) -> Result<Self> {
        if members.is_empty() {
            return Err(Error::Config("ensemble needs at least one member".to_string()));
        }
        if let Some((p, w)) = members.iter().find(|(_, w)| !(w.is_finite() && *w >= 0.0)) {
            return Err(Error::Config(format!(
                "ensemble weight for {} must be finite and >= 0, got {}",
                p.name(),
                w
            )));
        }
        let sum: f64 = members.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::Config(format!(
                "ensemble weights must sum to 1, got {}",
                sum
            )));
        }
        Ok(Self { members })
    }

    pub fn weights(&self) -> Vec<f64> {
        self.members.iter().map(|(_, w)| *w).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Predictor for EnsembleCombiner {
    fn name(&self) -> String {
        let names: Vec<String> = self.members.iter().map(|(p, _)| p.name()).collect();
        format!("Combination: {}", names.join(","))
    }

    fn learn(&mut self, examples: &[TrainingExample]) -> Result<()> {
        for (member, _) in &mut self.members {
            member.learn(examples)?;
        }
        Ok(())
    }

    fn predict(&self, query: &UserHistory, period: f64) -> Result<f64> {
        let mut total = 0.0;
        for (member, weight) in &self.members {
            total += weight * member.predict(query, period)?;
        }
        Ok(total)
    }
}
