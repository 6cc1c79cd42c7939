//! Hypergeometric probability utilities
//!
//! Drawing `draws` cards without replacement from a library of `population`
//! cards, `successes_in_population` of which are hits.

use crate::error::{CollectionError, Result};

/// Parameters of a hypergeometric query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HypergeometricInput {
    /// N
    pub population: u32,
    /// K
    pub population_successes: u32,
    /// n
    pub draws: u32,
    /// k
    pub successes: u32,
}

impl HypergeometricInput {
    pub fn new(population: u32, population_successes: u32, draws: u32, successes: u32) -> Self {
        Self {
            population,
            population_successes,
            draws,
            successes,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.population_successes > self.population {
            return Err(CollectionError::InvalidInput(format!(
                "population successes ({}) must not exceed population size ({})",
                self.population_successes, self.population
            )));
        }
        if self.draws > self.population {
            return Err(CollectionError::InvalidInput(format!(
                "draws ({}) must not exceed population size ({})",
                self.draws, self.population
            )));
        }
        if self.successes > self.population_successes || self.successes > self.draws {
            return Err(CollectionError::InvalidInput(format!(
                "successes ({}) cannot exceed population successes ({}) or draws ({})",
                self.successes, self.population_successes, self.draws
            )));
        }
        Ok(())
    }

    fn max_successes(&self) -> u32 {
        self.population_successes.min(self.draws)
    }
}

/// C(n, k) via the incremental multiplicative formula
fn combination(n: u32, k: u32) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (1..=k).fold(1.0, |acc, i| acc * f64::from(n - k + i) / f64::from(i))
}

/// P(X = k)
pub fn probability(input: HypergeometricInput) -> Result<f64> {
    input.validate()?;
    Ok(point_probability(input))
}

fn point_probability(input: HypergeometricInput) -> f64 {
    let HypergeometricInput {
        population: n_total,
        population_successes: k_total,
        draws,
        successes,
    } = input;
    let denominator = combination(n_total, draws);
    if denominator == 0.0 {
        return 0.0;
    }
    combination(k_total, successes) * combination(n_total - k_total, draws - successes)
        / denominator
}

/// P(X >= k)
pub fn at_least(input: HypergeometricInput) -> Result<f64> {
    input.validate()?;
    Ok((input.successes..=input.max_successes())
        .map(|successes| point_probability(HypergeometricInput { successes, ..input }))
        .sum())
}

/// Expected hits in `draws` cards: n * K / N
pub fn expected_successes(population: u32, population_successes: u32, draws: u32) -> f64 {
    if population == 0 {
        return 0.0;
    }
    f64::from(draws) * f64::from(population_successes) / f64::from(population)
}

/// Point probabilities for every possible number of hits, 0..=min(K, n)
pub fn distribution(population: u32, population_successes: u32, draws: u32) -> Result<Vec<f64>> {
    let base = HypergeometricInput::new(population, population_successes, draws, 0);
    base.validate()?;
    Ok((0..=base.max_successes())
        .map(|successes| point_probability(HypergeometricInput { successes, ..base }))
        .collect())
}
