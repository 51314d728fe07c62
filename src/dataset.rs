//! Synthetic dataset generation.
//!
//! Coordinates are drawn uniformly from [0, 1) with a seeded ChaCha RNG so a
//! run can be reproduced exactly from its configuration.

use crate::config::RunConfig;
use crate::error::Result;
use crate::points::PointSet;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Reference set P and query set Q for one job.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub reference: PointSet,
    pub queries: PointSet,
}

impl Dataset {
    /// Generate a random dataset.
    ///
    /// The reference set is drawn first, then the queries, from one RNG
    /// stream seeded with `seed`.
    pub fn generate(
        reference_points: usize,
        queries: usize,
        dim: usize,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut reference = PointSet::zeroed(reference_points, dim, "reference set")?;
        fill_uniform(&mut reference, &mut rng);

        let mut query_set = PointSet::zeroed(queries, dim, "query set")?;
        fill_uniform(&mut query_set, &mut rng);

        Ok(Self {
            reference,
            queries: query_set,
        })
    }

    /// Generate the dataset described by `config`.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        Self::generate(
            config.reference_points,
            config.queries,
            config.dimension,
            config.seed,
        )
    }

    /// Wrap existing point sets.
    pub fn new(reference: PointSet, queries: PointSet) -> Self {
        Self { reference, queries }
    }
}

/// Overwrite every coordinate with an independent draw from [0, 1).
pub fn fill_uniform<R: Rng>(points: &mut PointSet, rng: &mut R) {
    for value in points.as_flat_mut() {
        *value = rng.gen::<f32>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_dataset() {
        let dataset = Dataset::generate(1000, 100, 16, 7).unwrap();
        assert_eq!(dataset.reference.len(), 1000);
        assert_eq!(dataset.queries.len(), 100);
        assert_eq!(dataset.reference.dim(), 16);
    }

    #[test]
    fn test_values_in_unit_interval() {
        let dataset = Dataset::generate(500, 50, 8, 1).unwrap();
        for &v in dataset.reference.as_flat().iter().chain(dataset.queries.as_flat()) {
            assert!((0.0..1.0).contains(&v), "value {} out of range", v);
        }
    }

    #[test]
    fn test_same_seed_same_data() {
        let a = Dataset::generate(100, 10, 4, 99).unwrap();
        let b = Dataset::generate(100, 10, 4, 99).unwrap();
        let c = Dataset::generate(100, 10, 4, 100).unwrap();

        assert_eq!(a.reference, b.reference);
        assert_eq!(a.queries, b.queries);
        assert_ne!(a.reference, c.reference);
    }

    #[test]
    fn test_from_config() {
        let config = RunConfig::default()
            .with_queries(3)
            .with_reference_points(20)
            .with_dimension(5);
        let dataset = Dataset::from_config(&config).unwrap();
        assert_eq!(dataset.queries.len(), 3);
        assert_eq!(dataset.reference.len(), 20);
        assert_eq!(dataset.queries.dim(), 5);
    }
}
