use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Draws `batch_size` indices of a table of `len` rows uniformly at random, forever.
///
/// Indices are drawn with replacement, a pass over the table is not guaranteed to see every row.
#[derive(Debug, Clone)]
pub struct RandomBatcher {
    len: usize,
    batch_size: usize,
    rng: StdRng,
}

impl RandomBatcher {
    pub fn new(len: usize, batch_size: usize) -> RandomBatcher {
        RandomBatcher {
            len,
            batch_size,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(len: usize, batch_size: usize, seed: u64) -> RandomBatcher {
        RandomBatcher {
            len,
            batch_size,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Iterator for RandomBatcher {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 || self.batch_size == 0 {
            return None;
        }
        let len = self.len;
        let rng = &mut self.rng;
        Some((0..self.batch_size).map(|_| rng.gen_range(0, len)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffle_test() {
        let batches: Vec<_> = RandomBatcher::new(6, 4).take(50).collect();
        for batch in &batches {
            assert_eq!(batch.len(), 4);
            assert!(batch.iter().all(|&index| index < 6));
        }
    }

    #[test]
    fn same_seed_same_batches() {
        let a: Vec<_> = RandomBatcher::with_seed(100, 8, 7).take(3).collect();
        let b: Vec<_> = RandomBatcher::with_seed(100, 8, 7).take(3).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn batch_can_exceed_table_size() {
        let batch = RandomBatcher::with_seed(2, 10, 1).next().unwrap();
        assert_eq!(batch.len(), 10);
    }
}
