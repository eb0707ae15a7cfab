/// Count-weighted round robin over the units of a workload.
///
/// Over any window of `sum(counts)` picks, unit `i` is chosen exactly
/// `counts[i]` times, and picks of the same unit are spread out rather
/// than run back to back.
#[derive(Debug, Clone)]
pub struct UnitCycle {
    weights: Vec<i64>,
    current: Vec<i64>,
    total: i64,
}

impl UnitCycle {
    pub fn new(counts: &[u64]) -> Self {
        let weights: Vec<i64> = counts
            .iter()
            .map(|&c| c.min(u32::MAX as u64) as i64)
            .collect();
        Self {
            total: weights.iter().sum(),
            current: vec![0; weights.len()],
            weights,
        }
    }

    /// Always yields `index`
    pub fn pinned(index: usize, len: usize) -> Self {
        let mut counts = vec![0; len];
        if let Some(count) = counts.get_mut(index) {
            *count = 1;
        }
        Self::new(&counts)
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Index of the next unit, `None` when every count is zero
    pub fn next_index(&mut self) -> Option<usize> {
        if self.total == 0 {
            return None;
        }
        for (current, weight) in self.current.iter_mut().zip(&self.weights) {
            *current += weight;
        }
        // first maximum wins ties, so declaration order breaks them
        let mut best = 0;
        for (i, current) in self.current.iter().enumerate() {
            if *current > self.current[best] {
                best = i;
            }
        }
        self.current[best] -= self.total;
        Some(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_are_interleaved() {
        let mut cycle = UnitCycle::new(&[2, 1]);
        let picks: Vec<_> = (0..6).map(|_| cycle.next_index().unwrap()).collect();
        assert_eq!(picks, [0, 1, 0, 0, 1, 0]);
    }

    #[test]
    fn test_counts_hold_over_a_window() {
        let counts = [44, 43, 4, 4, 4];
        let mut cycle = UnitCycle::new(&counts);
        let mut seen = [0u64; 5];
        for _ in 0..counts.iter().sum::<u64>() {
            seen[cycle.next_index().unwrap()] += 1;
        }
        assert_eq!(seen, counts);
    }

    #[test]
    fn test_zero_counts_are_skipped() {
        let mut cycle = UnitCycle::new(&[0, 3, 0]);
        assert!((0..5).all(|_| cycle.next_index() == Some(1)));
        assert!(UnitCycle::new(&[0, 0]).next_index().is_none());
        assert!(UnitCycle::new(&[]).is_empty());
    }

    #[test]
    fn test_pinned() {
        let mut cycle = UnitCycle::pinned(2, 3);
        assert_eq!(cycle.next_index(), Some(2));
        assert_eq!(cycle.next_index(), Some(2));
    }
}
