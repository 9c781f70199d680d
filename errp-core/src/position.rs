/// Pixels kept clear at each horizontal screen edge.
pub const EDGE_MARGIN_PX: f32 = 100.0;

/// Maps the abstract position index space onto evenly spaced x coordinates,
/// centered on zero. Deterministic given `n_positions` and the window width;
/// owned by the session and shared read-only by every trial.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionMap {
    xs: Vec<f32>,
}

impl PositionMap {
    /// `n_positions` must be at least 2; the configuration resolver rejects
    /// anything smaller before a session starts.
    pub fn new(n_positions: usize, window_width: u32) -> Self {
        let usable = window_width as f32 - 2.0 * EDGE_MARGIN_PX;
        let spacing = usable / (n_positions as f32 - 1.0);
        let xs = (0..n_positions)
            .map(|i| -usable / 2.0 + i as f32 * spacing)
            .collect();
        Self { xs }
    }

    pub fn x(&self, idx: usize) -> f32 {
        self.xs[idx]
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_usable_width_symmetrically() {
        let map = PositionMap::new(20, 1920);
        assert_eq!(map.len(), 20);
        let usable = 1920.0 - 2.0 * EDGE_MARGIN_PX;
        assert!((map.x(0) + usable / 2.0).abs() < 1e-3);
        assert!((map.x(19) - usable / 2.0).abs() < 1e-3);
    }

    #[test]
    fn evenly_spaced() {
        let map = PositionMap::new(20, 1920);
        let spacing = map.x(1) - map.x(0);
        for i in 1..map.len() {
            assert!((map.x(i) - map.x(i - 1) - spacing).abs() < 1e-3);
        }
    }

    #[test]
    fn deterministic() {
        assert_eq!(PositionMap::new(20, 1920), PositionMap::new(20, 1920));
    }
}
