//! Virtual drivetrain state and gear ratio arithmetic.

/// Chainrings fitted when configuration supplies none.
const DEFAULT_CHAINRINGS: [u8; 2] = [50, 34];

/// Cassette fitted when configuration supplies none.
const DEFAULT_CASSETTE: [u8; 11] = [11, 12, 13, 14, 16, 18, 20, 22, 25, 28, 32];

/// A virtual drivetrain: chainring and cassette tooth counts plus the
/// currently selected front and rear indices.
///
/// The cassette is ordered smallest cog first, so a lower rear index is a
/// harder gear. Indices are always in bounds; out-of-range selections are
/// silently ignored.
#[derive(Debug, Clone)]
pub struct GearSet {
    chainrings: Vec<u8>,
    cassette: Vec<u8>,
    front: usize,
    rear: usize,
}

impl Default for GearSet {
    fn default() -> Self {
        Self::new(DEFAULT_CHAINRINGS.to_vec(), DEFAULT_CASSETTE.to_vec())
    }
}

impl GearSet {
    /// Create a drivetrain from configured tooth counts.
    ///
    /// Empty lists fall back to the default drivetrain rather than erroring.
    /// Starts on the big ring and a mid-cassette cog.
    pub fn new(chainrings: Vec<u8>, cassette: Vec<u8>) -> Self {
        let chainrings = if chainrings.is_empty() {
            tracing::warn!("empty chainring list, using default drivetrain");
            DEFAULT_CHAINRINGS.to_vec()
        } else {
            chainrings
        };
        let cassette = if cassette.is_empty() {
            tracing::warn!("empty cassette list, using default drivetrain");
            DEFAULT_CASSETTE.to_vec()
        } else {
            cassette
        };

        let rear = cassette.len() / 2;
        Self {
            chainrings,
            cassette,
            front: 0,
            rear,
        }
    }

    /// Current gear ratio: chainring teeth / cog teeth.
    pub fn ratio(&self) -> f64 {
        f64::from(self.chainrings[self.front]) / f64::from(self.cassette[self.rear])
    }

    /// Shift to a harder gear (smaller cog). No-op at the smallest cog.
    pub fn shift_up(&mut self) {
        if self.rear > 0 {
            self.rear -= 1;
        }
    }

    /// Shift to an easier gear (larger cog). No-op at the largest cog.
    pub fn shift_down(&mut self) {
        if self.rear + 1 < self.cassette.len() {
            self.rear += 1;
        }
    }

    /// Select a chainring by index. Out-of-bounds selections are ignored.
    pub fn set_front(&mut self, index: usize) {
        if index < self.chainrings.len() {
            self.front = index;
        }
    }

    /// Select a cog by index. Out-of-bounds selections are ignored.
    pub fn set_rear(&mut self, index: usize) {
        if index < self.cassette.len() {
            self.rear = index;
        }
    }

    /// Teeth on the selected chainring.
    pub fn front_teeth(&self) -> u8 {
        self.chainrings[self.front]
    }

    /// Teeth on the selected cog.
    pub fn rear_teeth(&self) -> u8 {
        self.cassette[self.rear]
    }

    /// Render the current gear as `"{chainring}x{cog}"`.
    pub fn label(&self) -> String {
        format!("{}x{}", self.front_teeth(), self.rear_teeth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gears_50_17() -> GearSet {
        let mut gears = GearSet::new(vec![50, 34], vec![11, 13, 15, 17, 19, 21]);
        gears.set_rear(3);
        gears
    }

    #[test]
    fn test_ratio_is_front_over_rear() {
        let gears = gears_50_17();
        assert!((gears.ratio() - 50.0 / 17.0).abs() < 1e-9);
    }

    #[test]
    fn test_shift_up_stops_at_smallest_cog() {
        let mut gears = gears_50_17();
        for _ in 0..20 {
            gears.shift_up();
        }
        assert_eq!(gears.rear_teeth(), 11);
        // Another shift is a silent no-op
        gears.shift_up();
        assert_eq!(gears.rear_teeth(), 11);
    }

    #[test]
    fn test_shift_down_stops_at_largest_cog() {
        let mut gears = gears_50_17();
        for _ in 0..20 {
            gears.shift_down();
        }
        assert_eq!(gears.rear_teeth(), 21);
        gears.shift_down();
        assert_eq!(gears.rear_teeth(), 21);
    }

    #[test]
    fn test_out_of_bounds_selection_ignored() {
        let mut gears = gears_50_17();
        let before = gears.label();
        gears.set_front(5);
        gears.set_rear(99);
        assert_eq!(gears.label(), before);
    }

    #[test]
    fn test_label_format() {
        let gears = gears_50_17();
        assert_eq!(gears.label(), "50x17");
    }

    #[test]
    fn test_empty_config_falls_back_to_default() {
        let gears = GearSet::new(vec![], vec![]);
        assert_eq!(gears.front_teeth(), 50);
        assert!(gears.ratio() > 0.0);
    }
}
