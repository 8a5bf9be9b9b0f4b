//! Point budget tracking for one traversal
//!
//! The budget is checked before an octant is added, so a traversal may end
//! above the threshold by at most the last octant's point count.

/// Point budget for the visible set
#[derive(Clone, Debug)]
pub struct PointBudget {
    /// Maximum number of visible points
    threshold: u64,
    /// Points accounted for in the current traversal
    visible: u64,
}

impl PointBudget {
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            visible: 0,
        }
    }

    /// Start a new traversal
    pub fn reset(&mut self) {
        self.visible = 0;
    }

    /// Account for an octant's points
    pub fn add(&mut self, points: u64) {
        self.visible = self.visible.saturating_add(points);
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: u64) {
        self.threshold = threshold;
    }

    pub fn visible(&self) -> u64 {
        self.visible
    }

    /// True while another octant may still be added
    pub fn has_capacity(&self) -> bool {
        self.visible <= self.threshold
    }

    /// Points above the threshold (0 when within budget)
    pub fn overshoot(&self) -> u64 {
        self.visible.saturating_sub(self.threshold)
    }

    /// Fraction of the budget in use (0.0 to 1.0+)
    pub fn pressure(&self) -> f32 {
        if self.threshold == 0 {
            return if self.visible == 0 { 0.0 } else { f32::INFINITY };
        }
        self.visible as f32 / self.threshold as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_includes_threshold() {
        let mut budget = PointBudget::new(1000);
        budget.add(1000);
        // The check happens before adding, so reaching the threshold exactly
        // still admits one more octant
        assert!(budget.has_capacity());
        budget.add(200);
        assert!(!budget.has_capacity());
        assert_eq!(budget.overshoot(), 200);
    }

    #[test]
    fn test_reset() {
        let mut budget = PointBudget::new(10);
        budget.add(50);
        budget.reset();
        assert_eq!(budget.visible(), 0);
        assert!(budget.has_capacity());
        assert_eq!(budget.overshoot(), 0);
    }

    #[test]
    fn test_pressure() {
        let mut budget = PointBudget::new(200);
        assert_eq!(budget.pressure(), 0.0);
        budget.add(100);
        assert!((budget.pressure() - 0.5).abs() < 1e-6);
        budget.add(u64::MAX);
        assert_eq!(budget.visible(), u64::MAX);
    }

    #[test]
    fn test_zero_threshold() {
        let mut budget = PointBudget::new(0);
        assert!(budget.has_capacity());
        assert_eq!(budget.pressure(), 0.0);
        budget.add(1);
        assert!(!budget.has_capacity());
    }
}
