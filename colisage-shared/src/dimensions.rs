use serde::{Deserialize, Serialize};

/// Physical package dimensions, in centimeters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub height_cm: f64,
    pub width_cm: f64,
    pub length_cm: f64,
}

impl Dimensions {
    pub fn new(height_cm: f64, width_cm: f64, length_cm: f64) -> Self {
        Self {
            height_cm,
            width_cm,
            length_cm,
        }
    }

    /// Longest of the three sides, used for the physical size limit check.
    pub fn longest_side_cm(&self) -> f64 {
        self.height_cm.max(self.width_cm).max(self.length_cm)
    }
}
