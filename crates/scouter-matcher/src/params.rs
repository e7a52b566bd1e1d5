use serde::{Deserialize, Serialize};

/// Correspondence scoring parameters.
///
/// Distances are in ground-plane units (metres for a metric calibration).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Spread of the Gaussian on ground distance.
    pub sigma_ground: f32,
    /// Pairs further apart than this score zero.
    pub max_ground_distance: f32,
    /// Spread of the Gaussian on relative height difference.
    pub sigma_height: f32,
    /// Share of the score driven by height and aspect similarity, in `[0, 1]`.
    pub appearance_weight: f32,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            sigma_ground: 0.5,
            max_ground_distance: 2.0,
            sigma_height: 0.25,
            appearance_weight: 0.3,
        }
    }
}

impl MatchParams {
    pub(crate) fn is_valid(&self) -> bool {
        self.sigma_ground.is_finite()
            && self.sigma_ground > 0.0
            && self.sigma_height.is_finite()
            && self.sigma_height > 0.0
            && self.max_ground_distance >= 0.0
            && (0.0..=1.0).contains(&self.appearance_weight)
    }
}
