use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::coordinates::BoundingBox;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StationMetadata {
    #[validate(length(min = 1))]
    pub station_id: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    /// Metres above sea level, when the reference table has one.
    pub elevation: Option<f64>,
}

impl StationMetadata {
    pub fn new(station_id: String, latitude: f64, longitude: f64, elevation: Option<f64>) -> Self {
        Self {
            station_id,
            latitude,
            longitude,
            elevation,
        }
    }

    pub fn is_within(&self, bounds: &BoundingBox) -> bool {
        bounds.contains(self.latitude, self.longitude)
    }
}
