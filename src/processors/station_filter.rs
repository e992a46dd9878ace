use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::SelectionConfig;
use crate::error::{ProcessingError, Result};
use crate::models::StationMetadata;
use crate::utils::constants::{DEFAULT_DENSITY, DEFAULT_LAT_HALF_WIDTH, DEFAULT_LON_HALF_WIDTH};
use crate::utils::coordinates::BoundingBox;

/// Thins stations around a center point so the plot stays readable.
#[derive(Debug, Clone)]
pub struct StationFilter {
    lat_half_width: f64,
    lon_half_width: f64,
    density: f64,
    seed: Option<u64>,
}

impl StationFilter {
    pub fn new() -> Self {
        Self {
            lat_half_width: DEFAULT_LAT_HALF_WIDTH,
            lon_half_width: DEFAULT_LON_HALF_WIDTH,
            density: DEFAULT_DENSITY,
            seed: None,
        }
    }

    pub fn with_half_widths(mut self, lat_half_width: f64, lon_half_width: f64) -> Self {
        self.lat_half_width = lat_half_width;
        self.lon_half_width = lon_half_width;
        self
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn from_config(config: &SelectionConfig) -> Self {
        Self::new()
            .with_half_widths(config.lat_half_width, config.lon_half_width)
            .with_density(config.density)
            .with_seed(config.seed)
    }

    pub fn bounding_box(&self, center: &StationMetadata) -> BoundingBox {
        BoundingBox::around(
            center.latitude,
            center.longitude,
            self.lat_half_width,
            self.lon_half_width,
        )
    }

    /// Number of in-box stations kept: `ceil(n * density)`, at least one when
    /// any station is in the box.
    pub fn kept_count(&self, in_box: usize) -> usize {
        if in_box == 0 {
            return 0;
        }
        // Absorb float noise such as 20 * 0.55 = 11.000000000000002
        let kept = (in_box as f64 * self.density - 1e-9).ceil() as usize;
        kept.clamp(1, in_box)
    }

    /// Evenly spaced positions into a list of `in_box` stations: `floor(i / density)`
    /// for each kept `i`.
    pub fn spaced_indices(&self, in_box: usize) -> Vec<usize> {
        let last = in_box.saturating_sub(1);
        (0..self.kept_count(in_box))
            .map(|i| ((i as f64 / self.density).floor() as usize).min(last))
            .collect()
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Shuffle `stations`, keep those inside the box around `center`, then take an
    /// evenly spaced share of them matching the density.
    pub fn select<'a>(
        &self,
        center: &StationMetadata,
        stations: &'a [StationMetadata],
    ) -> Result<Vec<&'a StationMetadata>> {
        if !(self.density > 0.0 && self.density <= 1.0) {
            return Err(ProcessingError::Config(format!(
                "station density must be in (0, 1], got {}",
                self.density
            )));
        }

        let bounds = self.bounding_box(center);

        let mut shuffled: Vec<&StationMetadata> = stations.iter().collect();
        shuffled.shuffle(&mut self.rng());

        let in_box: Vec<&StationMetadata> = shuffled
            .into_iter()
            .filter(|station| station.is_within(&bounds))
            .collect();

        debug!(
            "{} of {} stations inside {:?}, density {}",
            in_box.len(),
            stations.len(),
            bounds,
            self.density
        );

        let selected: Vec<&StationMetadata> = self
            .spaced_indices(in_box.len())
            .into_iter()
            .map(|index| in_box[index])
            .collect();

        info!(
            "Selected {} stations around {}",
            selected.len(),
            center.station_id
        );

        Ok(selected)
    }
}

impl Default for StationFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the center station by id.
pub fn find_center<'a>(
    stations: &'a [StationMetadata],
    station_id: &str,
) -> Result<&'a StationMetadata> {
    stations
        .iter()
        .find(|station| station.station_id == station_id)
        .ok_or_else(|| ProcessingError::StationNotFound {
            station_id: station_id.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn station(id: &str, latitude: f64, longitude: f64) -> StationMetadata {
        StationMetadata::new(id.to_string(), latitude, longitude, None)
    }

    fn grid() -> Vec<StationMetadata> {
        // 20 stations around Dallas plus two far away
        let mut stations: Vec<StationMetadata> = (0..20)
            .map(|i| {
                station(
                    &format!("K{:03}", i),
                    32.0 + (i % 5) as f64 * 0.4,
                    -98.0 + (i / 5) as f64 * 0.8,
                )
            })
            .collect();
        stations.push(station("KSEA", 47.4, -122.3));
        stations.push(station("KBOS", 42.4, -71.0));
        stations
    }

    #[test]
    fn test_kept_count() {
        let filter = StationFilter::new().with_density(0.55);
        assert_eq!(filter.kept_count(20), 11);
        assert_eq!(filter.kept_count(100), 55);
        assert_eq!(filter.kept_count(1), 1);
        assert_eq!(filter.kept_count(0), 0);

        let sparse = StationFilter::new().with_density(0.1);
        assert_eq!(sparse.kept_count(5), 1);

        let dense = StationFilter::new().with_density(0.7);
        assert_eq!(dense.kept_count(100), 70);
    }

    #[test]
    fn test_spaced_indices() {
        let half = StationFilter::new().with_density(0.5);
        assert_eq!(half.spaced_indices(6), vec![0, 2, 4]);

        let filter = StationFilter::new().with_density(0.55);
        let indices = filter.spaced_indices(20);
        assert_eq!(indices.len(), 11);
        assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(indices.iter().all(|&index| index < 20));

        assert!(filter.spaced_indices(0).is_empty());
    }

    #[test]
    fn test_kept_share_tracks_density() {
        // 100 stations packed around the center
        let stations: Vec<StationMetadata> = (0..100)
            .map(|i| {
                station(
                    &format!("K{:03}", i),
                    32.0 + (i % 10) as f64 * 0.1,
                    -97.0 + (i / 10) as f64 * 0.1,
                )
            })
            .collect();
        let center = find_center(&stations, "K000").unwrap();

        for (density, expected) in [(0.55, 55), (0.25, 25), (0.7, 70), (1.0, 100)] {
            let selected = StationFilter::new()
                .with_density(density)
                .with_seed(Some(7))
                .select(center, &stations)
                .unwrap();
            assert_eq!(selected.len(), expected, "density {}", density);
        }
    }

    #[test]
    fn test_select_stays_in_box() {
        let stations = grid();
        let center = find_center(&stations, "K000").unwrap();
        let filter = StationFilter::new().with_seed(Some(7));

        let selected = filter.select(center, &stations).unwrap();

        assert_eq!(selected.len(), 11); // 20 in box at 0.55
        let bounds = filter.bounding_box(center);
        assert!(selected.iter().all(|s| s.is_within(&bounds)));
        let ids: HashSet<&str> = selected.iter().map(|s| s.station_id.as_str()).collect();
        assert!(!ids.contains("KSEA"));
        assert_eq!(ids.len(), selected.len());
    }

    #[test]
    fn test_seed_fixes_selection() {
        let stations = grid();
        let center = find_center(&stations, "K012").unwrap();
        let filter = StationFilter::new().with_seed(Some(42));

        let first: Vec<&str> = filter
            .select(center, &stations)
            .unwrap()
            .iter()
            .map(|s| s.station_id.as_str())
            .collect();
        let second: Vec<&str> = filter
            .select(center, &stations)
            .unwrap()
            .iter()
            .map(|s| s.station_id.as_str())
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_full_density_keeps_every_in_box_station() {
        let stations = grid();
        let center = find_center(&stations, "K000").unwrap();
        let selected = StationFilter::new()
            .with_density(1.0)
            .select(center, &stations)
            .unwrap();
        assert_eq!(selected.len(), 20);
    }

    #[test]
    fn test_unknown_center() {
        let err = find_center(&grid(), "KXXX").unwrap_err();
        assert!(matches!(err, ProcessingError::StationNotFound { .. }));
    }

    #[test]
    fn test_invalid_density() {
        let stations = grid();
        let center = find_center(&stations, "K000").unwrap();
        assert!(StationFilter::new()
            .with_density(0.0)
            .select(center, &stations)
            .is_err());
        assert!(StationFilter::new()
            .with_density(1.5)
            .select(center, &stations)
            .is_err());
    }
}
