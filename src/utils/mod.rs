pub mod constants;
pub mod coordinates;
pub mod filename;
pub mod progress;

pub use constants::*;
pub use coordinates::{dms_to_decimal, parse_coordinate, BoundingBox};
pub use filename::generate_default_dataset_filename;
pub use progress::ProgressReporter;
