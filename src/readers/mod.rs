pub mod observation_reader;
pub mod station_reader;

pub use observation_reader::{read_site_list, read_text, ObservationReader};
pub use station_reader::StationReader;
