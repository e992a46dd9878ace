use chrono::{DateTime, Datelike, Timelike, Utc};
use std::path::PathBuf;

/// Default dataset filename: sfc-obs-{YYMMDD}-{HH}Z.{extension}, keyed on the valid hour
pub fn generate_default_dataset_filename(valid_at: DateTime<Utc>, extension: &str) -> PathBuf {
    let filename = format!(
        "sfc-obs-{:02}{:02}{:02}-{:02}Z.{}",
        valid_at.year() % 100,
        valid_at.month(),
        valid_at.day(),
        valid_at.hour(),
        extension
    );
    PathBuf::from("output").join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_default_dataset_filename() {
        let valid_at = Utc.with_ymd_and_hms(2024, 1, 5, 18, 53, 0).unwrap();
        let filename = generate_default_dataset_filename(valid_at, "parquet");

        assert_eq!(filename, PathBuf::from("output/sfc-obs-240105-18Z.parquet"));
    }

    #[test]
    fn test_extension_is_respected() {
        let valid_at = Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap();
        let filename = generate_default_dataset_filename(valid_at, "json");
        let filename_str = filename.to_string_lossy();

        assert!(filename_str.starts_with("output/"));
        assert!(filename_str.ends_with("231231-00Z.json"));
    }
}
