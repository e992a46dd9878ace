use chrono::{NaiveDate, NaiveDateTime};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use metar_processor::config::SourceKind;
use metar_processor::decoders::{MetarDecoder, MetarParser, StructuredDecoder};
use metar_processor::models::{ParameterKind, StationMetadata, StructuredEntry};
use metar_processor::processors::{DerivedQuantityEngine, RecencyReducer, StationFilter};
use metar_processor::utils::coordinates::dms_to_decimal;
use std::collections::HashMap;

const WEATHER: [&str; 4] = ["", "-RA", "BR", "TSRA"];
const COVER: [&str; 5] = ["CLR", "FEW035", "SCT080", "BKN120", "OVC250"];

fn reference() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 15)
        .and_then(|d| d.and_hms_opt(19, 0, 0))
        .unwrap()
}

fn station_id(index: usize) -> String {
    format!("K{:03}", index % 1000)
}

// Report lines for `station_count` stations, `reports_per_station` each
fn create_report_lines(station_count: usize, reports_per_station: usize) -> Vec<String> {
    let mut lines = vec!["2024/01/15 18:53".to_string()];

    for report in 0..reports_per_station {
        for station in 0..station_count {
            let direction = (station * 37 + report * 10) % 360;
            let temperature = (station % 30) as i32 - 5;
            let weather = WEATHER[station % WEATHER.len()];
            lines.push(format!(
                "{} 1518{:02}Z {:03}{:02}KT 10SM {} {} {}/{} A2992 RMK SLP{:03}",
                station_id(station),
                50 - report.min(50),
                direction,
                5 + station % 20,
                weather,
                COVER[station % COVER.len()],
                if temperature < 0 {
                    format!("M{:02}", -temperature)
                } else {
                    format!("{:02}", temperature)
                },
                "05",
                (100 + station) % 1000
            ));
        }
    }

    lines
}

fn create_structured_entries(station_count: usize) -> Vec<StructuredEntry> {
    let mut entries = Vec::with_capacity(station_count * 3);
    for station in 0..station_count {
        entries.push(StructuredEntry::new().with_text(ParameterKind::SkyCover, "BKN"));
        entries.push(StructuredEntry::new().with_text(ParameterKind::PresentWeather, "-RA"));
        entries.push(
            StructuredEntry::new()
                .with_text(ParameterKind::StationId, &station_id(station))
                .with_number(ParameterKind::Time, 1_705_344_780_000.0)
                .with_number(ParameterKind::Temperature, 21.0)
                .with_number(ParameterKind::WindDirection, (station * 7 % 360) as f64)
                .with_number(ParameterKind::WindSpeed, 12.0)
                .with_number(ParameterKind::SeaLevelPressure, 1013.2),
        );
    }
    entries
}

fn create_stations(station_count: usize) -> Vec<StationMetadata> {
    (0..station_count)
        .map(|station| {
            StationMetadata::new(
                station_id(station),
                30.0 + (station % 50) as f64 * 0.1,
                -100.0 + (station / 50) as f64 * 0.25,
                None,
            )
        })
        .collect()
}

fn benchmark_metar_parser(c: &mut Criterion) {
    let parser = MetarParser::new().unwrap();
    let line = "METAR KDFW 151853Z 18010G18KT 10SM -RA FEW035 BKN120 OVC250 22/14 A2992 RMK AO2 SLP132 T02220139";

    c.bench_function("metar_parse_report", |b| {
        b.iter(|| black_box(parser.parse(black_box(line)).is_ok()))
    });
}

fn benchmark_decoders(c: &mut Criterion) {
    let requested = ParameterKind::all();
    let decoder = MetarDecoder::new(reference()).unwrap();
    let lines = create_report_lines(200, 3);

    c.bench_function("metar_decode_batch", |b| {
        b.iter(|| black_box(decoder.decode_lines(&lines, &requested).records.len()))
    });

    let entries = create_structured_entries(200);
    let structured = StructuredDecoder::new();

    c.bench_function("structured_decode_batch", |b| {
        b.iter(|| {
            black_box(
                structured
                    .decode_entries(entries.iter().cloned(), &requested)
                    .records
                    .len(),
            )
        })
    });
}

fn benchmark_reduce_and_derive(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduce_and_derive_by_size");
    let requested = ParameterKind::all();
    let decoder = MetarDecoder::new(reference()).unwrap();

    for &size in &[10, 100, 500] {
        let records = decoder
            .decode_lines(create_report_lines(size, 1), &requested)
            .records;
        let stations: HashMap<String, StationMetadata> = create_stations(size)
            .into_iter()
            .map(|s| (s.station_id.clone(), s))
            .collect();

        group.bench_with_input(BenchmarkId::new("stations", size), &size, |b, _| {
            b.iter(|| {
                let reconciled = RecencyReducer::new().reduce(records.clone());
                let (dataset, _) = DerivedQuantityEngine::new().derive(
                    &reconciled,
                    &stations,
                    SourceKind::Metar,
                    None,
                );
                black_box(dataset.len())
            })
        });
    }

    group.finish();
}

fn benchmark_station_filter(c: &mut Criterion) {
    let stations = create_stations(1000);
    let center = stations[0].clone();
    let filter = StationFilter::new().with_seed(Some(42));

    c.bench_function("station_filter_1000", |b| {
        b.iter(|| black_box(filter.select(&center, &stations).map(|s| s.len()).unwrap_or(0)))
    });
}

fn benchmark_coordinate_conversion(c: &mut Criterion) {
    let dms_coordinates = ["32:53:48", "30:11:40", "-97:02:15", "-96:51:00", "29:38:42"];

    c.bench_function("coordinate_conversion", |b| {
        b.iter(|| {
            let mut results = Vec::new();
            for dms in &dms_coordinates {
                if let Ok(decimal) = dms_to_decimal(dms) {
                    results.push(decimal);
                }
            }
            black_box(results.len())
        })
    });
}

criterion_group!(
    benches,
    benchmark_metar_parser,
    benchmark_decoders,
    benchmark_reduce_and_derive,
    benchmark_station_filter,
    benchmark_coordinate_conversion
);
criterion_main!(benches);
