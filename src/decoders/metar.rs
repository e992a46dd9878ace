//! METAR grammar.
//!
//! Splits one coded report into text fragments (station, day/time group,
//! wind, weather, sky layers, temperature/dew point, sea-level pressure).
//! Fragments are handed to the field decoders in `fields`, which own the
//! missing-value and sanity rules.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{KNOTS_PER_KMH, KNOTS_PER_MPS, MISSING_TEXT};

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Text fragments cut from one report.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetarFragments {
    pub station_id: String,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    /// Compass point the wind blows from, `VRB` for variable.
    pub wind_direction: Option<String>,
    /// Knots.
    pub wind_speed: Option<String>,
    /// Degrees Celsius, one decimal.
    pub temperature: Option<String>,
    pub dewpoint: Option<String>,
    /// Hectopascals, one decimal.
    pub sea_level_pressure: Option<String>,
    pub present_weather: Vec<String>,
    pub sky_cover: Vec<String>,
    /// Feet above ground.
    pub sky_layer_base: Vec<Option<f64>>,
}

pub struct MetarParser {
    station: Regex,
    time: Regex,
    wind: Regex,
    weather: Regex,
    sky: Regex,
    clear: Regex,
    temperature: Regex,
    sea_level_pressure: Regex,
    precise_temperature: Regex,
}

impl MetarParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            station: Regex::new(r"^[A-Z][A-Z0-9]{3}$")?,
            time: Regex::new(r"^(\d{2})(\d{2})(\d{2})Z$")?,
            wind: Regex::new(r"^(\d{3}|VRB)(\d{2,3})(?:G\d{2,3})?(KT|MPS|KMH)$")?,
            weather: Regex::new(
                r"^(?:[-+]|VC)?(?:(?:MI|PR|BC|DR|BL|SH|TS|FZ)?(?:DZ|RA|SN|SG|IC|PL|GR|GS|UP|BR|FG|FU|VA|DU|SA|HZ|PY|PO|SQ|FC|SS|DS)+|TS|SH)$",
            )?,
            sky: Regex::new(r"^(FEW|SCT|BKN|OVC|VV)(\d{3}|///)?(?:CB|TCU)?$")?,
            clear: Regex::new(r"^(?:CLR|SKC|NSC|NCD)$")?,
            temperature: Regex::new(r"^(M?\d{2}|//)/(M?\d{2}|//)?$")?,
            sea_level_pressure: Regex::new(r"^SLP(\d{3})$")?,
            precise_temperature: Regex::new(r"^T([01])(\d{3})(?:([01])(\d{3}))?$")?,
        })
    }

    /// Parse one report line. Lines that break the grammar are `MalformedRecord`.
    pub fn parse(&self, line: &str) -> Result<MetarFragments> {
        let mut tokens = line.split_whitespace().peekable();

        if matches!(tokens.peek(), Some(&"METAR") | Some(&"SPECI")) {
            tokens.next();
        }

        let station_id = match tokens.next() {
            Some(token) if self.station.is_match(token) => token.to_string(),
            other => {
                return Err(ProcessingError::MalformedRecord(format!(
                    "expected station identifier, found {:?}",
                    other
                )))
            }
        };

        let (day, hour, minute) = match tokens.next().and_then(|t| self.time.captures(t)) {
            Some(caps) => (
                caps[1].parse::<u32>().unwrap_or(0),
                caps[2].parse::<u32>().unwrap_or(0),
                caps[3].parse::<u32>().unwrap_or(0),
            ),
            None => {
                return Err(ProcessingError::MalformedRecord(format!(
                    "{}: missing DDHHMMZ time group",
                    station_id
                )))
            }
        };

        let mut fragments = MetarFragments {
            station_id,
            day,
            hour,
            minute,
            ..Default::default()
        };

        let mut in_remarks = false;
        for token in tokens {
            if token == "RMK" {
                in_remarks = true;
                continue;
            }

            if in_remarks {
                self.parse_remark(token, &mut fragments);
                continue;
            }

            match token {
                "NIL" => {
                    return Err(ProcessingError::MalformedRecord(format!(
                        "{}: NIL report",
                        fragments.station_id
                    )))
                }
                "AUTO" | "COR" => continue,
                _ => self.parse_body_group(token, &mut fragments),
            }
        }

        Ok(fragments)
    }

    fn parse_body_group(&self, token: &str, fragments: &mut MetarFragments) {
        if fragments.wind_speed.is_none() {
            if let Some(caps) = self.wind.captures(token) {
                let speed = caps[2].parse::<f64>().unwrap_or(0.0);
                let knots = match &caps[3] {
                    "MPS" => speed * KNOTS_PER_MPS,
                    "KMH" => speed * KNOTS_PER_KMH,
                    _ => speed,
                };
                fragments.wind_speed = Some(format!("{:.0}", knots));
                fragments.wind_direction = Some(match &caps[1] {
                    "VRB" => "VRB".to_string(),
                    degrees => compass_point(degrees.parse::<f64>().unwrap_or(0.0)).to_string(),
                });
                return;
            }
        }

        if let Some(caps) = self.sky.captures(token) {
            fragments.sky_cover.push(caps[1].to_string());
            fragments.sky_layer_base.push(
                caps.get(2)
                    .and_then(|m| m.as_str().parse::<f64>().ok())
                    .map(|hundreds| hundreds * 100.0),
            );
            return;
        }

        if self.clear.is_match(token) {
            fragments.sky_cover.push("CLR".to_string());
            fragments.sky_layer_base.push(None);
            return;
        }

        if let Some(caps) = self.temperature.captures(token) {
            fragments.temperature = Some(celsius_fragment(&caps[1]));
            fragments.dewpoint = Some(
                caps.get(2)
                    .map(|m| celsius_fragment(m.as_str()))
                    .unwrap_or_else(|| MISSING_TEXT.to_string()),
            );
            return;
        }

        if self.weather.is_match(token) {
            fragments.present_weather.push(token.to_string());
        }
    }

    fn parse_remark(&self, token: &str, fragments: &mut MetarFragments) {
        if let Some(caps) = self.sea_level_pressure.captures(token) {
            fragments.sea_level_pressure = decode_slp_code(&caps[1]).map(|hpa| format!("{:.1}", hpa));
            return;
        }

        // Tenths-precision temperature group overrides the whole-degree body group
        if let Some(caps) = self.precise_temperature.captures(token) {
            fragments.temperature = Some(tenths_fragment(&caps[1], &caps[2]));
            if let (Some(sign), Some(value)) = (caps.get(3), caps.get(4)) {
                fragments.dewpoint = Some(tenths_fragment(sign.as_str(), value.as_str()));
            }
        }
    }
}

fn non_negative_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

/// `M05` → `-5.0`, `//` → `M`.
fn celsius_fragment(group: &str) -> String {
    let (negative, digits) = match group.strip_prefix('M') {
        Some(rest) => (true, rest),
        None => (false, group),
    };

    match digits.parse::<f64>() {
        Ok(value) => {
            let value = if negative { -value } else { value };
            format!("{:.1}", non_negative_zero(value))
        }
        Err(_) => MISSING_TEXT.to_string(),
    }
}

/// `T` group digits: sign flag `1` is negative, value in tenths.
fn tenths_fragment(sign: &str, tenths: &str) -> String {
    match tenths.parse::<f64>() {
        Ok(value) => {
            let value = value / 10.0;
            let value = if sign == "1" { -value } else { value };
            format!("{:.1}", non_negative_zero(value))
        }
        Err(_) => MISSING_TEXT.to_string(),
    }
}

/// Sixteen-point compass name for a direction in degrees.
pub fn compass_point(degrees: f64) -> &'static str {
    let normalized = degrees.rem_euclid(360.0);
    let index = ((normalized + 11.25) / 22.5) as usize % COMPASS_POINTS.len();
    COMPASS_POINTS[index]
}

/// Expand the three-digit `SLPppp` code (tenths of hPa, leading 9 or 10 dropped).
pub fn decode_slp_code(code: &str) -> Option<f64> {
    if code.len() != 3 {
        return None;
    }
    let tenths = code.parse::<u32>().ok()? as f64 / 10.0;
    if tenths < 50.0 {
        Some(1000.0 + tenths)
    } else {
        Some(900.0 + tenths)
    }
}

/// Place a `DDHHMM` group in time relative to the report-group time.
///
/// Reports carry no month or year; a day that would land more than a day
/// after the reference belongs to the previous month.
pub fn resolve_report_time(
    reference: NaiveDateTime,
    day: u32,
    hour: u32,
    minute: u32,
) -> Option<DateTime<Utc>> {
    let in_month = |date: NaiveDate| {
        NaiveDate::from_ymd_opt(date.year(), date.month(), day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
    };

    let candidate = in_month(reference.date())
        .filter(|candidate| *candidate <= reference + Duration::days(1))
        .or_else(|| {
            reference
                .date()
                .checked_sub_months(Months::new(1))
                .and_then(in_month)
        })?;

    Some(Utc.from_utc_datetime(&candidate))
}
