use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ── Stop ──────────────────────────────────────────────────────────────────────

/// Stop record as returned by `GET /stops/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub municipality_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_coord")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coord")]
    pub lon: Option<f64>,
}

impl Stop {
    /// Second header line: locality, else municipality, else the network name.
    pub fn subtitle(&self) -> &str {
        [&self.locality, &self.municipality_name]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or(NETWORK_NAME)
    }
}

pub const NETWORK_NAME: &str = "Carris Metropolitana";

// ── Arrivals ──────────────────────────────────────────────────────────────────

/// One entry of `GET /stops/{id}/realtime`. Times are `HH:MM:SS` service-day strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArrival {
    pub line_id: String,
    #[serde(default)]
    pub headsign: String,
    #[serde(default)]
    pub scheduled_arrival: Option<String>,
    #[serde(default)]
    pub estimated_arrival: Option<String>,
    #[serde(default)]
    pub stop_id: String,
    #[serde(default)]
    pub trip_id: String,
}

impl RawArrival {
    /// The estimate when one was provided, otherwise the timetable time.
    pub fn time_source(&self) -> Option<&str> {
        non_empty(self.estimated_arrival.as_deref()).or(non_empty(self.scheduled_arrival.as_deref()))
    }

    pub fn has_estimate(&self) -> bool {
        non_empty(self.estimated_arrival.as_deref()).is_some()
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// A countdown row ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedArrival {
    pub line_id: String,
    pub destination: String,
    pub minutes_until_arrival: i64,
    pub is_live: bool,
    pub display_color: LineColor,
}

impl ProcessedArrival {
    pub fn countdown(&self) -> Countdown {
        Countdown::from_minutes(self.minutes_until_arrival)
    }

    pub fn badge(&self) -> &'static str {
        if self.is_live {
            "LIVE"
        } else {
            "EST"
        }
    }
}

/// How a minute offset is shown on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Now,
    Minutes(i64),
    OverAnHour,
}

impl Countdown {
    pub fn from_minutes(minutes: i64) -> Self {
        match minutes {
            m if m <= 0 => Self::Now,
            m if m > 59 => Self::OverAnHour,
            m => Self::Minutes(m),
        }
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Now => f.write_str("now"),
            Self::Minutes(m) => write!(f, "{} min", m),
            Self::OverAnHour => f.write_str("+1h"),
        }
    }
}

/// Line badge color. Serialized as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl LineColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Serialize for LineColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

// ── Vehicles ──────────────────────────────────────────────────────────────────

/// One position sample from `GET /vehicles`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_coord")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coord")]
    pub lon: Option<f64>,
    #[serde(default, alias = "speed")]
    pub speed_kmh: Option<f64>,
    #[serde(default, alias = "heading", alias = "bearing")]
    pub heading_degrees: Option<f64>,
    #[serde(default)]
    pub line_id: String,
    #[serde(default)]
    pub trip_id: String,
    #[serde(default)]
    pub pattern_id: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl Vehicle {
    /// `None` when either coordinate is missing or not a finite number.
    pub fn position(&self) -> Option<GeoPoint> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => GeoPoint::new(lat, lon),
            _ => None,
        }
    }
}

// ── Geometry ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        valid.then_some(Self { lat, lon })
    }
}

/// Axis-aligned lat/lon rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Smallest rectangle covering every point; `None` for an empty input.
    pub fn covering(points: impl IntoIterator<Item = GeoPoint>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let init = Self {
            south: first.lat,
            west: first.lon,
            north: first.lat,
            east: first.lon,
        };
        Some(iter.fold(init, |b, p| Self {
            south: b.south.min(p.lat),
            west: b.west.min(p.lon),
            north: b.north.max(p.lat),
            east: b.east.max(p.lon),
        }))
    }

    /// Rectangle of the given lat/lon spans centered on `center`.
    pub fn around(center: GeoPoint, lat_span: f64, lon_span: f64) -> Self {
        Self {
            south: center.lat - lat_span / 2.0,
            west: center.lon - lon_span / 2.0,
            north: center.lat + lat_span / 2.0,
            east: center.lon + lon_span / 2.0,
        }
    }

    /// Grow each side by `fraction` of the span, and by at least `min_span / 2`
    /// so a single-point rectangle still has an area.
    pub fn padded(&self, fraction: f64, min_span: f64) -> Self {
        let lat_pad = ((self.north - self.south) * fraction).max(min_span / 2.0);
        let lon_pad = ((self.east - self.west) * fraction).max(min_span / 2.0);
        Self {
            south: self.south - lat_pad,
            west: self.west - lon_pad,
            north: self.north + lat_pad,
            east: self.east + lon_pad,
        }
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        (self.south..=self.north).contains(&p.lat) && (self.west..=self.east).contains(&p.lon)
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: (self.south + self.north) / 2.0,
            lon: (self.west + self.east) / 2.0,
        }
    }
}

// ── Insight ───────────────────────────────────────────────────────────────────

/// Short natural-language briefing for a stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub summary: String,
    pub recommendation: String,
}

impl Insight {
    pub fn fallback() -> Self {
        Self {
            summary: "Real-time data is flowing normally.".to_string(),
            recommendation: "Always keep an eye on the board for sudden changes.".to_string(),
        }
    }
}

// ── serde helpers ─────────────────────────────────────────────────────────────

/// Coordinates arrive as numbers or numeric strings depending on the endpoint.
fn lenient_coord<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Coord {
        Number(f64),
        Text(String),
    }

    let value = match Option::<Coord>::deserialize(deserializer)? {
        Some(Coord::Number(v)) => Some(v),
        Some(Coord::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    };
    Ok(value.filter(|v| v.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_subtitle_prefers_locality() {
        let mut stop = Stop {
            id: "120385".into(),
            name: "Av. da Liberdade".into(),
            locality: Some("Amadora".into()),
            municipality_name: Some("Amadora (Mun.)".into()),
            lat: None,
            lon: None,
        };
        assert_eq!(stop.subtitle(), "Amadora");
        stop.locality = Some("  ".into());
        assert_eq!(stop.subtitle(), "Amadora (Mun.)");
        stop.municipality_name = None;
        assert_eq!(stop.subtitle(), NETWORK_NAME);
    }

    #[test]
    fn test_time_source_prefers_estimate() {
        let mut raw = RawArrival {
            line_id: "1523".into(),
            headsign: "Cacém".into(),
            scheduled_arrival: Some("10:00:00".into()),
            estimated_arrival: Some("10:03:00".into()),
            stop_id: "120385".into(),
            trip_id: "t1".into(),
        };
        assert_eq!(raw.time_source(), Some("10:03:00"));
        assert!(raw.has_estimate());

        raw.estimated_arrival = Some(String::new());
        assert_eq!(raw.time_source(), Some("10:00:00"));
        assert!(!raw.has_estimate());

        raw.scheduled_arrival = None;
        assert_eq!(raw.time_source(), None);
    }

    #[test]
    fn test_countdown_labels() {
        assert_eq!(Countdown::from_minutes(-1).to_string(), "now");
        assert_eq!(Countdown::from_minutes(0).to_string(), "now");
        assert_eq!(Countdown::from_minutes(7).to_string(), "7 min");
        assert_eq!(Countdown::from_minutes(59).to_string(), "59 min");
        assert_eq!(Countdown::from_minutes(60).to_string(), "+1h");
    }

    #[test]
    fn test_vehicle_coordinates_accept_strings_and_reject_garbage() {
        let json = r#"[
            {"id": "44|1200", "lat": 38.75, "lon": "-9.2", "speed": 31.5, "heading": 90,
             "line_id": "1523", "trip_id": "t", "pattern_id": "p", "timestamp": 1700000000},
            {"id": "44|1201", "lat": null, "lon": -9.1, "line_id": "1523"},
            {"id": "44|1202", "lat": "n/a", "lon": -9.1, "line_id": "1523"}
        ]"#;
        let vehicles: Vec<Vehicle> = serde_json::from_str(json).unwrap();
        assert_eq!(
            vehicles[0].position(),
            Some(GeoPoint { lat: 38.75, lon: -9.2 })
        );
        assert_eq!(vehicles[0].speed_kmh, Some(31.5));
        assert_eq!(vehicles[0].heading_degrees, Some(90.0));
        assert!(vehicles[1].position().is_none());
        assert!(vehicles[2].position().is_none());
    }

    #[test]
    fn test_bounds_covering_and_padding() {
        let points = [
            GeoPoint::new(38.70, -9.30).unwrap(),
            GeoPoint::new(38.80, -9.10).unwrap(),
        ];
        let b = Bounds::covering(points).unwrap();
        assert_eq!(b.south, 38.70);
        assert_eq!(b.north, 38.80);
        assert_eq!(b.west, -9.30);
        assert_eq!(b.east, -9.10);
        assert!(Bounds::covering(std::iter::empty()).is_none());

        let padded = b.padded(0.1, 0.0);
        assert!(padded.south < b.south && padded.north > b.north);
        assert!(points.iter().all(|p| padded.contains(*p)));

        let single = Bounds::covering([points[0]]).unwrap().padded(0.1, 0.01);
        assert!((single.north - single.south - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_line_color_serializes_as_hex() {
        let c = LineColor::rgb(0xEB, 0xBD, 0x02);
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"#EBBD02\"");
    }
}
