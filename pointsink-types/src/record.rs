//! The record capability: how a typed value maps onto a point.

use crate::Point;

/// A typed value whose dimensions can be recorded as a point.
///
/// A record declares its measurement name and maps its own fields onto
/// tags, fields, and an optional timestamp. The mapping is explicit: the
/// type decides at compile time which dimensions are indexed (tags) and
/// which carry data (fields), instead of any runtime inspection.
///
/// # Example
///
/// ```rust
/// use pointsink_types::{Point, Record};
///
/// struct GaugeReading {
///     station: String,
///     level_m: f64,
///     operator: Option<String>,
/// }
///
/// impl Record for GaugeReading {
///     fn measurement(&self) -> &str {
///         "water_level"
///     }
///
///     fn encode(&self, point: Point) -> Point {
///         point
///             .tag("station", &self.station)
///             .tag_opt("operator", self.operator.as_ref())
///             .field("level_m", self.level_m)
///     }
/// }
///
/// let reading = GaugeReading {
///     station: "st-4".into(),
///     level_m: 2.75,
///     operator: None,
/// };
/// let point = reading.to_point();
/// assert_eq!(point.name(), "water_level");
/// assert_eq!(point.tags().len(), 2);
/// ```
pub trait Record {
    /// The measurement this record's points are written under.
    fn measurement(&self) -> &str;

    /// Map this record's dimensions onto the point under construction.
    fn encode(&self, point: Point) -> Point;

    /// Convert this record into a point under its own measurement.
    fn to_point(&self) -> Point {
        self.encode(Point::measurement(self.measurement()))
    }
}
