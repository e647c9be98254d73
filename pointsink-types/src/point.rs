//! The wire-level point representation and its line-protocol encoding.
//!
//! Line protocol format:
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=val1,field2=val2 timestamp
//! ```
//!
//! See: <https://docs.influxdata.com/influxdb/v2/reference/syntax/line-protocol/>

use core::fmt;

use crate::FieldValue;

/// A single timestamped record in the wire format of the backend.
///
/// Points are constructed transiently per send call and handed to the
/// writer; nothing retains them afterwards.
///
/// # Example
///
/// ```rust
/// use pointsink_types::Point;
///
/// let point = Point::measurement("water_level")
///     .tag("station", "st-4")
///     .field("level_m", 2.75)
///     .timestamp_ms(1_700_000_000_000);
///
/// assert_eq!(
///     point.to_line().unwrap(),
///     "water_level,station=st-4 level_m=2.75 1700000000000"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    measurement: String,
    tags: Vec<(String, String)>,
    fields: Vec<(String, FieldValue)>,
    timestamp_ms: Option<i64>,
}

impl Point {
    /// Start a point under the given measurement name.
    pub fn measurement(name: impl Into<String>) -> Self {
        Self {
            measurement: name.into(),
            tags: Vec::new(),
            fields: Vec::new(),
            timestamp_ms: None,
        }
    }

    /// Add a tag. The value is stored as its display text.
    pub fn tag(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.tags.push((key.into(), value.to_string()));
        self
    }

    /// Add a tag whose value may be absent. An absent value is stored as
    /// empty text rather than dropping the tag.
    pub fn tag_opt(self, key: impl Into<String>, value: Option<impl fmt::Display>) -> Self {
        match value {
            Some(v) => self.tag(key, v),
            None => self.tag(key, ""),
        }
    }

    /// Add a field.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Set the timestamp in milliseconds since the Unix epoch.
    ///
    /// Without a timestamp the backend assigns its own receive time.
    pub fn timestamp_ms(mut self, ts: i64) -> Self {
        self.timestamp_ms = Some(ts);
        self
    }

    /// The measurement name.
    pub fn name(&self) -> &str {
        &self.measurement
    }

    /// The tag set, in insertion order.
    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }

    /// The field set, in insertion order.
    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    /// The timestamp, if one was set.
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp_ms
    }

    /// Encode this point as one line of line protocol.
    ///
    /// Tags are sorted by key for the canonical form. A point with no
    /// fields is rejected, since the backend refuses field-less lines.
    pub fn to_line(&self) -> Result<String, EncodeError> {
        if self.fields.is_empty() {
            return Err(EncodeError::NoFields(self.measurement.clone()));
        }

        let mut line = escape_measurement(&self.measurement);

        let mut sorted_tags: Vec<_> = self.tags.iter().collect();
        sorted_tags.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (key, value) in sorted_tags {
            line.push(',');
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&escape_key(value));
        }

        line.push(' ');

        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&value.to_line());
        }

        if let Some(ts) = self.timestamp_ms {
            line.push(' ');
            line.push_str(&ts.to_string());
        }

        Ok(line)
    }
}

/// Join many points into a single newline-delimited write body.
pub fn lines<'a>(points: impl IntoIterator<Item = &'a Point>) -> Result<String, EncodeError> {
    let encoded: Vec<String> = points
        .into_iter()
        .map(Point::to_line)
        .collect::<Result<_, _>>()?;
    Ok(encoded.join("\n"))
}

/// Errors that can occur while encoding points.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// The point has no fields (the backend requires at least one).
    NoFields(String),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::NoFields(m) => {
                write!(f, "point under measurement '{}' has no fields", m)
            }
        }
    }
}

impl std::error::Error for EncodeError {}

/// Escape a measurement name. Spaces and commas take a backslash.
fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

/// Escape a tag key, tag value, or field key. Commas, equals signs, and
/// spaces take a backslash.
fn escape_key(s: &str) -> String {
    s.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}
