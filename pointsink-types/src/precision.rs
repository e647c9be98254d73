//! Timestamp precision for the write API.

/// The unit the backend should interpret point timestamps in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Precision {
    /// Nanoseconds since the Unix epoch.
    Nanoseconds,
    /// Microseconds since the Unix epoch.
    Microseconds,
    /// Milliseconds since the Unix epoch. The SDK writes at this precision.
    #[default]
    Milliseconds,
    /// Seconds since the Unix epoch.
    Seconds,
}

impl Precision {
    /// The value the write endpoint expects in its `precision` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Nanoseconds => "ns",
            Precision::Microseconds => "us",
            Precision::Milliseconds => "ms",
            Precision::Seconds => "s",
        }
    }
}
