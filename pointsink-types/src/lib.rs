//! # pointsink-types
//!
//! Core types for the pointsink time-series SDK: the wire-level [`Point`]
//! representation, line-protocol encoding, field values, write precision,
//! and the [`Record`] capability that maps a typed value onto a point.
//!
//! ## Design Goals
//!
//! - **Explicit mapping**: a record type declares which of its dimensions
//!   are tags, which are fields, and where its timestamp comes from — no
//!   runtime inspection
//! - **Optional serialization**: enable the `serde` feature when points or
//!   values need to cross a process boundary
//! - **Canonical encoding**: tags sort by key and special characters are
//!   escaped per the line-protocol rules, so identical points encode
//!   identically
//!
//! ## Example
//!
//! ```rust
//! use pointsink_types::{Point, Record};
//!
//! struct GaugeReading {
//!     station: String,
//!     level_m: f64,
//! }
//!
//! impl Record for GaugeReading {
//!     fn measurement(&self) -> &str {
//!         "water_level"
//!     }
//!
//!     fn encode(&self, point: Point) -> Point {
//!         point.tag("station", &self.station).field("level_m", self.level_m)
//!     }
//! }
//!
//! let point = GaugeReading { station: "st-4".into(), level_m: 2.75 }.to_point();
//! assert_eq!(point.to_line().unwrap(), "water_level,station=st-4 level_m=2.75");
//! ```

mod point;
mod precision;
mod record;
mod value;

pub use point::{lines, EncodeError, Point};
pub use precision::Precision;
pub use record::Record;
pub use value::FieldValue;
