//! # pointsink-sdk
//!
//! Client SDK for writing typed records as time-series points to an
//! InfluxDB v2 compatible backend.
//!
//! Connecting a sink verifies the endpoint is healthy and provisions the
//! target organization and bucket on first use, so callers never write
//! into a container that does not exist. Records implement the
//! [`Record`] capability to declare their measurement and map their own
//! dimensions onto tags and fields; sends dispatch to a background task
//! and hand back a [`SendHandle`] the caller can await or drop.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pointsink_sdk::{Config, Point, PointSink, Record, SinkOptions};
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
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads INFLUXDB_URL, INFLUXDB_ORG, INFLUXDB_TOKEN, INFLUXDB_BUCKET.
//!     let config = Config::from_env()?;
//!     let sink = PointSink::connect(config, SinkOptions::default()).await?;
//!
//!     let reading = GaugeReading { station: "st-4".into(), level_m: 2.75 };
//!
//!     // Await the outcome...
//!     sink.send(&reading).wait().await?;
//!
//!     // ...or fire and forget; close() still drains it.
//!     drop(sink.send(&reading));
//!
//!     sink.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Fail-fast configuration**: every connection parameter comes from
//!   the environment and a missing one errors before any network call
//! - **Provision on first use**: absent organizations and buckets are
//!   created with an "expire never" retention rule, tolerating creation
//!   races from concurrent initializers
//! - **Explicit send outcomes**: every dispatch returns a handle that
//!   resolves to a result; fire-and-forget is the caller's explicit choice
//! - **Batched sends**: `send_many` encodes one point per record and
//!   submits them in a single write call

mod api;
mod config;
mod error;
mod writer;

#[cfg(test)]
mod testutil;

pub use config::{Config, ConfigBuilder, ENV_BUCKET, ENV_ORG, ENV_TOKEN, ENV_URL};
pub use error::SinkError;
pub use writer::{PointSink, SendHandle, SinkOptions};

// Re-export types for convenience
pub use pointsink_types::{lines, EncodeError, FieldValue, Point, Precision, Record};
