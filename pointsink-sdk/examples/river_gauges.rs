//! Send a handful of river gauge readings to a backend configured via
//! the environment.
//!
//! ```sh
//! export INFLUXDB_URL=http://localhost:8086
//! export INFLUXDB_ORG=hydrology
//! export INFLUXDB_TOKEN=dev-token
//! export INFLUXDB_BUCKET=river-gauges
//! cargo run --example river_gauges
//! ```

use pointsink_sdk::{Config, Point, PointSink, Record, SinkOptions};

struct GaugeReading {
    station: &'static str,
    level_m: f64,
    operator: Option<&'static str>,
}

impl Record for GaugeReading {
    fn measurement(&self) -> &str {
        "water_level"
    }

    fn encode(&self, point: Point) -> Point {
        point
            .tag("station", self.station)
            .tag_opt("operator", self.operator)
            .field("level_m", self.level_m)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let sink = PointSink::connect(config, SinkOptions::default()).await?;

    // One reading, awaited.
    let reading = GaugeReading {
        station: "st-4",
        level_m: 2.75,
        operator: Some("night-shift"),
    };
    sink.send(&reading).wait().await?;
    println!("sent one reading");

    // A batch, submitted in a single write call.
    let batch = vec![
        GaugeReading {
            station: "st-1",
            level_m: 1.12,
            operator: None,
        },
        GaugeReading {
            station: "st-2",
            level_m: 0.97,
            operator: None,
        },
        GaugeReading {
            station: "st-3",
            level_m: 1.48,
            operator: Some("day-shift"),
        },
    ];
    sink.send_many(&batch).wait().await?;
    println!("sent {} readings in one batch", batch.len());

    sink.close().await;
    Ok(())
}
