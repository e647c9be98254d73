//! The point sink: connect-time provisioning, send dispatch, and disposal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use pointsink_types::{lines, Point, Precision, Record};

use crate::api::InfluxApi;
use crate::{Config, SinkError};

/// Options for constructing a [`PointSink`].
#[derive(Debug, Clone)]
pub struct SinkOptions {
    /// Gzip write bodies before sending.
    pub gzip: bool,
    /// Timeout applied to every HTTP call, the health probe included.
    pub timeout: Duration,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            gzip: false,
            timeout: Duration::from_secs(10),
        }
    }
}

/// A writer for one organization/bucket pair.
///
/// Constructing a sink verifies connectivity and guarantees the target
/// organization and bucket exist before the first point is written. Send
/// operations dispatch to a background task and return a [`SendHandle`];
/// the caller decides whether to await it or drop it.
///
/// # Example
///
/// ```rust,no_run
/// use pointsink_sdk::{Config, PointSink, Record, SinkOptions};
/// use pointsink_sdk::Point;
///
/// struct GaugeReading {
///     station: String,
///     level_m: f64,
/// }
///
/// impl Record for GaugeReading {
///     fn measurement(&self) -> &str {
///         "water_level"
///     }
///
///     fn encode(&self, point: Point) -> Point {
///         point.tag("station", &self.station).field("level_m", self.level_m)
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let sink = PointSink::connect(Config::from_env()?, SinkOptions::default()).await?;
///
///     let reading = GaugeReading { station: "st-4".into(), level_m: 2.75 };
///     sink.send(&reading).wait().await?;
///
///     sink.close().await;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct PointSink {
    api: Arc<InfluxApi>,
    org: String,
    bucket: String,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl PointSink {
    /// Connect and provision.
    ///
    /// Probes the endpoint's health, then ensures the configured
    /// organization and bucket exist, creating them on first use. The
    /// bucket is created with an "expire never" retention rule. Any
    /// failure aborts construction; no partial state escapes.
    ///
    /// Creation tolerates losing a race against another process
    /// provisioning the same names: an "already exists" rejection is
    /// followed by a re-fetch instead of an error.
    pub async fn connect(config: Config, options: SinkOptions) -> Result<Self, SinkError> {
        let api = InfluxApi::new(&config, options.gzip, options.timeout)?;

        api.health().await?;

        let org = match api.find_org(&config.org).await? {
            Some(org) => org,
            None => {
                info!(org = %config.org, "organization absent, creating");
                match api.create_org(&config.org).await? {
                    Some(org) => org,
                    None => api.find_org(&config.org).await?.ok_or_else(|| {
                        SinkError::Provision(format!(
                            "organization '{}' still absent after create",
                            config.org
                        ))
                    })?,
                }
            }
        };

        if api.find_bucket(&org.id, &config.bucket).await?.is_none() {
            info!(bucket = %config.bucket, "bucket absent, creating");
            if api.create_bucket(&org.id, &config.bucket).await?.is_none()
                && api.find_bucket(&org.id, &config.bucket).await?.is_none()
            {
                return Err(SinkError::Provision(format!(
                    "bucket '{}' still absent after create",
                    config.bucket
                )));
            }
        }

        Ok(Self {
            api: Arc::new(api),
            org: config.org,
            bucket: config.bucket,
            in_flight: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Send one record as one point under its declared measurement.
    pub fn send<R: Record>(&self, record: &R) -> SendHandle {
        self.dispatch(vec![record.to_point()])
    }

    /// Send one record under an overridden measurement name.
    pub fn send_as<R: Record>(&self, measurement: &str, record: &R) -> SendHandle {
        self.dispatch(vec![record.encode(Point::measurement(measurement))])
    }

    /// Send many records in a single batched write, one point per record.
    pub fn send_many<'a, R, I>(&self, records: I) -> SendHandle
    where
        R: Record + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        self.dispatch(records.into_iter().map(Record::to_point).collect())
    }

    /// Send many records in a single batched write under a shared
    /// measurement name.
    pub fn send_many_as<'a, R, I>(&self, measurement: &str, records: I) -> SendHandle
    where
        R: Record + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        self.dispatch(
            records
                .into_iter()
                .map(|r| r.encode(Point::measurement(measurement)))
                .collect(),
        )
    }

    /// The organization this sink writes to.
    pub fn org(&self) -> &str {
        &self.org
    }

    /// The bucket this sink writes to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Drain in-flight sends and mark the sink closed.
    ///
    /// Subsequent sends resolve to [`SinkError::Closed`] without touching
    /// the network. Closing an already-closed sink is a no-op. The HTTP
    /// connection pool itself is released when the sink is dropped.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let drained: Vec<JoinHandle<()>> = std::mem::take(&mut *self.in_flight.lock());
        for handle in drained {
            if let Err(e) = handle.await {
                warn!("send task failed during close: {e}");
            }
        }
    }

    /// Encode up front and hand the write to a background task. A point
    /// that fails to encode costs no network call.
    fn dispatch(&self, points: Vec<Point>) -> SendHandle {
        if self.closed.load(Ordering::SeqCst) {
            return SendHandle::resolved(Err(SinkError::Closed));
        }
        if points.is_empty() {
            return SendHandle::resolved(Ok(()));
        }

        let body = match lines(&points) {
            Ok(body) => body,
            Err(e) => return SendHandle::resolved(Err(e.into())),
        };

        let (tx, rx) = oneshot::channel();
        let api = self.api.clone();
        let org = self.org.clone();
        let bucket = self.bucket.clone();
        let handle = tokio::spawn(async move {
            let result = api
                .write(&org, &bucket, Precision::Milliseconds, body)
                .await;
            if let Err(e) = &result {
                warn!("point write failed: {e}");
            }
            let _ = tx.send(result);
        });

        let mut in_flight = self.in_flight.lock();
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);

        SendHandle { rx }
    }
}

/// Completion handle for a dispatched send.
///
/// Await the outcome with [`wait`](SendHandle::wait), or drop the handle
/// to let the send run fire-and-forget; the task keeps running either way
/// and [`PointSink::close`] still drains it.
#[derive(Debug)]
pub struct SendHandle {
    rx: oneshot::Receiver<Result<(), SinkError>>,
}

impl SendHandle {
    /// Wait for the send to finish.
    pub async fn wait(self) -> Result<(), SinkError> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(SinkError::Task("send task dropped its result".to_string())),
        }
    }

    fn resolved(result: Result<(), SinkError>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubServer;
    use pointsink_types::EncodeError;

    struct GaugeReading {
        station: String,
        level_m: f64,
        operator: Option<String>,
    }

    impl Record for GaugeReading {
        fn measurement(&self) -> &str {
            "water_level"
        }

        fn encode(&self, point: Point) -> Point {
            point
                .tag("station", &self.station)
                .tag_opt("operator", self.operator.as_ref())
                .field("level_m", self.level_m)
        }
    }

    struct TagOnly;

    impl Record for TagOnly {
        fn measurement(&self) -> &str {
            "tag_only"
        }

        fn encode(&self, point: Point) -> Point {
            point.tag("kind", "empty")
        }
    }

    fn reading(station: &str, level_m: f64) -> GaugeReading {
        GaugeReading {
            station: station.to_string(),
            level_m,
            operator: None,
        }
    }

    fn config_for(server: &StubServer) -> Config {
        Config::builder()
            .url(server.url())
            .org("hydrology")
            .token("token-123")
            .bucket("river-gauges")
            .build()
            .unwrap()
    }

    /// Health passes, org and bucket both already exist.
    fn provisioned() -> Vec<(u16, String)> {
        vec![
            (200, r#"{"status":"pass"}"#.to_string()),
            (200, r#"{"orgs":[{"id":"org1","name":"hydrology"}]}"#.to_string()),
            (
                200,
                r#"{"buckets":[{"id":"bkt1","name":"river-gauges"}]}"#.to_string(),
            ),
        ]
    }

    async fn connected(server: &StubServer) -> PointSink {
        PointSink::connect(config_for(server), SinkOptions::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn connect_succeeds_when_org_and_bucket_exist() {
        let server = StubServer::start(provisioned()).await;
        let sink = connected(&server).await;

        assert_eq!(sink.org(), "hydrology");
        assert_eq!(sink.bucket(), "river-gauges");

        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].line.starts_with("GET /health"));
        assert!(requests[1].line.starts_with("GET /api/v2/orgs"));
        assert!(requests[2].line.starts_with("GET /api/v2/buckets"));
    }

    #[tokio::test]
    async fn connect_performs_no_create_when_both_exist() {
        let server = StubServer::start(provisioned()).await;
        connected(&server).await;

        let posts = server
            .requests()
            .iter()
            .filter(|r| r.line.starts_with("POST"))
            .count();
        assert_eq!(posts, 0);
    }

    #[tokio::test]
    async fn failed_health_probe_stops_before_provisioning() {
        let server = StubServer::start(vec![(
            200,
            r#"{"status":"fail","message":"store unavailable"}"#.to_string(),
        )])
        .await;

        let err = PointSink::connect(config_for(&server), SinkOptions::default())
            .await
            .unwrap_err();
        match err {
            SinkError::Unhealthy(msg) => assert_eq!(msg, "store unavailable"),
            other => panic!("expected Unhealthy, got {:?}", other),
        }

        // Only the health probe ever reached the wire.
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_connectivity_error() {
        let config = Config::builder()
            .url("http://127.0.0.1:9")
            .org("o")
            .token("t")
            .bucket("b")
            .build()
            .unwrap();
        let options = SinkOptions {
            timeout: Duration::from_millis(500),
            ..SinkOptions::default()
        };

        match PointSink::connect(config, options).await.unwrap_err() {
            SinkError::Connectivity(_) | SinkError::Timeout => {}
            other => panic!("expected a connectivity error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn connect_creates_missing_org_and_bucket_once() {
        let server = StubServer::start(vec![
            (200, r#"{"status":"pass"}"#.to_string()),
            (200, r#"{"orgs":[]}"#.to_string()),
            (201, r#"{"id":"org1","name":"hydrology"}"#.to_string()),
            (200, r#"{"buckets":[]}"#.to_string()),
            (201, r#"{"id":"bkt1","name":"river-gauges"}"#.to_string()),
        ])
        .await;

        connected(&server).await;

        let requests = server.requests();
        assert_eq!(requests.len(), 5);

        let org_creates: Vec<_> = requests
            .iter()
            .filter(|r| r.line.starts_with("POST /api/v2/orgs"))
            .collect();
        assert_eq!(org_creates.len(), 1);

        let bucket_creates: Vec<_> = requests
            .iter()
            .filter(|r| r.line.starts_with("POST /api/v2/buckets"))
            .collect();
        assert_eq!(bucket_creates.len(), 1);
        assert!(bucket_creates[0].body.contains("\"everySeconds\":2147483647"));
    }

    #[tokio::test]
    async fn connect_tolerates_losing_the_org_creation_race() {
        let server = StubServer::start(vec![
            (200, r#"{"status":"pass"}"#.to_string()),
            (200, r#"{"orgs":[]}"#.to_string()),
            (
                422,
                r#"{"code":"unprocessable entity","message":"organization name already taken"}"#
                    .to_string(),
            ),
            (200, r#"{"orgs":[{"id":"org1","name":"hydrology"}]}"#.to_string()),
            (
                200,
                r#"{"buckets":[{"id":"bkt1","name":"river-gauges"}]}"#.to_string(),
            ),
        ])
        .await;

        let sink = connected(&server).await;
        assert_eq!(sink.org(), "hydrology");
    }

    #[tokio::test]
    async fn send_writes_one_point_under_the_declared_measurement() {
        let mut responses = provisioned();
        responses.push((204, String::new()));
        let server = StubServer::start(responses).await;
        let sink = connected(&server).await;

        sink.send(&reading("st-4", 2.75)).wait().await.unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests[3].line.starts_with("POST /api/v2/write?"));
        assert_eq!(
            requests[3].body,
            "water_level,operator=,station=st-4 level_m=2.75"
        );
    }

    #[tokio::test]
    async fn send_as_overrides_the_measurement() {
        let mut responses = provisioned();
        responses.push((204, String::new()));
        let server = StubServer::start(responses).await;
        let sink = connected(&server).await;

        sink.send_as("water_archive", &reading("st-4", 2.75))
            .wait()
            .await
            .unwrap();

        let requests = server.requests();
        assert!(requests[3].body.starts_with("water_archive,"));
    }

    #[tokio::test]
    async fn send_many_batches_points_from_their_own_records() {
        let mut responses = provisioned();
        responses.push((204, String::new()));
        let server = StubServer::start(responses).await;
        let sink = connected(&server).await;

        let batch = vec![
            reading("st-1", 1.0),
            reading("st-2", 2.0),
            reading("st-3", 3.0),
        ];
        sink.send_many(&batch).wait().await.unwrap();

        let requests = server.requests();
        // All three points travel in one write call.
        assert_eq!(requests.len(), 4);

        let body_lines: Vec<&str> = requests[3].body.lines().collect();
        assert_eq!(body_lines.len(), 3);
        assert!(body_lines[0].contains("station=st-1"));
        assert!(body_lines[0].contains("level_m=1"));
        assert!(body_lines[1].contains("station=st-2"));
        assert!(body_lines[2].contains("station=st-3"));
    }

    #[tokio::test]
    async fn empty_batch_is_a_local_no_op() {
        let server = StubServer::start(provisioned()).await;
        let sink = connected(&server).await;

        let batch: Vec<GaugeReading> = Vec::new();
        sink.send_many(&batch).wait().await.unwrap();

        assert_eq!(server.requests().len(), 3);
    }

    #[tokio::test]
    async fn field_less_point_resolves_without_a_network_call() {
        let server = StubServer::start(provisioned()).await;
        let sink = connected(&server).await;

        let err = sink.send(&TagOnly).wait().await.unwrap_err();
        match err {
            SinkError::Encode(EncodeError::NoFields(m)) => assert_eq!(m, "tag_only"),
            other => panic!("expected Encode, got {:?}", other),
        }

        assert_eq!(server.requests().len(), 3);
    }

    #[tokio::test]
    async fn failed_write_surfaces_through_the_handle() {
        let mut responses = provisioned();
        responses.push((
            400,
            r#"{"code":"invalid","message":"unable to parse points"}"#.to_string(),
        ));
        let server = StubServer::start(responses).await;
        let sink = connected(&server).await;

        match sink.send(&reading("st-4", 2.75)).wait().await.unwrap_err() {
            SinkError::Api { status, .. } => assert_eq!(status, 400),
            other => panic!("expected Api, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn close_drains_in_flight_sends() {
        let mut responses = provisioned();
        responses.push((204, String::new()));
        let server = StubServer::start(responses).await;
        let sink = connected(&server).await;

        // Fire and forget, then close: the point must still reach the wire.
        drop(sink.send(&reading("st-4", 2.75)));
        sink.close().await;

        let requests = server.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests[3].line.starts_with("POST /api/v2/write?"));
    }

    #[tokio::test]
    async fn send_after_close_is_rejected_locally() {
        let server = StubServer::start(provisioned()).await;
        let sink = connected(&server).await;

        sink.close().await;
        match sink.send(&reading("st-4", 2.75)).wait().await.unwrap_err() {
            SinkError::Closed => {}
            other => panic!("expected Closed, got {:?}", other),
        }

        assert_eq!(server.requests().len(), 3);
    }

    #[tokio::test]
    async fn close_twice_is_a_no_op() {
        let server = StubServer::start(provisioned()).await;
        let sink = connected(&server).await;

        sink.close().await;
        sink.close().await;
    }

    #[tokio::test]
    async fn default_options() {
        let options = SinkOptions::default();
        assert!(!options.gzip);
        assert_eq!(options.timeout, Duration::from_secs(10));
    }
}
