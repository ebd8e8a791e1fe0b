//! Listeners that turn response notifications into analysis data.
//!
//! A collector listens to one response component. Observation-based
//! responses feed their values straight through; time-weighted ones are
//! first discretized into per-tick averages.
//!
//! - [`BatchingCollector`]: batch means within each replication, reset at
//!   warm-up, summarized by [`write_batch_csv`].
//! - [`WelchCollector`]: every observation of every replication, written
//!   to the Welch data and metadata files. Not reset at warm-up, since
//!   the data is what the warm-up is chosen from.

use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use cadence_core::{ComponentId, ListenerId, Phase};
use cadence_model::{Category, Listener, Model, Notification, NotificationKind};
use cadence_stats::{
    default_interval, BatchCsvWriter, BatchStatistic, BatchingConfig, Discretizer, StatType,
    StatsError,
};
use cadence_welch::{WelchError, WelchMetadata, WelchPaths, WelchWriter};
use tracing::{debug, error};

use crate::simulation::Simulation;

// ── CollectorError ──────────────────────────────────────────────

/// Errors from building or attaching a collector.
#[derive(Debug)]
pub enum CollectorError {
    /// Batching parameters were invalid.
    Stats(StatsError),
    /// A Welch file could not be created.
    Welch(WelchError),
    /// The source component does not exist.
    UnknownSource {
        /// The requested source.
        id: ComponentId,
    },
    /// The source component is not tagged as a response.
    NotAResponse {
        /// The requested source.
        id: ComponentId,
    },
    /// A time-weighted source needs a discretization interval and none
    /// could be derived (open horizon, no interval configured).
    NoInterval {
        /// The requested source.
        id: ComponentId,
    },
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stats(e) => write!(f, "batching: {e}"),
            Self::Welch(e) => write!(f, "welch: {e}"),
            Self::UnknownSource { id } => write!(f, "unknown source component {id}"),
            Self::NotAResponse { id } => write!(f, "component {id} is not a response"),
            Self::NoInterval { id } => write!(
                f,
                "time-weighted component {id} needs a discretization interval"
            ),
        }
    }
}

impl Error for CollectorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Stats(e) => Some(e),
            Self::Welch(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StatsError> for CollectorError {
    fn from(e: StatsError) -> Self {
        Self::Stats(e)
    }
}

impl From<WelchError> for CollectorError {
    fn from(e: WelchError) -> Self {
        Self::Welch(e)
    }
}

/// Discretizer that starts at the first value of each replication.
#[derive(Clone, Debug)]
struct Ticker {
    discretizer: Discretizer,
    started: bool,
}

impl Ticker {
    fn new(interval: f64) -> Result<Self, StatsError> {
        Ok(Self {
            discretizer: Discretizer::new(interval, 0.0, 0.0)?,
            started: false,
        })
    }

    fn value(&mut self, time: f64, value: f64, emit: impl FnMut(f64)) {
        if self.started {
            self.discretizer.update(time, value, emit);
        } else {
            self.discretizer.reset(time, value);
            self.started = true;
        }
    }

    fn finish(&mut self, time: f64, emit: impl FnMut(f64)) {
        if self.started {
            self.discretizer.advance_to(time, emit);
        }
    }
}

// ── BatchingCollector ───────────────────────────────────────────

/// Batch-means collector for one response.
#[derive(Clone, Debug)]
pub struct BatchingCollector {
    name: String,
    stat_type: StatType,
    ticker: Option<Ticker>,
    batches: BatchStatistic,
    replications: Vec<BatchStatistic>,
    ended: bool,
}

impl BatchingCollector {
    /// Collect an observation-based response.
    pub fn observations(
        name: impl Into<String>,
        config: BatchingConfig,
    ) -> Result<Self, StatsError> {
        Ok(Self {
            name: name.into(),
            stat_type: StatType::ResponseVariable,
            ticker: None,
            batches: BatchStatistic::new(config)?,
            replications: Vec::new(),
            ended: false,
        })
    }

    /// Collect a time-weighted response discretized every `interval`.
    pub fn time_weighted(
        name: impl Into<String>,
        config: BatchingConfig,
        interval: f64,
    ) -> Result<Self, StatsError> {
        Ok(Self {
            name: name.into(),
            stat_type: StatType::TimeWeighted,
            ticker: Some(Ticker::new(interval)?),
            batches: BatchStatistic::new(config)?,
            replications: Vec::new(),
            ended: false,
        })
    }

    /// The response's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Which kind of response is collected.
    pub fn stat_type(&self) -> StatType {
        self.stat_type
    }

    /// Batches of the replication in progress, or of the last completed
    /// one until the next replication reports.
    pub fn batch_statistic(&self) -> &BatchStatistic {
        &self.batches
    }

    /// Final batches of every completed replication.
    pub fn replications(&self) -> &[BatchStatistic] {
        &self.replications
    }
}

impl Listener for BatchingCollector {
    fn notify(&mut self, n: &Notification) {
        // Kept readable through the end phases until the next replication
        // starts reporting.
        let fresh = matches!(
            n.kind,
            NotificationKind::Value { .. } | NotificationKind::Entered(Phase::BeforeReplication)
        );
        if self.ended && fresh {
            self.batches.reset();
            self.ended = false;
        }
        let Self {
            ticker,
            batches,
            replications,
            ended,
            ..
        } = self;
        match n.kind {
            NotificationKind::Entered(Phase::WarmUp) => {
                batches.reset();
                if let Some(t) = ticker.as_mut().filter(|t| t.started) {
                    t.discretizer.restart(n.time);
                }
            }
            NotificationKind::Entered(Phase::ReplicationEnded) => {
                if let Some(t) = ticker {
                    t.finish(n.time, |x| batches.collect(x));
                    t.started = false;
                }
                replications.push(batches.clone());
                *ended = true;
            }
            NotificationKind::Value { value, .. } => match ticker {
                Some(t) => t.value(n.time, value, |x| batches.collect(x)),
                None => batches.collect(value),
            },
            NotificationKind::Entered(_) => {}
        }
    }
}

/// Write the batch-statistics CSV for the batching collectors attached to
/// `model` under `listeners`. Ids that are not batching collectors are
/// skipped.
pub fn write_batch_csv<W: Write>(
    model: &Model,
    listeners: &[ListenerId],
    writer: W,
) -> Result<W, StatsError> {
    let model_name = model.name_of(model.root()).unwrap_or_default();
    let mut csv = BatchCsvWriter::new(writer)?;
    for &id in listeners {
        if let Some(c) = model.listener::<BatchingCollector>(id) {
            csv.write_row(model_name, c.stat_type(), c.name(), c.batch_statistic())?;
        }
    }
    csv.into_inner()
}

// ── WelchCollector ──────────────────────────────────────────────

/// Writes one response's observations to its Welch files.
///
/// I/O failures are logged and retained; after the first failure the
/// collector stops writing and the replication carries on. Check
/// [`error()`](Self::error) after the run.
pub struct WelchCollector {
    name: String,
    paths: WelchPaths,
    interval: Option<f64>,
    ticker: Option<Ticker>,
    writer: Option<WelchWriter<BufWriter<File>>>,
    metadata: Option<WelchMetadata>,
    error: Option<WelchError>,
}

impl WelchCollector {
    /// Collect an observation-based response into `dir/<name>.wdf`.
    pub fn observations(
        dir: impl AsRef<Path>,
        name: impl Into<String>,
    ) -> Result<Self, CollectorError> {
        Self::build(dir.as_ref(), name.into(), None)
    }

    /// Collect a time-weighted response discretized every `interval`.
    pub fn time_weighted(
        dir: impl AsRef<Path>,
        name: impl Into<String>,
        interval: f64,
    ) -> Result<Self, CollectorError> {
        Self::build(dir.as_ref(), name.into(), Some(interval))
    }

    fn build(dir: &Path, name: String, interval: Option<f64>) -> Result<Self, CollectorError> {
        let ticker = interval.map(Ticker::new).transpose()?;
        let paths = WelchPaths::new(dir, &name);
        let writer = WelchWriter::create(&paths)?;
        Ok(Self {
            name,
            paths,
            interval,
            ticker,
            writer: Some(writer),
            metadata: None,
            error: None,
        })
    }

    /// The response's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the files go.
    pub fn paths(&self) -> &WelchPaths {
        &self.paths
    }

    /// The first I/O failure, if any.
    pub fn error(&self) -> Option<&WelchError> {
        self.error.as_ref()
    }

    /// Metadata written by [`finish()`](Self::finish).
    pub fn metadata(&self) -> Option<&WelchMetadata> {
        self.metadata.as_ref()
    }

    /// Flush the data file and write the metadata file. Runs on its own
    /// when the source enters after-experiment; later calls do nothing.
    pub fn finish(&mut self) {
        let Some(writer) = self.writer.take() else {
            return;
        };
        if self.error.is_some() {
            return;
        }
        match writer.finish(&self.paths) {
            Ok(metadata) => {
                debug!(
                    response = %self.name,
                    replications = metadata.replications(),
                    "Welch files written"
                );
                self.metadata = Some(metadata);
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, e: WelchError) {
        error!(response = %self.name, error = %e, "Welch data not written");
        self.error = Some(e);
    }

    fn end_replication(&mut self, time: f64) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let count = writer.current_count();
        let time_per_observation = match self.interval {
            Some(interval) => interval,
            // Replications start at time 0.
            None if count > 0 => time / count as f64,
            None => f64::NAN,
        };
        writer.end_replication(time_per_observation);
    }
}

/// Append `x`, recording the first failure.
fn write_observation(
    writer: &mut Option<WelchWriter<BufWriter<File>>>,
    failure: &mut Option<WelchError>,
    x: f64,
) {
    if failure.is_some() {
        return;
    }
    if let Some(w) = writer {
        if let Err(e) = w.write_observation(x) {
            *failure = Some(e);
        }
    }
}

impl Listener for WelchCollector {
    fn notify(&mut self, n: &Notification) {
        let mut failure = None;
        match n.kind {
            NotificationKind::Value { value, .. } => {
                let writer = &mut self.writer;
                match &mut self.ticker {
                    Some(t) => {
                        t.value(n.time, value, |x| write_observation(writer, &mut failure, x))
                    }
                    None => write_observation(writer, &mut failure, value),
                }
            }
            NotificationKind::Entered(Phase::ReplicationEnded) => {
                let writer = &mut self.writer;
                if let Some(t) = &mut self.ticker {
                    t.finish(n.time, |x| write_observation(writer, &mut failure, x));
                    t.started = false;
                }
                self.end_replication(n.time);
            }
            NotificationKind::Entered(Phase::AfterExperiment) => self.finish(),
            NotificationKind::Entered(_) => {}
        }
        if let Some(e) = failure {
            self.fail(e);
            self.writer = None;
        }
    }
}

// ── Attaching ───────────────────────────────────────────────────

impl Simulation {
    /// Attach a [`BatchingCollector`] to the response `source`.
    ///
    /// Time-weighted responses use `config.interval`, or the default rule
    /// over this experiment's replication length and warm-up.
    pub fn attach_batching(
        &mut self,
        source: ComponentId,
        config: BatchingConfig,
    ) -> Result<ListenerId, CollectorError> {
        let (name, category) = response(self.model(), source)?;
        let collector = if category == Category::TimeWeighted {
            let experiment = self.config();
            let interval = config
                .resolve_interval(experiment.replication_length, experiment.warm_up_length)
                .ok_or(CollectorError::NoInterval { id: source })?;
            BatchingCollector::time_weighted(name, config, interval)?
        } else {
            BatchingCollector::observations(name, config)?
        };
        Ok(self.model_mut().attach_listener(Some(source), collector))
    }

    /// Attach a [`WelchCollector`] writing to `dir` for the response
    /// `source`.
    ///
    /// Time-weighted responses use `interval`, or the default rule over
    /// the whole replication.
    pub fn attach_welch(
        &mut self,
        source: ComponentId,
        dir: impl AsRef<Path>,
        interval: Option<f64>,
    ) -> Result<ListenerId, CollectorError> {
        let (name, category) = response(self.model(), source)?;
        let collector = if category == Category::TimeWeighted {
            let interval = interval
                .or_else(|| default_interval(self.config().replication_length, 0.0))
                .ok_or(CollectorError::NoInterval { id: source })?;
            WelchCollector::time_weighted(dir, name, interval)?
        } else {
            WelchCollector::observations(dir, name)?
        };
        Ok(self.model_mut().attach_listener(Some(source), collector))
    }
}

fn response(model: &Model, id: ComponentId) -> Result<(String, Category), CollectorError> {
    let name = model
        .name_of(id)
        .ok_or(CollectorError::UnknownSource { id })?;
    match model.category(id) {
        Some(category) if category.is_response() => Ok((name.to_string(), category)),
        _ => Err(CollectorError::NotAResponse { id }),
    }
}
