//! Time series data types.

use anyhow::{Context, Result, bail};
use rmp_serde::decode;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

/// Single point of a time series.
///
/// The value may be absent (`None`), which is distinct from zero.
/// Serialized as the two-element array `[value, timestamp]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Option<f64>, i64)", into = "(Option<f64>, i64)")]
pub struct Sample {
    /// Measured value, or `None` if the point is null.
    pub value: Option<f64>,

    /// Opaque ordering metadata.
    pub timestamp: i64,
}

impl Sample {
    /// Create a new sample with a given value and timestamp.
    pub fn new(value: Option<f64>, timestamp: i64) -> Self {
        Self { value, timestamp }
    }

    /// Create a null sample at a given timestamp.
    pub fn null(timestamp: i64) -> Self {
        Self::new(None, timestamp)
    }
}

impl From<(Option<f64>, i64)> for Sample {
    fn from((value, timestamp): (Option<f64>, i64)) -> Self {
        Self::new(value, timestamp)
    }
}

impl From<Sample> for (Option<f64>, i64) {
    fn from(sample: Sample) -> Self {
        (sample.value, sample.timestamp)
    }
}

/// Ordered sequence of samples.
///
/// Points are kept in the order they were supplied; nothing re-sorts them by timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Name of the series.
    pub name: String,

    /// Descriptive labels of the series.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Samples in chronological order.
    #[serde(default)]
    pub points: Vec<Sample>,
}

impl Series {
    /// Create a new empty series with a given name.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a series from values, assigning timestamps `0, 1, 2, ...` in order.
    pub fn from_values<S, I>(name: S, values: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut series = Self::new(name);
        for (idx, value) in values.into_iter().enumerate() {
            series.push(Sample::new(value, idx as i64));
        }
        series
    }

    /// Append a sample at the end of the series.
    pub fn push(&mut self, sample: Sample) {
        self.points.push(sample);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Sample] {
        &self.points
    }

    /// Iterate over the non-null values, preserving their order.
    pub fn non_null_values(&self) -> impl DoubleEndedIterator<Item = f64> + '_ {
        self.points.iter().filter_map(|sample| sample.value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeriesFile {
    One(Series),
    Many(Vec<Series>),
}

impl From<SeriesFile> for Vec<Series> {
    fn from(file: SeriesFile) -> Self {
        match file {
            SeriesFile::One(series) => vec![series],
            SeriesFile::Many(series_vec) => series_vec,
        }
    }
}

/// Load every series stored in a file.
///
/// The file may hold a single series or an array of series,
/// encoded as JSON (`.json`) or MessagePack (`.msgpack`).
///
/// # Errors
/// Returns an error if the file cannot be opened, has an unsupported
/// extension, or cannot be deserialized.
pub fn load_series_file<P: AsRef<Path>>(file: P) -> Result<Vec<Series>> {
    let path = file.as_ref();
    let ext = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    let file = File::open(path).with_context(|| format!("failed to open {path:?}"))?;
    let reader = BufReader::new(file);

    let series_file: SeriesFile = match ext {
        "json" => serde_json::from_reader(reader)
            .with_context(|| format!("failed to deserialize {path:?} as JSON"))?,
        "msgpack" => decode::from_read(reader)
            .with_context(|| format!("failed to deserialize {path:?} as MessagePack"))?,
        _ => bail!("unsupported series file extension {ext:?}, expected \"json\" or \"msgpack\""),
    };

    let series_vec: Vec<Series> = series_file.into();
    log::debug!("loaded {} series from {path:?}", series_vec.len());

    Ok(series_vec)
}
