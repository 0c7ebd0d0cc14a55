use crate::config::Config;
use crate::reducer::{Reducer, ReducerKind, Reduction};
use crate::series::{Series, load_series_file};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Reductions of a single series.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesReport {
    pub name: String,
    pub tags: BTreeMap<String, String>,
    pub count: usize,
    pub results: BTreeMap<ReducerKind, Reduction>,
}

/// Collects the configured reductions of every series added to it.
pub struct Reporter {
    cfg: Config,
    reducer_vec: Vec<Reducer>,
    report_vec: Vec<SeriesReport>,
}

impl Reporter {
    pub fn new(cfg: Config) -> Self {
        let reducer_vec = cfg.reducer.modes.iter().copied().map(Reducer::new).collect();
        Self {
            cfg,
            reducer_vec,
            report_vec: Vec::new(),
        }
    }

    /// Reduce a series with every configured reducer.
    ///
    /// # Errors
    /// Returns an error if the series holds more samples than allowed.
    pub fn add_series(&mut self, series: &Series) -> Result<()> {
        let report = self.reduce_series(series)?;
        self.report_vec.push(report);
        Ok(())
    }

    fn reduce_series(&self, series: &Series) -> Result<SeriesReport> {
        let max_samples = self.cfg.input.max_samples;
        if series.len() > max_samples {
            bail!(
                "series {:?} has {} samples, but at most {max_samples} are allowed",
                series.name,
                series.len()
            );
        }

        let results = self
            .reducer_vec
            .iter()
            .map(|reducer| (reducer.kind(), reducer.reduce(series)))
            .collect();

        Ok(SeriesReport {
            name: series.name.clone(),
            tags: series.tags.clone(),
            count: series.len(),
            results,
        })
    }

    /// Reduce every series stored in a file.
    ///
    /// Either every series of the file is added or none is.
    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let series_vec = load_series_file(file).context("failed to load series")?;

        let report_vec = series_vec
            .iter()
            .map(|series| self.reduce_series(series))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("failed to reduce series from {file:?}"))?;

        self.report_vec.extend(report_vec);
        log::info!("reduced {} series from {file:?}", series_vec.len());
        Ok(())
    }

    pub fn reports(&self) -> &[SeriesReport] {
        &self.report_vec
    }

    pub fn write_results<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &self.report_vec)
            .context("failed to serialize reports")?;
        Ok(())
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        self.write_results(&mut writer)?;

        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}
