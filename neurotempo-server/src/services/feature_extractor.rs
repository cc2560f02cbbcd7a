//! Band-power feature extraction from tabular EEG recordings
//!
//! Two layouts are understood:
//! - Wide relative-power layout: any column whose header contains
//!   `{band}_rel_power`, one or more per band (usually one per channel).
//!   Row-wise means per band; the first row is the representative one.
//! - Per-channel PSD layout: `{ch}.psd_beta` / `{ch}.psd_gamma` for
//!   channels 0..8, summed across channels on the first row.
//!
//! Non-numeric or empty cells read as NaN and are zeroed before any mean or
//! sum, so a band with no usable data contributes 0.0 instead of NaN.

use crate::models::{Band, BandPowers};
use crate::services::score_engine::finite_or_zero;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Channel count of the per-channel PSD layout
pub const PSD_CHANNEL_COUNT: usize = 8;

#[derive(Debug, Error)]
pub enum FeatureError {
    /// Required columns or rows are absent
    #[error("Missing feature: {0}")]
    MissingFeature(String),

    /// The file could not be read as CSV
    #[error("Unreadable recording: {0}")]
    Unreadable(String),
}

impl From<csv::Error> for FeatureError {
    fn from(err: csv::Error) -> Self {
        FeatureError::Unreadable(err.to_string())
    }
}

/// Parsed EEG table: header names plus numeric cells
#[derive(Debug, Clone)]
pub struct EegTable {
    headers: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl EegTable {
    pub fn from_path(path: &Path) -> Result<Self, FeatureError> {
        let file = std::fs::File::open(path)
            .map_err(|e| FeatureError::Unreadable(format!("{}: {}", path.display(), e)))?;
        let table = Self::from_reader(file)?;
        debug!(
            path = %path.display(),
            columns = table.headers.len(),
            rows = table.rows.len(),
            "Loaded EEG table"
        );
        Ok(table)
    }

    /// Parse CSV with a header row; ragged rows are padded with NaN
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FeatureError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let mut row: Vec<f64> = record
                .iter()
                .map(|cell| cell.parse::<f64>().unwrap_or(f64::NAN))
                .collect();
            row.resize(headers.len(), f64::NAN);
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn columns_containing(&self, needle: &str) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.contains(needle))
            .map(|(i, _)| i)
            .collect()
    }

    fn cell(&self, row: usize, column: usize) -> f64 {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .copied()
            .map(finite_or_zero)
            .unwrap_or(0.0)
    }
}

/// Header fragment selecting a band's relative-power columns
fn rel_power_marker(band: Band) -> String {
    format!("{}_rel_power", band.name())
}

/// Row-wise mean of a band's relative-power columns
///
/// A band with no matching columns yields 0.0 for every row.
pub fn band_row_means(table: &EegTable, band: Band) -> Vec<f64> {
    let columns = table.columns_containing(&rel_power_marker(band));
    (0..table.row_count())
        .map(|row| {
            if columns.is_empty() {
                return 0.0;
            }
            let sum: f64 = columns.iter().map(|&c| table.cell(row, c)).sum();
            sum / columns.len() as f64
        })
        .collect()
}

/// Raw (unclipped) per-band means of the representative first row
pub fn relative_power_means(table: &EegTable) -> Result<BandPowers, FeatureError> {
    if table.row_count() == 0 {
        return Err(FeatureError::MissingFeature(
            "recording has no data rows".to_string(),
        ));
    }

    let any_band_column = Band::ALL
        .iter()
        .any(|&band| !table.columns_containing(&rel_power_marker(band)).is_empty());
    if !any_band_column {
        return Err(FeatureError::MissingFeature(
            "no *_rel_power columns found".to_string(),
        ));
    }

    let mut means = BandPowers::default();
    for band in Band::ALL {
        let first = band_row_means(table, band).first().copied().unwrap_or(0.0);
        means.set(band, first);
    }
    Ok(means)
}

/// Clip alpha/beta/theta to [0, 1]; coerce delta/gamma to finite values
pub fn normalize(means: &BandPowers) -> BandPowers {
    let clip = |v: f64| finite_or_zero(v).clamp(0.0, 1.0);
    BandPowers {
        delta: finite_or_zero(means.delta),
        theta: clip(means.theta),
        alpha: clip(means.alpha),
        beta: clip(means.beta),
        gamma: finite_or_zero(means.gamma),
    }
}

/// Extract normalized band means in one step
pub fn extract_band_summary(table: &EegTable) -> Result<BandPowers, FeatureError> {
    relative_power_means(table).map(|means| normalize(&means))
}

/// Beta and gamma power summed across PSD channels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSums {
    pub beta_sum: f64,
    pub gamma_sum: f64,
}

/// Sum `{ch}.psd_beta` and `{ch}.psd_gamma` over channels on the first row
pub fn channel_sums(table: &EegTable) -> Result<ChannelSums, FeatureError> {
    if table.row_count() == 0 {
        return Err(FeatureError::MissingFeature(
            "recording has no data rows".to_string(),
        ));
    }

    let mut sums = ChannelSums {
        beta_sum: 0.0,
        gamma_sum: 0.0,
    };
    for ch in 0..PSD_CHANNEL_COUNT {
        for (band, total) in [("beta", &mut sums.beta_sum), ("gamma", &mut sums.gamma_sum)] {
            let name = format!("{}.psd_{}", ch, band);
            let column = table
                .column_index(&name)
                .ok_or_else(|| FeatureError::MissingFeature(format!("column '{}'", name)))?;
            *total += table.cell(0, column);
        }
    }
    Ok(sums)
}
