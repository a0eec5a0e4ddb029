//! Indicator calculator.
//!
//! Every rolling value is computed over the trailing `window` observations and is
//! `None` when fewer observations exist. Missing history is never reported as zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Observation, ROUND_LOT};

/// Errors raised by indicators that have no meaningful "missing" value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndicatorError {
    #[error("data unavailable: {required} observations required, {available} available")]
    DataUnavailable { required: usize, available: usize },
    #[error("previous close is zero; percent change is undefined")]
    ZeroPreviousClose,
}

/// Window lengths used to build an [`IndicatorSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub volume_windows: Vec<usize>,
    pub close_windows: Vec<usize>,
    /// Short and long close-average windows whose midpoint is the suggested price.
    pub suggested_windows: (usize, usize),
    pub lot_size: u64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            volume_windows: vec![2, 5, 10, 20],
            close_windows: vec![5, 10, 20],
            suggested_windows: (10, 20),
            lot_size: ROUND_LOT,
        }
    }
}

impl IndicatorConfig {
    /// Longest window referenced by this configuration.
    pub fn longest_window(&self) -> usize {
        self.volume_windows
            .iter()
            .chain(self.close_windows.iter())
            .copied()
            .chain([self.suggested_windows.0, self.suggested_windows.1])
            .max()
            .unwrap_or(0)
    }
}

/// Percentage change between the last two closes.
pub fn percent_change(observations: &[Observation]) -> Result<f64, IndicatorError> {
    let [.., previous, latest] = observations else {
        return Err(IndicatorError::DataUnavailable {
            required: 2,
            available: observations.len(),
        });
    };

    if previous.close == 0.0 {
        return Err(IndicatorError::ZeroPreviousClose);
    }

    Ok((latest.close - previous.close) / previous.close * 100.0)
}

/// Mean of the trailing `window` volumes, expressed in lots of `lot_size` shares.
pub fn rolling_volume_avg(observations: &[Observation], window: usize, lot_size: u64) -> Option<f64> {
    let trailing = trailing(observations, window)?;
    let lot_size = lot_size.max(1) as f64;
    let total = trailing
        .iter()
        .map(|observation| observation.volume as f64 / lot_size)
        .sum::<f64>();
    Some(total / window as f64)
}

/// Mean of the trailing `window` closing prices.
pub fn rolling_close_avg(observations: &[Observation], window: usize) -> Option<f64> {
    let trailing = trailing(observations, window)?;
    let total = trailing.iter().map(|observation| observation.close).sum::<f64>();
    Some(total / window as f64)
}

/// Midpoint of the `short` and `long` close averages.
///
/// This is a heuristic reference level, not a price target or a recommendation.
pub fn suggested_price(observations: &[Observation], short: usize, long: usize) -> Option<f64> {
    let short_avg = rolling_close_avg(observations, short)?;
    let long_avg = rolling_close_avg(observations, long)?;
    Some((short_avg + long_avg) / 2.0)
}

fn trailing(observations: &[Observation], window: usize) -> Option<&[Observation]> {
    if window == 0 || observations.len() < window {
        return None;
    }
    Some(&observations[observations.len() - window..])
}

/// Indicators derived from one observation sequence. Recomputed per request, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub observation_count: usize,
    pub latest_close: Option<f64>,
    pub percent_change: Option<f64>,
    /// Window length → trailing average volume in lots.
    pub volume_avg: BTreeMap<usize, Option<f64>>,
    /// Window length → trailing average close.
    pub close_avg: BTreeMap<usize, Option<f64>>,
    /// Indicative only; see [`suggested_price`].
    pub suggested_price: Option<f64>,
}

impl IndicatorSet {
    pub fn compute(observations: &[Observation], config: &IndicatorConfig) -> Self {
        let volume_avg = config
            .volume_windows
            .iter()
            .map(|&window| {
                (
                    window,
                    rolling_volume_avg(observations, window, config.lot_size),
                )
            })
            .collect();
        let close_avg = config
            .close_windows
            .iter()
            .map(|&window| (window, rolling_close_avg(observations, window)))
            .collect();
        let (short, long) = config.suggested_windows;

        Self {
            observation_count: observations.len(),
            latest_close: observations.last().map(|observation| observation.close),
            percent_change: percent_change(observations).ok(),
            volume_avg,
            close_avg,
            suggested_price: suggested_price(observations, short, long),
        }
    }

    pub fn volume_avg(&self, window: usize) -> Option<f64> {
        self.volume_avg.get(&window).copied().flatten()
    }

    pub fn close_avg(&self, window: usize) -> Option<f64> {
        self.close_avg.get(&window).copied().flatten()
    }
}
