//! Position resolution
//!
//! Turns a caller position (fraction below 1.0, absolute value otherwise) plus
//! a probe result into a concrete frame index or timestamp. Pure; no I/O.
//!
//! Two frame-index conventions exist side by side and are deliberately kept
//! apart: [`SelectionMode::FrameIndex`] is one-based and rounds, while
//! [`SelectionMode::ZeroBasedFrameIndex`] is zero-based and truncates. Callers
//! pick one per pipeline.

use crate::error::{MediaError, Result};
use crate::probe::ProbeResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// One-based frame number, clamped to `[1, total_frames]`.
    #[default]
    FrameIndex,
    /// Zero-based frame number, clamped to `[0, total_frames - 1]`.
    ZeroBasedFrameIndex,
    /// Seek to a time offset in seconds.
    Timestamp,
}

impl SelectionMode {
    pub fn as_str(&self) -> &str {
        match self {
            SelectionMode::FrameIndex => "frame_index",
            SelectionMode::ZeroBasedFrameIndex => "zero_based_frame_index",
            SelectionMode::Timestamp => "timestamp",
        }
    }
}

/// Raw caller position: `< 1.0` is a fraction of the total, `>= 1.0` is absolute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSpec {
    pub raw: f64,
}

impl PositionSpec {
    pub fn new(raw: f64) -> Self {
        Self { raw }
    }

    pub fn is_fraction(&self) -> bool {
        self.raw < 1.0
    }
}

impl From<f64> for PositionSpec {
    fn from(raw: f64) -> Self {
        Self::new(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedTarget {
    FrameIndex(u64),
    ZeroBasedFrameIndex(u64),
    Timestamp(f64),
}

pub fn resolve(position: PositionSpec, result: &ProbeResult, mode: SelectionMode) -> Result<ResolvedTarget> {
    if !position.raw.is_finite() {
        return Err(MediaError::InvalidPosition(position.raw));
    }

    let target = match mode {
        SelectionMode::FrameIndex => {
            let total = result.require_frames()?;
            ResolvedTarget::FrameIndex(one_based_frame(position, total))
        }
        SelectionMode::ZeroBasedFrameIndex => {
            let total = result.require_frames()?;
            ResolvedTarget::ZeroBasedFrameIndex(zero_based_frame(position, total))
        }
        SelectionMode::Timestamp => {
            let duration = result.require_duration()?;
            ResolvedTarget::Timestamp(timestamp(position, duration))
        }
    };
    Ok(target)
}

/// `round(raw * total)` or `round(raw)`, clamped to `[1, total]`. `total >= 1`.
fn one_based_frame(position: PositionSpec, total: u64) -> u64 {
    let target = if position.is_fraction() {
        (position.raw * total as f64).round()
    } else {
        position.raw.round()
    };
    target.clamp(1.0, total as f64) as u64
}

/// `trunc(raw * total)` or `trunc(raw)`, clamped to `[0, total - 1]`. `total >= 1`.
fn zero_based_frame(position: PositionSpec, total: u64) -> u64 {
    let target = if position.is_fraction() {
        (total as f64 * position.raw).trunc()
    } else {
        position.raw.trunc()
    };
    target.clamp(0.0, (total - 1) as f64) as u64
}

// Absolute offsets beyond the duration pass through; the engine stops at end of stream.
fn timestamp(position: PositionSpec, duration: f64) -> f64 {
    let seconds = if position.is_fraction() {
        position.raw * duration
    } else {
        position.raw
    };
    seconds.max(0.0)
}
