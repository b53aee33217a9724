//! Quality-target search.
//!
//! Bisects the encoder's quality parameter until the encoded size lands
//! within a tolerance band around a target byte count.
//!
//! ## Algorithm
//!
//! Starting from `[min_quality, max_quality]`, each step encodes at the
//! midpoint. Output that is too large lowers the ceiling; output that is too
//! small raises the floor. The search stops at the first probe within
//! `tolerance * target` of the target, or when the attempt budget runs out.
//!
//! Bisection is valid because encoded size is monotonic non-decreasing in
//! quality for lossy codecs. Inputs that break this (near-solid images whose
//! size barely moves) simply fail to converge: the search never errors for
//! that, it returns the last midpoint it tried. Callers needing a hard size
//! ceiling must check the final size themselves.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::decode::Surface;
use crate::encode::{EncodeError, EncodeRequest, SurfaceEncoder};
use crate::format::OutputFormat;

/// Tunables for the quality search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchConfig {
    /// Lower bound of the quality interval.
    pub min_quality: f64,
    /// Upper bound of the quality interval.
    pub max_quality: f64,
    /// Returned if the budget is zero probes. Never probed itself.
    pub initial_quality: f64,
    /// Maximum number of encode probes.
    pub max_attempts: u32,
    /// Accepted relative distance from the target (0.1 = within 10%).
    pub tolerance: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_quality: 0.1,
            max_quality: 1.0,
            initial_quality: 0.5,
            max_attempts: 10,
            tolerance: 0.1,
        }
    }
}

/// Rejected search configuration.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid search configuration: {0}")]
pub struct SearchConfigError(String);

impl SearchConfig {
    /// Check bounds, budget and tolerance.
    pub fn validate(&self) -> Result<(), SearchConfigError> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.min_quality) || !in_unit(self.max_quality) {
            return Err(SearchConfigError(format!(
                "quality bounds [{}, {}] must lie within [0, 1]",
                self.min_quality, self.max_quality
            )));
        }
        if self.min_quality >= self.max_quality {
            return Err(SearchConfigError(format!(
                "min quality {} must be below max quality {}",
                self.min_quality, self.max_quality
            )));
        }
        if !in_unit(self.initial_quality) {
            return Err(SearchConfigError(format!(
                "initial quality {} must lie within [0, 1]",
                self.initial_quality
            )));
        }
        if self.max_attempts == 0 {
            return Err(SearchConfigError("max attempts must be at least 1".to_string()));
        }
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(SearchConfigError(format!(
                "tolerance {} must lie within (0, 1)",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Result of a quality search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome {
    /// Quality to use for the final encode.
    pub quality: f64,
    /// Number of probes issued.
    pub attempts: u32,
    /// Whether a probe landed inside the tolerance band.
    pub converged: bool,
    /// Size measured by the last probe, if any probe ran.
    pub last_size: Option<usize>,
}

/// Bisect quality until `probe(quality)` lands near `target_bytes`.
///
/// `probe` encodes at the given quality and returns the output size in
/// bytes. Probes run strictly one after another; each step depends on the
/// previous size. An error from `probe` aborts the search.
pub fn search_quality<F, E>(
    target_bytes: u64,
    config: &SearchConfig,
    mut probe: F,
) -> Result<SearchOutcome, E>
where
    F: FnMut(f64) -> Result<usize, E>,
{
    let target = target_bytes as f64;
    let band = target * config.tolerance;

    let mut low = config.min_quality;
    let mut high = config.max_quality;
    let mut best = config.initial_quality;
    let mut attempts = 0;
    let mut last_size = None;

    while attempts < config.max_attempts {
        let mid = (low + high) / 2.0;
        let size = probe(mid)?;
        attempts += 1;
        last_size = Some(size);
        debug!(attempt = attempts, quality = mid, size, target = target_bytes, "quality probe");

        if (size as f64 - target).abs() < band {
            return Ok(SearchOutcome {
                quality: mid,
                attempts,
                converged: true,
                last_size,
            });
        }

        if size as f64 > target {
            high = mid;
        } else {
            low = mid;
        }
        best = mid;
    }

    warn!(
        attempts,
        quality = best,
        target = target_bytes,
        "quality search did not converge; using last midpoint"
    );
    Ok(SearchOutcome {
        quality: best,
        attempts,
        converged: false,
        last_size,
    })
}

/// Run the search against a real encoder.
///
/// Intermediate encodes are probes: only their size is kept, the bytes are
/// dropped as soon as they are measured. `on_probe` runs before each encode.
pub fn search_encoder_quality<E: SurfaceEncoder>(
    encoder: &E,
    surface: &Surface,
    format: OutputFormat,
    background: [u8; 3],
    target_bytes: u64,
    config: &SearchConfig,
    on_probe: &mut dyn FnMut(f64),
) -> Result<SearchOutcome, EncodeError> {
    search_quality(target_bytes, config, |quality| {
        on_probe(quality);
        let request = EncodeRequest::new(surface, format, quality).with_background(background);
        encoder.encode(&request).map(|result| result.byte_len())
    })
}


// ============================================================================
// Property-Based Tests
// ============================================================================
