//! Bootstrap resampling of observation rows.
//!
//! Resampled datasets reproduce the number of active (unmasked) channels of
//! each [`DataKind`] in the input exactly. The output is a
//! [`BootstrapSample`]: an arena of rows plus a sequence of [`RowHandle`]s
//! into that arena. Drawing the same input row more than once gives the same
//! handle more than once, so those slots share one row.


use std::{
    collections::BTreeMap,
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

use indicatif::ProgressBar;
use log::{debug, trace};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use thiserror::Error;

use crate::{
    filter::{count_active_data, filter_indices_by_kind},
    DataKind, OiRow, RowError,
};

/// The random number generator used for resampling.
pub type BootstrapRng = Xoshiro256PlusPlus;

/// A reference to a row held by a [`BootstrapSample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowHandle(usize);

impl RowHandle {
    /// The index of the row in its sample's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A resampled dataset.
#[derive(Debug, Clone, Default)]
pub struct BootstrapSample {
    /// Every distinct row in the sample. Rows are cloned from the input, so
    /// masking them never affects the input.
    arena: Vec<OiRow>,

    /// The output, in draw order. Handles may repeat.
    handles: Vec<RowHandle>,
}

impl BootstrapSample {
    fn insert(&mut self, row: OiRow) -> RowHandle {
        self.arena.push(row);
        RowHandle(self.arena.len() - 1)
    }

    /// The number of output slots (not distinct rows).
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// The number of distinct rows in the sample.
    pub fn num_distinct_rows(&self) -> usize {
        self.arena.len()
    }

    pub fn handles(&self) -> &[RowHandle] {
        &self.handles
    }

    pub fn get(&self, handle: RowHandle) -> &OiRow {
        &self.arena[handle.0]
    }

    /// Iterate over the rows of every output slot, in order. A row that was
    /// drawn more than once is yielded more than once.
    pub fn iter(&self) -> impl Iterator<Item = &OiRow> + '_ {
        self.handles.iter().map(move |h| &self.arena[h.0])
    }

    /// Is the row behind `handle` referenced by more than one output slot?
    pub fn is_aliased(&self, handle: RowHandle) -> bool {
        self.handles.iter().filter(|&&h| h == handle).count() > 1
    }

    /// The number of active channels of `kind` over all output slots.
    pub fn active_data(&self, kind: DataKind) -> usize {
        count_active_data(self.iter().filter(|row| row.kind() == kind))
    }

    /// Convert into independent rows, one per output slot.
    pub fn into_rows(self) -> Vec<OiRow> {
        self.handles
            .iter()
            .map(|h| self.arena[h.0].clone())
            .collect()
    }

    /// Ensure that the row in output slot `slot` isn't shared with any other
    /// slot, copying it into the arena if needed.
    fn make_unique(&mut self, slot: usize) -> RowHandle {
        let handle = self.handles[slot];
        let shared = self
            .handles
            .iter()
            .enumerate()
            .any(|(i, &h)| i != slot && h == handle);
        if !shared {
            return handle;
        }

        let copy = self.arena[handle.0].clone();
        let new_handle = self.insert(copy);
        self.handles[slot] = new_handle;
        new_handle
    }
}

/// The available resampling strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootstrapMethod {
    /// Resample whole rows (all channels of a spectrum together).
    #[default]
    Spectral,

    /// Resample individual channels.
    Random,
}

#[derive(Error, Debug)]
#[error("Unrecognised bootstrap method '{0}'; supported methods are 'spectral' and 'random'")]
pub struct ParseBootstrapMethodError(String);

impl FromStr for BootstrapMethod {
    type Err = ParseBootstrapMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spectral" => Ok(BootstrapMethod::Spectral),
            "random" => Ok(BootstrapMethod::Random),
            _ => Err(ParseBootstrapMethodError(s.to_string())),
        }
    }
}

/// A seed from the system clock's nanoseconds.
pub fn seed_from_time() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    // Keep the fast-moving low bits.
    nanos as u64
}

/// A generator seeded from the system clock. Use
/// [`BootstrapRng::seed_from_u64`] for reproducible results.
pub fn rng_from_time() -> BootstrapRng {
    let seed = seed_from_time();
    debug!("Seeding bootstrap RNG with {seed}");
    BootstrapRng::seed_from_u64(seed)
}

/// Resample `rows` by drawing whole rows with replacement, independently per
/// kind, until each kind's active-channel count is reached. If the last row
/// drawn for a kind overshoots, random channels of it are masked so that the
/// count is reproduced exactly. That trimmed row is never shared with another
/// output slot.
///
/// Kinds with no rows or no active data contribute nothing. `rows` itself is
/// never modified.
pub fn bootstrap_spectral<R: Rng + ?Sized>(
    rows: &[OiRow],
    rng: &mut R,
) -> Result<BootstrapSample, RowError> {
    let mut sample = BootstrapSample::default();
    // Input row index -> arena handle.
    let mut arena_handles: Vec<Option<RowHandle>> = vec![None; rows.len()];

    for kind in DataKind::ALL {
        let pool = filter_indices_by_kind(rows, kind);
        if pool.is_empty() {
            continue;
        }
        let target = count_active_data(pool.iter().map(|&i| &rows[i]));
        if target == 0 {
            debug!("All {} {kind} rows are fully masked; skipping", pool.len());
            continue;
        }

        let mut remaining = target as i64;
        let mut num_drawn = 0;
        while remaining > 0 {
            let i_row = pool[rng.random_range(0..pool.len())];
            let handle = *arena_handles[i_row].get_or_insert_with(|| {
                sample.arena.push(rows[i_row].clone());
                RowHandle(sample.arena.len() - 1)
            });
            sample.handles.push(handle);
            remaining -= rows[i_row].masked_ndata() as i64;
            num_drawn += 1;
        }

        if remaining < 0 {
            let overshoot = remaining.unsigned_abs() as usize;
            let handle = sample.make_unique(sample.handles.len() - 1);
            trace!("Trimming {overshoot} {kind} channels from the last drawn row");
            sample.arena[handle.0].random_mask(overshoot, rng)?;
        }

        debug!(
            "Drew {num_drawn} {kind} rows from a pool of {} ({target} active channels)",
            pool.len()
        );
    }

    Ok(sample)
}

/// Resample individual channels with replacement, independently per kind.
/// For each kind with `N` active channels, `N` channels are drawn uniformly
/// from all active channels of that kind. A row with a channel drawn `m`
/// times appears `m` times in the output; copy `j` of a row has exactly the
/// channels that were drawn more than `j` times unmasked. Every output slot
/// holds its own row.
pub fn bootstrap_random<R: Rng + ?Sized>(rows: &[OiRow], rng: &mut R) -> BootstrapSample {
    let mut sample = BootstrapSample::default();

    for kind in DataKind::ALL {
        let active: Vec<(usize, usize)> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.kind() == kind)
            .flat_map(|(i_row, row)| row.unmasked_channels().map(move |i_chan| (i_row, i_chan)))
            .collect();
        if active.is_empty() {
            continue;
        }

        // Input row index -> number of times each channel was drawn.
        let mut draws: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for _ in 0..active.len() {
            let (i_row, i_chan) = active[rng.random_range(0..active.len())];
            draws
                .entry(i_row)
                .or_insert_with(|| vec![0; rows[i_row].num_channels()])[i_chan] += 1;
        }

        let num_before = sample.len();
        for (i_row, counts) in draws {
            let max_count = counts.iter().copied().max().unwrap_or(0);
            for copy in 0..max_count {
                let mut row = rows[i_row].clone();
                row.mask_where(|i_chan| counts[i_chan] <= copy);
                let handle = sample.insert(row);
                sample.handles.push(handle);
            }
        }

        debug!(
            "Drew {} {kind} channels into {} rows",
            active.len(),
            sample.len() - num_before
        );
    }

    sample
}

/// Resample `rows` with the given method.
pub fn bootstrap<R: Rng + ?Sized>(
    rows: &[OiRow],
    method: BootstrapMethod,
    rng: &mut R,
) -> Result<BootstrapSample, RowError> {
    match method {
        BootstrapMethod::Spectral => bootstrap_spectral(rows, rng),
        BootstrapMethod::Random => Ok(bootstrap_random(rows, rng)),
    }
}

/// Mix a base seed with a counter so that each replica gets its own
/// well-separated stream (splitmix64 finaliser).
fn counter_rng_seed(seed: u64, counter: u64) -> u64 {
    let mut z = seed.wrapping_add(counter.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Generate `num_replicas` independent resamplings of `rows` in parallel.
/// Replica `i` is always seeded the same way for a given `seed`, so the
/// results don't depend on thread scheduling.
///
/// # Arguments
///
/// * `rows` - the dataset to resample.
/// * `num_replicas` - how many resampled datasets to make.
/// * `seed` - the base seed.
/// * `method` - the resampling strategy.
/// * `progress_bar` - an optional progress bar to increment as replicas are
///   completed.
pub fn bootstrap_replicas(
    rows: &[OiRow],
    num_replicas: usize,
    seed: u64,
    method: BootstrapMethod,
    progress_bar: Option<ProgressBar>,
) -> Result<Vec<BootstrapSample>, RowError> {
    debug!("Generating {num_replicas} {method:?} bootstrap replicas with seed {seed}");
    let replicas = (0..num_replicas)
        .into_par_iter()
        .map(|i| {
            let mut rng = BootstrapRng::seed_from_u64(counter_rng_seed(seed, i as u64));
            let sample = bootstrap(rows, method, &mut rng);
            if let Some(pb) = progress_bar.as_ref() {
                pb.inc(1);
            }
            sample
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Resampled");
    }
    Ok(replicas)
}
