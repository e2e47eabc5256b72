//! Series reconciliation state
//!
//! Pure, synchronous core of the store: every history result and every tick
//! carries the generation it was issued under and is dropped if a newer
//! selection has started since.

use tracing::{debug, warn};

use super::{Generation, LoadState, MergePolicy, Series, SeriesKey, SeriesSnapshot};
use crate::error::Result;
use crate::metrics::metrics;
use crate::parser::Tick;

/// Series plus the selection bookkeeping needed to merge into it
#[derive(Debug)]
pub struct SeriesState {
    key: Option<SeriesKey>,
    generation: Generation,
    series: Series,
    /// Ticks held back while history loads (`BufferAndReplay` only)
    interim: Series,
    load_state: LoadState,
    policy: MergePolicy,
}

impl SeriesState {
    pub fn new(cap: usize, policy: MergePolicy) -> Self {
        Self {
            key: None,
            generation: Generation::default(),
            series: Series::new(cap),
            interim: Series::new(cap),
            load_state: LoadState::Idle,
            policy,
        }
    }

    pub fn key(&self) -> Option<&SeriesKey> {
        self.key.as_ref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    /// True if results tagged with `generation` may still be applied
    pub fn is_current(&self, generation: Generation) -> bool {
        self.key.is_some() && generation == self.generation
    }

    /// Start a new selection: empty series, history pending
    pub fn begin(&mut self, key: SeriesKey) -> Generation {
        self.generation = self.generation.next();
        debug!(key = %key, generation = self.generation.0, "Starting new series");

        self.key = Some(key);
        self.series.clear();
        self.interim.clear();
        self.load_state = LoadState::Loading;
        metrics().series_len.set(0);

        self.generation
    }

    /// Make every outstanding result stale without starting a new selection
    pub fn invalidate(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.interim.clear();
        self.generation
    }

    /// Seed the series from the history fetch.
    ///
    /// Success replaces whatever the series holds. Failure leaves it empty and
    /// lets later ticks append. Returns false if the result was stale.
    pub fn apply_history(&mut self, generation: Generation, result: Result<Vec<Tick>>) -> bool {
        if !self.is_current(generation) || !self.load_state.is_pending() {
            debug!(
                generation = generation.0,
                current = self.generation.0,
                "Ignoring stale history result"
            );
            return false;
        }

        match result {
            Ok(history) => {
                let points = history.len();
                self.series.replace(history);
                if self.policy == MergePolicy::BufferAndReplay {
                    for tick in self.interim.to_vec() {
                        self.series.push(tick);
                    }
                }
                debug!(
                    points,
                    replayed = self.interim.len(),
                    retained = self.series.len(),
                    "History applied"
                );
                self.load_state = LoadState::Loaded;
            }
            Err(e) => {
                metrics().history_fetch_failures.inc();
                warn!(
                    key = ?self.key,
                    error = %e,
                    "History fetch failed, continuing with live ticks only"
                );
                self.series.clear();
                self.load_state = LoadState::Failed(e.to_string());
            }
        }

        self.interim.clear();
        metrics().series_len.set(self.series.len() as i64);
        true
    }

    /// Merge one streamed tick. Returns true if it was appended to the series.
    pub fn apply_tick(&mut self, generation: Generation, tick: Tick) -> bool {
        if !self.is_current(generation) {
            metrics().ticks_discarded.with_label_values(&["stale"]).inc();
            return false;
        }

        if self.load_state.is_pending() {
            match self.policy {
                MergePolicy::DiscardInterim => {
                    metrics().ticks_discarded.with_label_values(&["interim"]).inc();
                }
                MergePolicy::BufferAndReplay => {
                    self.interim.push(tick);
                }
            }
            return false;
        }

        self.series.push(tick);
        metrics().ticks_applied.inc();
        metrics().series_len.set(self.series.len() as i64);
        true
    }

    pub fn snapshot(&self, is_live: bool) -> SeriesSnapshot {
        SeriesSnapshot {
            key: self.key.clone(),
            generation: self.generation,
            ticks: self.series.to_vec(),
            load_state: self.load_state.clone(),
            is_live,
        }
    }
}
