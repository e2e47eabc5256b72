//! Bounded tick series
//!
//! Append-then-trim FIFO over a `VecDeque`.

use std::collections::VecDeque;

use crate::parser::Tick;

/// Ordered ticks in arrival order, never longer than `cap`
#[derive(Debug, Clone)]
pub struct Series {
    ticks: VecDeque<Tick>,
    cap: usize,
}

impl Series {
    /// Create an empty series; a zero cap is raised to one
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            ticks: VecDeque::with_capacity(cap + 1),
            cap,
        }
    }

    /// Append a tick, evicting from the front once over the cap.
    ///
    /// Returns how many ticks were evicted.
    pub fn push(&mut self, tick: Tick) -> usize {
        self.ticks.push_back(tick);
        self.trim()
    }

    /// Replace the contents, keeping only the newest `cap` ticks
    pub fn replace<I>(&mut self, ticks: I)
    where
        I: IntoIterator<Item = Tick>,
    {
        self.ticks.clear();
        self.ticks.extend(ticks);
        self.trim();
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
    }

    fn trim(&mut self) -> usize {
        let excess = self.ticks.len().saturating_sub(self.cap);
        self.ticks.drain(..excess);
        excess
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn last(&self) -> Option<&Tick> {
        self.ticks.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tick> {
        self.ticks.iter()
    }

    pub fn to_vec(&self) -> Vec<Tick> {
        self.ticks.iter().cloned().collect()
    }
}
