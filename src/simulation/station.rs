//! Mutual-exclusion stations
//!
//! A [`StationResource`] models one physical station that only a single box
//! may occupy. Occupancy is held through an RAII [`StationGuard`]; dropping
//! the guard releases the station. The station also counts its occupants so
//! tests can assert exclusion was never violated.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::types::Station;

/// A single station serializing every box that passes through it
#[derive(Debug)]
pub struct StationResource {
    station: Station,
    lock: Mutex<()>,
    occupants: AtomicUsize,
    peak_occupants: AtomicUsize,
    acquisitions: AtomicU64,
}

impl StationResource {
    /// Create an unoccupied station
    pub fn new(station: Station) -> Self {
        Self {
            station,
            lock: Mutex::new(()),
            occupants: AtomicUsize::new(0),
            peak_occupants: AtomicUsize::new(0),
            acquisitions: AtomicU64::new(0),
        }
    }

    /// Which station this is
    pub fn station(&self) -> Station {
        self.station
    }

    /// Block until no other worker holds the station, then occupy it
    ///
    /// Not reentrant: acquiring twice from the same thread deadlocks.
    pub fn acquire(&self) -> StationGuard<'_> {
        // The mutex protects no data, so a holder that panicked leaves
        // nothing inconsistent behind.
        let lock = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let occupants = self.occupants.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_occupants.fetch_max(occupants, Ordering::SeqCst);
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        trace!(station = %self.station, occupants, "Station acquired");

        StationGuard { resource: self, _lock: lock }
    }

    /// Workers currently holding the station (0 or 1)
    pub fn occupants(&self) -> usize {
        self.occupants.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous holders ever observed
    pub fn peak_occupants(&self) -> usize {
        self.peak_occupants.load(Ordering::SeqCst)
    }

    /// Total number of completed acquisitions
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }
}

/// Exclusive occupancy of a station; released on drop
#[derive(Debug)]
pub struct StationGuard<'a> {
    resource: &'a StationResource,
    _lock: MutexGuard<'a, ()>,
}

impl StationGuard<'_> {
    /// Which station is held
    pub fn station(&self) -> Station {
        self.resource.station
    }
}

impl Drop for StationGuard<'_> {
    fn drop(&mut self) {
        // Runs before `_lock` is released
        self.resource.occupants.fetch_sub(1, Ordering::SeqCst);
        trace!(station = %self.resource.station, "Station released");
    }
}
