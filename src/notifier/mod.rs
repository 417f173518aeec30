//! Routing change notification.
//!
//! # Data Flow
//! ```text
//! Registry mutation (any process)
//!     → ChangeNotifier::force_reload
//!         → local generation bump (cached route table is stale)
//!         → mark_changed: locked read-max-write of the durable marker,
//!           then the in-memory stamp
//!
//! Other processes
//!     → ReloadMonitor tick → last_changed() reads the durable marker
//!     → newer than last sync → registry resync + local invalidate
//! ```
//!
//! # Design Decisions
//! - The effective stamp is max(in-memory, durable); it never moves back
//! - Marker writes are fire-and-forget; a failed write is logged and only
//!   costs other processes freshness, never this process's correctness
//! - Local invalidation is a generation counter the route table compares
//!   against, so there is no callback registration

pub mod marker;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub use marker::{FileMarker, MarkerError, MarkerStore, MemoryMarker};

/// Process-local view of the shared "routing changed" timestamp.
pub struct ChangeNotifier {
    /// Bits of a non-negative f64 (seconds since the epoch). For non-negative
    /// finite floats the bit patterns order the same way as the values, so
    /// `fetch_max` on the bits is a float max.
    last_changed: AtomicU64,
    generation: AtomicU64,
    marker: Arc<dyn MarkerStore>,
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("last_changed", &self.local())
            .field("generation", &self.generation())
            .finish()
    }
}

impl ChangeNotifier {
    /// Create a notifier backed by the given durable marker.
    pub fn new(marker: Arc<dyn MarkerStore>) -> Self {
        Self {
            last_changed: AtomicU64::new(0f64.to_bits()),
            generation: AtomicU64::new(0),
            marker,
        }
    }

    /// A notifier whose marker is only visible inside this process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryMarker::new()))
    }

    /// Record that routing changed now, locally and durably.
    ///
    /// Returns the stamp written. The stamp is strictly greater than any
    /// value this process or the durable marker has seen, so a change is
    /// never hidden behind clock skew.
    pub fn mark_changed(&self) -> f64 {
        let local = self.local();
        let now = unix_secs();
        let next_stamp = |durable: Option<f64>| {
            let floor = match durable.filter(|d| is_valid_stamp(*d)) {
                Some(durable) => durable.max(local),
                None => local,
            };
            if now > floor {
                now
            } else {
                next_up(floor)
            }
        };

        // Durable read and write form one step under the marker's lock.
        let stamp = match self.marker.update(&mut |durable| next_stamp(durable)) {
            Ok(stamp) => stamp,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to persist route change marker");
                next_stamp(self.read_durable())
            }
        };
        self.advance(stamp);
        stamp
    }

    /// The latest change stamp seen by this process or any other.
    pub fn last_changed(&self) -> f64 {
        if let Some(durable) = self.read_durable() {
            self.advance(durable);
        }
        self.local()
    }

    /// Drop any cached route table and publish the change.
    pub fn force_reload(&self) {
        self.invalidate();
        let stamp = self.mark_changed();
        tracing::debug!(stamp, generation = self.generation(), "Forced route reload");
    }

    /// Drop any cached route table in this process only.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// A module's base path moved; its routes must be remounted.
    pub fn path_changed(&self, module_id: &str) {
        tracing::info!(module_id = %module_id, "Module base path changed, reloading routes");
        self.force_reload();
    }

    /// Counter bumped on every local invalidation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn local(&self) -> f64 {
        f64::from_bits(self.last_changed.load(Ordering::Acquire))
    }

    fn advance(&self, stamp: f64) {
        if is_valid_stamp(stamp) {
            self.last_changed.fetch_max(stamp.to_bits(), Ordering::AcqRel);
        }
    }

    fn read_durable(&self) -> Option<f64> {
        match self.marker.read() {
            Ok(Some(stamp)) if is_valid_stamp(stamp) => Some(stamp),
            Ok(Some(stamp)) => {
                tracing::warn!(stamp, "Ignoring invalid route change marker");
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read route change marker");
                None
            }
        }
    }
}

fn is_valid_stamp(stamp: f64) -> bool {
    stamp.is_finite() && stamp >= 0.0
}

fn next_up(stamp: f64) -> f64 {
    f64::from_bits(stamp.to_bits() + 1)
}

fn unix_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenMarker;

    impl MarkerStore for BrokenMarker {
        fn read(&self) -> Result<Option<f64>, MarkerError> {
            Err(MarkerError::Io(std::io::Error::other("disk gone")))
        }

        fn write(&self, _stamp: f64) -> Result<(), MarkerError> {
            Err(MarkerError::Io(std::io::Error::other("disk gone")))
        }

        fn update(&self, _next: &mut dyn FnMut(Option<f64>) -> f64) -> Result<f64, MarkerError> {
            Err(MarkerError::Io(std::io::Error::other("disk gone")))
        }
    }

    #[test]
    fn test_last_changed_is_monotonic() {
        let notifier = ChangeNotifier::in_memory();
        let mut previous = notifier.last_changed();
        for _ in 0..100 {
            notifier.mark_changed();
            let current = notifier.last_changed();
            assert!(current > previous);
            previous = current;
        }
    }

    #[test]
    fn test_durable_marker_moves_other_process_forward() {
        let shared = MemoryMarker::new();
        let a = ChangeNotifier::new(Arc::new(shared.clone()));
        let b = ChangeNotifier::new(Arc::new(shared));

        let before = b.last_changed();
        let stamp = a.mark_changed();
        assert!(stamp > before);
        assert_eq!(b.last_changed(), stamp);
    }

    #[test]
    fn test_stale_durable_value_never_moves_back() {
        let shared = MemoryMarker::new();
        let notifier = ChangeNotifier::new(Arc::new(shared.clone()));
        let stamp = notifier.mark_changed();

        shared.write(1.0).unwrap();
        assert_eq!(notifier.last_changed(), stamp);
    }

    #[test]
    fn test_future_durable_value_is_exceeded() {
        let shared = MemoryMarker::new();
        let far_future = unix_secs() + 3600.0;
        shared.write(far_future).unwrap();

        let notifier = ChangeNotifier::new(Arc::new(shared));
        let stamp = notifier.mark_changed();
        assert!(stamp > far_future);
    }

    /// Runs `race` once, in the middle of the first `update`.
    struct RacingMarker {
        inner: MemoryMarker,
        race: std::sync::Mutex<Option<Box<dyn FnOnce() + Send>>>,
    }

    impl MarkerStore for RacingMarker {
        fn read(&self) -> Result<Option<f64>, MarkerError> {
            self.inner.read()
        }

        fn write(&self, stamp: f64) -> Result<(), MarkerError> {
            self.inner.write(stamp)
        }

        fn update(&self, next: &mut dyn FnMut(Option<f64>) -> f64) -> Result<f64, MarkerError> {
            self.inner.update(&mut |current| {
                let stamp = next(current);
                if let Some(race) = self.race.lock().unwrap().take() {
                    race();
                }
                stamp
            })
        }
    }

    #[test]
    fn test_interleaved_writer_never_moves_marker_back() {
        let shared = MemoryMarker::new();
        let a = ChangeNotifier::new(Arc::new(shared.clone()));
        let c = Arc::new(ChangeNotifier::new(Arc::new(shared.clone())));
        let seen_by_c = Arc::new(AtomicU64::new(0));

        let race: Box<dyn FnOnce() + Send> = {
            let c = c.clone();
            let seen_by_c = seen_by_c.clone();
            Box::new(move || {
                a.mark_changed();
                seen_by_c.store(c.last_changed().to_bits(), Ordering::SeqCst);
            })
        };
        let b = ChangeNotifier::new(Arc::new(RacingMarker {
            inner: shared.clone(),
            race: std::sync::Mutex::new(Some(race)),
        }));

        let seen = f64::from_bits(seen_by_c.load(Ordering::SeqCst));
        let stamp_b = b.mark_changed();
        let seen_after = f64::from_bits(seen_by_c.load(Ordering::SeqCst));
        assert!(seen_after > seen);
        assert!(stamp_b > seen_after);
        assert_eq!(shared.read().unwrap(), Some(stamp_b));
        assert!(c.last_changed() > seen_after);
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let notifier = ChangeNotifier::new(Arc::new(BrokenMarker));
        let stamp = notifier.mark_changed();
        assert!(stamp > 0.0);
        assert_eq!(notifier.last_changed(), stamp);
    }

    #[test]
    fn test_force_reload_bumps_generation() {
        let notifier = ChangeNotifier::in_memory();
        let generation = notifier.generation();
        let before = notifier.last_changed();

        notifier.force_reload();
        assert_eq!(notifier.generation(), generation + 1);
        assert!(notifier.last_changed() > before);

        notifier.invalidate();
        assert_eq!(notifier.generation(), generation + 2);
    }
}
