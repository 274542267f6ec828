//! Single flight synchronization of remote resources
//!
//! A [`ResourceCell`] tracks one remote resource: its latest resolved
//! value, whether a fetch is running, and the most recent fetch error.
//! At most one fetch may be in flight per cell; triggers that race a
//! running fetch are dropped rather than queued. Readers get cheap
//! lock free snapshots.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

/// Value half of a cell's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceValue<T> {
    /// Never fetched since construction or the last reset
    Unfetched,
    /// Present on the server
    Present(T),
    /// The server confirmed the resource does not exist
    Absent,
}

impl<T> Default for ResourceValue<T> {
    fn default() -> Self {
        Self::Unfetched
    }
}

impl<T> ResourceValue<T> {
    /// The resolved value, if present
    pub fn as_present(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the server confirmed absence
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Fetch half of a cell's state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    /// No fetch running
    #[default]
    Idle,
    /// A fetch is running
    InFlight,
}

/// Snapshot of one cell
#[derive(Debug, Clone)]
pub struct ResourceState<T> {
    /// Latest resolved value
    pub value: ResourceValue<T>,
    /// Whether a fetch is running
    pub fetch: FetchState,
    /// Error of the most recent failed fetch, cleared by the next trigger
    pub last_error: Option<String>,
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self {
            value: ResourceValue::Unfetched,
            fetch: FetchState::Idle,
            last_error: None,
        }
    }
}

impl<T> ResourceState<T> {
    /// Whether a fetch is running
    pub fn is_in_flight(&self) -> bool {
        self.fetch == FetchState::InFlight
    }
}

/// Proof that the holder won the single flight race for one fetch.
///
/// Every permit must be resolved with [`ResourceCell::complete`];
/// abandoning one leaves the cell in flight until the next reset.
#[derive(Debug)]
#[must_use]
pub struct FetchPermit {
    epoch: u64,
}

/// One remote resource with single flight fetching
#[derive(Debug)]
pub struct ResourceCell<T> {
    state: ArcSwap<ResourceState<T>>,
    in_flight: AtomicBool,
    epoch: AtomicU64,
}

impl<T: Clone> Default for ResourceCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ResourceCell<T> {
    /// Create an unfetched cell
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(ResourceState::default()),
            in_flight: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
        }
    }

    /// Cheap copy of the current state
    pub fn state(&self) -> ResourceState<T> {
        self.state.load().as_ref().clone()
    }

    /// Claim the right to fetch.
    ///
    /// Returns `None` while another fetch is running; the caller is
    /// expected to drop the trigger in that case. Claiming also clears
    /// any recorded error so a retry starts clean.
    pub fn begin(&self) -> Option<FetchPermit> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return None;
        }

        self.update(|state| {
            state.fetch = FetchState::InFlight;
            state.last_error = None;
        });

        Some(FetchPermit {
            epoch: self.epoch.load(Ordering::Acquire),
        })
    }

    /// Publish the outcome of a fetch.
    ///
    /// Returns whether the outcome was applied. A permit that predates a
    /// [`reset`](Self::reset) is stale: its outcome is discarded so a
    /// torn down fetch cannot resurrect state.
    pub fn complete(&self, permit: FetchPermit, outcome: Result<ResourceValue<T>, String>) -> bool {
        if permit.epoch != self.epoch.load(Ordering::Acquire) {
            tracing::debug!("Discarding fetch completion from before a reset");
            return false;
        }

        self.update(|state| {
            state.fetch = FetchState::Idle;
            match outcome.clone() {
                Ok(value) => {
                    state.value = value;
                    state.last_error = None;
                }
                Err(message) => state.last_error = Some(message),
            }
        });
        self.in_flight.store(false, Ordering::Release);
        true
    }

    /// Replace a present value in place, outside the fetch cycle.
    ///
    /// Used after mutations whose response carries the fresh resource, so
    /// the cache reflects the write without another round trip.
    pub fn publish(&self, value: T) {
        self.update(|state| {
            state.value = ResourceValue::Present(value.clone());
            state.last_error = None;
        });
    }

    /// Record a failure from outside the fetch cycle.
    ///
    /// Used by mutations so their errors land on the cell a renderer
    /// already watches. The cached value is untouched.
    pub fn record_error(&self, message: String) {
        self.update(|state| {
            state.last_error = Some(message.clone());
        });
    }

    /// Forget everything and invalidate any in flight fetch
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.in_flight.store(false, Ordering::Release);
        self.state.store(Arc::new(ResourceState::default()));
    }

    fn update<F: Fn(&mut ResourceState<T>)>(&self, mutate: F) {
        self.state.rcu(|current| {
            let mut next = current.as_ref().clone();
            mutate(&mut next);
            next
        });
    }
}
