//! Fetch controller: debounce, cache, sequence gating.
//!
//! Every query change advances a sequence number. Each outbound request
//! captures the sequence active at dispatch time, and its result is applied
//! only if that sequence is still current when the result arrives. Results are
//! therefore applied last-writer-wins by sequence, never by arrival order.
//!
//! Cancellation is logical: a superseded debounce task is aborted, and a
//! superseded in-flight request runs to completion but its result is dropped.
//! Completion tasks hold only `Weak` references, so dropping the controller
//! turns every outstanding completion into a no-op.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use suggest_core::{Suggestion, TransportError, WidgetConfig};
use tokio::task::JoinHandle;
use unicode_segmentation::UnicodeSegmentation;

use crate::cache::{cache_key, SuggestionCache, DEFAULT_CACHE_TTL};
use crate::transport::{Transport, TransportRequest};

// =============================================================================
// Outcomes
// =============================================================================

/// Where a result set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Cache,
    Network,
}

/// What the controller hands to its sink for the current sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// A fresh result set.
    Results {
        items: Vec<Suggestion<T>>,
        source: FetchSource,
    },

    /// The query is shorter than `min_chars`; the list should be cleared.
    BelowMinimum,

    /// The transport failed. The previous list should be retained.
    Failed(TransportError),
}

/// Receiver of non-stale outcomes.
///
/// `deliver` is called with the controller's sequence lock held and must not
/// call back into the controller, apart from the lock-free
/// [`FetchController::current_seq`].
pub trait FetchSink<T>: Send + Sync {
    /// `seq` is the generation the outcome belongs to.
    fn deliver(&self, seq: u64, outcome: FetchOutcome<T>);
}

// =============================================================================
// Configuration
// =============================================================================

/// Controller tuning, derived from [`WidgetConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Minimum query length in grapheme clusters.
    pub min_chars: usize,
    /// Debounce window. Zero dispatches inline.
    pub delay: Duration,
    /// Lifetime of cache entries written by this controller.
    pub cache_ttl: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            min_chars: 0,
            delay: Duration::ZERO,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl From<&WidgetConfig> for FetchConfig {
    fn from(config: &WidgetConfig) -> Self {
        Self {
            min_chars: config.min_chars,
            delay: config.delay(),
            cache_ttl: config.cache_ttl(),
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

struct FetchState {
    debounce: Option<JoinHandle<()>>,
}

struct Inner<T> {
    config: FetchConfig,
    transport: Arc<dyn Transport>,
    cache: Option<Arc<dyn SuggestionCache<T>>>,
    sink: Arc<dyn FetchSink<T>>,
    /// Current generation. Only written with `state` locked.
    seq: AtomicU64,
    state: Mutex<FetchState>,
}

/// Debounced, cached, sequence-gated fetching.
///
/// Must be driven from inside a tokio runtime: debounce timers and transport
/// completions are spawned tasks.
pub struct FetchController<T> {
    inner: Arc<Inner<T>>,
}

impl<T> FetchController<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create a controller. Pass `cache: None` to disable caching.
    pub fn new(
        config: FetchConfig,
        transport: Arc<dyn Transport>,
        cache: Option<Arc<dyn SuggestionCache<T>>>,
        sink: Arc<dyn FetchSink<T>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                cache,
                sink,
                seq: AtomicU64::new(0),
                state: Mutex::new(FetchState { debounce: None }),
            }),
        }
    }

    /// The sequence number of the current query generation.
    ///
    /// Does not take the sequence lock, so it is safe to call from a sink.
    pub fn current_seq(&self) -> u64 {
        self.inner.current()
    }

    pub fn config(&self) -> &FetchConfig {
        &self.inner.config
    }

    /// Handle a query change. Returns the new current sequence.
    ///
    /// `request` is the fully shaped request for `text`; its endpoint, payload
    /// and headers form the cache key.
    pub fn on_query_changed(&self, text: &str, request: TransportRequest) -> u64 {
        let seq = self.inner.advance();

        let len = text.graphemes(true).count();
        if len < self.inner.config.min_chars {
            tracing::debug!(
                seq,
                len,
                min_chars = self.inner.config.min_chars,
                "query below minimum length, clearing"
            );
            self.inner.deliver_if_current(seq, FetchOutcome::BelowMinimum);
            return seq;
        }

        let delay = self.inner.config.delay;
        if delay.is_zero() {
            Inner::dispatch(&self.inner, seq, request);
            return seq;
        }

        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                {
                    let mut state = inner.state.lock();
                    if inner.current() == seq {
                        state.debounce = None;
                    }
                }
                Inner::dispatch(&inner, seq, request);
            }
        });

        let mut state = self.inner.state.lock();
        if self.inner.current() == seq {
            state.debounce = Some(handle);
        } else {
            handle.abort();
        }
        seq
    }

    /// Make every pending or in-flight request stale without dispatching.
    pub fn invalidate(&self) -> u64 {
        let seq = self.inner.advance();
        tracing::debug!(seq, "fetch invalidated");
        seq
    }
}

impl<T> Drop for FetchController<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.inner.state.lock().debounce.take() {
            handle.abort();
        }
    }
}

impl<T> Inner<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn current(&self) -> u64 {
        self.seq.load(Ordering::Acquire)
    }

    /// Bump the sequence and abort the pending debounce task.
    fn advance(&self) -> u64 {
        let mut state = self.state.lock();
        let seq = self.seq.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(handle) = state.debounce.take() {
            handle.abort();
        }
        seq
    }

    /// Deliver `outcome` only if `seq` is still current.
    ///
    /// The lock is held across delivery so a newer query cannot interleave
    /// between the check and the state update.
    fn deliver_if_current(&self, seq: u64, outcome: FetchOutcome<T>) -> bool {
        let _state = self.state.lock();
        let current = self.current();
        if current != seq {
            tracing::debug!(seq, current, "discarding stale response");
            return false;
        }
        self.sink.deliver(seq, outcome);
        true
    }

    fn dispatch(this: &Arc<Self>, seq: u64, request: TransportRequest) {
        if this.current() != seq {
            tracing::debug!(seq, "superseded before dispatch");
            return;
        }

        let key = this.cache.as_ref().map(|_| cache_key(&request));
        if let (Some(cache), Some(key)) = (&this.cache, &key) {
            if let Some(items) = cache.get(key) {
                tracing::debug!(seq, items = items.len(), "cache hit");
                this.deliver_if_current(
                    seq,
                    FetchOutcome::Results {
                        items,
                        source: FetchSource::Cache,
                    },
                );
                return;
            }
        }

        tracing::debug!(seq, endpoint = %request.endpoint, "dispatching request");
        let response = this.transport.send(request);
        let weak: Weak<Self> = Arc::downgrade(this);

        tokio::spawn(async move {
            let result = match response.await {
                Ok(raw) => raw.decode::<T>(),
                Err(e) => Err(e),
            };

            let Some(inner) = weak.upgrade() else {
                tracing::debug!(seq, "controller dropped, ignoring response");
                return;
            };
            inner.complete(seq, key, result);
        });
    }

    fn complete(
        &self,
        seq: u64,
        key: Option<String>,
        result: Result<Vec<Suggestion<T>>, TransportError>,
    ) {
        match result {
            Ok(items) => {
                if let (Some(cache), Some(key)) = (&self.cache, key) {
                    cache.set(key, items.clone(), self.config.cache_ttl);
                }
                let count = items.len();
                if self.deliver_if_current(
                    seq,
                    FetchOutcome::Results {
                        items,
                        source: FetchSource::Network,
                    },
                ) {
                    tracing::debug!(seq, items = count, "applied response");
                }
            }
            Err(e) => {
                if self.current() == seq {
                    tracing::warn!(seq, "suggestion request failed: {}", e);
                }
                self.deliver_if_current(seq, FetchOutcome::Failed(e));
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
