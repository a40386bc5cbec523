//! Widget orchestrator.
//!
//! Bridges input events to the fetch controller and the navigation state
//! machine, and emits committed values to the host.
//!
//! ## Input channels
//!
//! Text reaches the widget through two distinct channels:
//! - user edits (`input_changed`) debounce and fetch;
//! - external authoritative updates (`set_value`) reset the text, clear the
//!   list and never fetch.
//!
//! ## Reactive State
//!
//! Every state mutation broadcasts a [`RenderSnapshot`] via `tokio::sync::watch`.
//! The rendering collaborator subscribes and redraws; it never mutates state.
//!
//! ## Closing a generation
//!
//! Commit, dismiss and edits raise a floor in the widget state in the same
//! locked update that changes the text. Fetch outcomes whose sequence is below
//! the floor are dropped even if they already passed the controller's check,
//! so a response racing a commit on another thread cannot reopen the list.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use suggest_core::{NavKey, Suggestion, WidgetConfig};
use tokio::sync::watch;
use uuid::Uuid;

use crate::cache::{MemoryCache, SuggestionCache};
use crate::fetch::{FetchConfig, FetchController, FetchOutcome, FetchSink};
use crate::kind::SuggestionKind;
use crate::navigation::{NavPhase, Navigation, UpMove};
use crate::transport::{Transport, TransportRequest};

// =============================================================================
// Public Types
// =============================================================================

/// Unique identifier of a widget instance, used in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetId(pub Uuid);

impl WidgetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WidgetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A value emitted to the host, exactly once per user commit action.
#[derive(Debug, Clone, PartialEq)]
pub enum Commit<T> {
    /// The user picked a suggestion.
    Selected(Suggestion<T>),
    /// The user cleared the input.
    Cleared,
}

/// Host callback receiving commits. Called with no widget lock held.
pub type CommitCallback<T> = Box<dyn Fn(Commit<T>) + Send + Sync>;

/// Everything the rendering collaborator needs for one render cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot<T> {
    /// Visible list, in service order.
    pub items: Vec<Suggestion<T>>,
    /// Identity key per item, parallel to `items`.
    pub keys: Vec<String>,
    /// Highlighted index; `None` means the input text is authoritative.
    pub highlighted: Option<usize>,
    pub is_open: bool,
    /// Text currently shown in the input, including a highlight preview.
    pub display_text: String,
    /// Text the user actually typed (or last committed).
    pub query: String,
    pub focused: bool,
}

impl<T> Default for RenderSnapshot<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            keys: Vec::new(),
            highlighted: None,
            is_open: false,
            display_text: String::new(),
            query: String::new(),
            focused: false,
        }
    }
}

// =============================================================================
// Shared State
// =============================================================================

type KeyFn<T> = Box<dyn Fn(&Suggestion<T>) -> String + Send + Sync>;

struct WidgetState<T> {
    query: String,
    display_text: String,
    focused: bool,
    nav: Navigation<T>,
    /// Outcomes from sequences below this are ignored.
    floor: u64,
}

/// State reachable from fetch completions.
///
/// The controller holds this as its sink; completions reach it only through
/// the controller, so dropping the widget makes them no-ops.
struct Shared<T> {
    id: WidgetId,
    key_fn: KeyFn<T>,
    state: Mutex<WidgetState<T>>,
    tx: watch::Sender<RenderSnapshot<T>>,
    rx: watch::Receiver<RenderSnapshot<T>>,
}

impl<T: Clone + Send + Sync> Shared<T> {
    /// Mutate state and broadcast the result.
    fn update<R>(&self, f: impl FnOnce(&mut WidgetState<T>) -> R) -> R {
        let mut state = self.state.lock();
        let result = f(&mut state);
        let _ = self.tx.send(render(&state, &self.key_fn));
        result
    }

    /// Like `update`, for an outcome of generation `seq`. Skipped below the floor.
    fn update_from(&self, seq: u64, f: impl FnOnce(&mut WidgetState<T>)) {
        let mut state = self.state.lock();
        if seq < state.floor {
            tracing::debug!(
                widget = %self.id,
                seq,
                floor = state.floor,
                "ignoring closed generation"
            );
            return;
        }
        f(&mut state);
        let _ = self.tx.send(render(&state, &self.key_fn));
    }

    fn dedup(&self, items: Vec<Suggestion<T>>) -> Vec<Suggestion<T>> {
        let mut seen = HashSet::new();
        items
            .into_iter()
            .filter(|s| seen.insert((self.key_fn)(s)))
            .collect()
    }
}

fn render<T: Clone>(state: &WidgetState<T>, key_fn: &KeyFn<T>) -> RenderSnapshot<T> {
    let items = state.nav.items().to_vec();
    let keys = items.iter().map(|item| key_fn(item)).collect();
    RenderSnapshot {
        items,
        keys,
        highlighted: state.nav.highlighted(),
        is_open: state.nav.is_open(),
        display_text: state.display_text.clone(),
        query: state.query.clone(),
        focused: state.focused,
    }
}

impl<T: Clone + Send + Sync> FetchSink<T> for Shared<T> {
    fn deliver(&self, seq: u64, outcome: FetchOutcome<T>) {
        match outcome {
            FetchOutcome::Results { items, source } => {
                let items = self.dedup(items);
                tracing::debug!(
                    widget = %self.id,
                    seq,
                    items = items.len(),
                    ?source,
                    "showing results"
                );
                self.update_from(seq, |state| {
                    if state.nav.highlighted().is_some() {
                        state.display_text = state.query.clone();
                    }
                    let focused = state.focused;
                    state.nav.show_results(items, focused);
                });
            }
            FetchOutcome::BelowMinimum => self.update_from(seq, |state| state.nav.clear()),
            FetchOutcome::Failed(e) => {
                tracing::debug!(widget = %self.id, "keeping previous results: {}", e);
            }
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`Widget`].
pub struct WidgetBuilder<K: SuggestionKind> {
    kind: K,
    transport: Arc<dyn Transport>,
    config: WidgetConfig,
    cache: Option<Arc<dyn SuggestionCache<K::Data>>>,
    value: Option<Suggestion<K::Data>>,
    on_commit: Option<CommitCallback<K::Data>>,
}

impl<K: SuggestionKind> WidgetBuilder<K> {
    /// Set the configuration.
    pub fn config(mut self, config: WidgetConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom cache. Enables caching regardless of `http_cache`.
    pub fn cache(mut self, cache: Arc<dyn SuggestionCache<K::Data>>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Initial bound value. `default_query` takes precedence for the text.
    pub fn value(mut self, value: Suggestion<K::Data>) -> Self {
        self.value = Some(value);
        self
    }

    /// Set the commit callback.
    pub fn on_commit(mut self, f: impl Fn(Commit<K::Data>) + Send + Sync + 'static) -> Self {
        self.on_commit = Some(Box::new(f));
        self
    }

    pub fn build(self) -> Widget<K> {
        let id = WidgetId::new();
        let kind = Arc::new(self.kind);

        let initial = self
            .config
            .default_query
            .clone()
            .or_else(|| self.value.as_ref().map(|v| v.value.clone()))
            .unwrap_or_default();

        let key_kind = kind.clone();
        let key_fn: KeyFn<K::Data> =
            Box::new(move |s: &Suggestion<K::Data>| key_kind.suggestion_key(s));

        let state = WidgetState {
            query: initial.clone(),
            display_text: initial,
            focused: false,
            nav: Navigation::new(),
            floor: 0,
        };
        let (tx, rx) = watch::channel(render(&state, &key_fn));
        let shared = Arc::new(Shared {
            id,
            key_fn,
            state: Mutex::new(state),
            tx,
            rx,
        });

        let cache = match self.cache {
            Some(cache) => Some(cache),
            None if self.config.http_cache => {
                Some(Arc::new(MemoryCache::new()) as Arc<dyn SuggestionCache<K::Data>>)
            }
            None => None,
        };

        let controller = FetchController::new(
            FetchConfig::from(&self.config),
            self.transport,
            cache,
            shared.clone() as Arc<dyn FetchSink<K::Data>>,
        );

        tracing::debug!(widget = %id, endpoint = kind.default_endpoint(), "widget created");

        Widget {
            kind,
            config: self.config,
            shared,
            controller,
            on_commit: self.on_commit,
        }
    }
}

// =============================================================================
// Widget
// =============================================================================

/// An autocomplete widget for one suggestion kind.
///
/// Must be used from inside a tokio runtime. Operations are synchronous;
/// fetch results arrive asynchronously and are visible through
/// [`Widget::snapshot`] and [`Widget::subscribe`].
pub struct Widget<K: SuggestionKind> {
    kind: Arc<K>,
    config: WidgetConfig,
    shared: Arc<Shared<K::Data>>,
    controller: FetchController<K::Data>,
    on_commit: Option<CommitCallback<K::Data>>,
}

impl<K: SuggestionKind> Widget<K> {
    /// Start building a widget.
    pub fn builder(kind: K, transport: Arc<dyn Transport>) -> WidgetBuilder<K> {
        WidgetBuilder {
            kind,
            transport,
            config: WidgetConfig::default(),
            cache: None,
            value: None,
            on_commit: None,
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Run mount-time behaviour: fetch the default text when `autoload` is set.
    pub fn mount(&self) {
        if !self.config.autoload {
            return;
        }
        let query = self.shared.state.lock().query.clone();
        if query.is_empty() {
            return;
        }
        tracing::debug!(widget = %self.id(), "autoloading {:?}", query);
        self.fetch(&query);
    }

    // -------------------------------------------------------------------------
    // Input Events
    // -------------------------------------------------------------------------

    /// The user edited the input.
    pub fn input_changed(&self, text: impl Into<String>) {
        let text = text.into();
        let floor = self.next_floor();
        self.shared.update(|state| {
            state.query = text.clone();
            state.display_text = text.clone();
            state.nav.unhighlight();
            state.floor = floor;
        });
        self.fetch(&text);
    }

    /// The input gained focus. Refreshes suggestions for the current text.
    pub fn focus(&self) {
        let query = self.shared.update(|state| {
            state.focused = true;
            state.query.clone()
        });
        self.fetch(&query);
    }

    /// The input lost focus.
    pub fn blur(&self) {
        let select_on_blur = self.config.select_on_blur;
        let floor = self.next_floor();
        let committed = self.shared.update(|state| {
            state.focused = false;
            commit_in(state, floor, |nav| nav.blur(select_on_blur))
        });

        if let Some(item) = committed {
            self.commit(item);
        }
    }

    /// Handle a navigation key. Returns `true` if the key was consumed.
    pub fn key(&self, key: NavKey) -> bool {
        match key {
            NavKey::Down => self.shared.update(|state| match state.nav.move_down() {
                Some(item) => {
                    state.display_text = item.value.clone();
                    true
                }
                None => false,
            }),
            NavKey::Up => self.shared.update(|state| match state.nav.move_up() {
                UpMove::Highlighted(item) => {
                    state.display_text = item.value.clone();
                    true
                }
                UpMove::Restored => {
                    state.display_text = state.query.clone();
                    true
                }
                UpMove::Unchanged => false,
            }),
            NavKey::Enter => {
                let floor = self.next_floor();
                let committed = self
                    .shared
                    .update(|state| commit_in(state, floor, |nav| nav.commit_highlighted()));
                match committed {
                    Some(item) => {
                        self.commit(item);
                        true
                    }
                    None => false,
                }
            }
            NavKey::Escape => {
                let floor = self.next_floor();
                let dismissed = self.shared.update(|state| {
                    let was_open = state.nav.dismiss();
                    if was_open {
                        state.display_text = state.query.clone();
                        state.floor = floor;
                    }
                    was_open
                });
                if dismissed {
                    self.controller.invalidate();
                }
                dismissed
            }
        }
    }

    /// Pointer-down on the item at `index`. Commits it regardless of the highlight.
    pub fn pointer_down(&self, index: usize) -> bool {
        let floor = self.next_floor();
        let committed = self
            .shared
            .update(|state| commit_in(state, floor, |nav| nav.commit_at(index)));

        match committed {
            Some(item) => {
                self.commit(item);
                true
            }
            None => false,
        }
    }

    // -------------------------------------------------------------------------
    // Imperative Operations
    // -------------------------------------------------------------------------

    /// External authoritative update of the bound value.
    ///
    /// Resets the text to the value's display string (empty for `None`),
    /// clears the list and does not fetch or commit.
    pub fn set_value(&self, value: Option<Suggestion<K::Data>>) {
        let text = value.map(|v| v.value).unwrap_or_default();
        self.controller.invalidate();
        self.shared.update(|state| {
            state.query = text.clone();
            state.display_text = text;
            state.nav.clear();
        });
    }

    /// Set the input text programmatically, without committing or fetching.
    pub fn set_input_value(&self, text: impl Into<String>) {
        let text = text.into();
        self.controller.invalidate();
        self.shared.update(|state| {
            state.query = text.clone();
            state.display_text = text;
            state.nav.unhighlight();
        });
    }

    /// Clear the input and the list, emitting [`Commit::Cleared`].
    pub fn clear(&self) {
        self.controller.invalidate();
        self.shared.update(|state| {
            state.query.clear();
            state.display_text.clear();
            state.nav.clear();
        });
        self.emit(Commit::Cleared);
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn id(&self) -> WidgetId {
        self.shared.id
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// The latest render snapshot.
    pub fn snapshot(&self) -> RenderSnapshot<K::Data> {
        self.shared.rx.borrow().clone()
    }

    /// Subscribe to render snapshots. Clone the receiver for each subscriber.
    pub fn subscribe(&self) -> watch::Receiver<RenderSnapshot<K::Data>> {
        self.shared.rx.clone()
    }

    pub fn phase(&self) -> NavPhase {
        self.shared.state.lock().nav.phase()
    }

    pub fn current_seq(&self) -> u64 {
        self.controller.current_seq()
    }

    /// Build the request the widget would send for `text`.
    pub fn request_for(&self, text: &str) -> TransportRequest {
        let endpoint = self
            .config
            .url
            .clone()
            .unwrap_or_else(|| self.kind.default_endpoint().to_string());

        let mut request = TransportRequest::new(
            endpoint,
            self.kind.payload(text, self.config.effective_count()),
        )
        .with_header("Content-Type", "application/json")
        .with_header("Accept", "application/json");

        if let Some(token) = &self.config.token {
            request = request.with_header("Authorization", format!("Token {}", token));
        }
        request
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Floor that closes every generation up to the current one.
    fn next_floor(&self) -> u64 {
        self.controller.current_seq() + 1
    }

    fn fetch(&self, text: &str) {
        let request = self.request_for(text);
        self.controller.on_query_changed(text, request);
    }

    fn commit(&self, item: Suggestion<K::Data>) {
        self.controller.invalidate();
        tracing::debug!(widget = %self.id(), value = %item.value, "committed");
        self.emit(Commit::Selected(item));
    }

    fn emit(&self, commit: Commit<K::Data>) {
        if let Some(on_commit) = &self.on_commit {
            on_commit(commit);
        }
    }
}

impl<K: SuggestionKind> Drop for Widget<K> {
    fn drop(&mut self) {
        tracing::debug!(widget = %self.shared.id, "widget torn down");
    }
}

/// Take the item chosen by `pick` and make it the input text.
///
/// Raises the floor to `floor` when something was committed; the caller then
/// invalidates the controller once the widget lock is released.
fn commit_in<T>(
    state: &mut WidgetState<T>,
    floor: u64,
    pick: impl FnOnce(&mut Navigation<T>) -> Option<Suggestion<T>>,
) -> Option<Suggestion<T>> {
    let item = pick(&mut state.nav)?;
    state.query = item.value.clone();
    state.display_text = item.value.clone();
    state.floor = floor;
    Some(item)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchSource;
    use crate::kind::GenericKind;
    use crate::transport::mock::ScriptedTransport;
    use serde_json::Value;
    use std::time::Duration;
    use tokio::sync::Notify;

    const ENDPOINT: &str = "https://suggest.test/address";

    const MOSCOW: [&str; 7] = [
        "г Москва",
        "Московская обл",
        "Мурманская обл, г Мончегорск",
        "Респ Мордовия",
        "Ставропольский край, г Минеральные Воды",
        "Мурманская обл, г Оленегорск",
        "Удмуртская Респ, г Можга",
    ];

    type Commits = Arc<Mutex<Vec<Commit<Value>>>>;

    fn widget(
        config: WidgetConfig,
        transport: Arc<ScriptedTransport>,
    ) -> (Widget<GenericKind>, Commits) {
        let commits: Commits = Arc::new(Mutex::new(Vec::new()));
        let sink = commits.clone();
        let widget = Widget::builder(GenericKind::new(ENDPOINT), transport)
            .config(config)
            .on_commit(move |c| sink.lock().push(c))
            .build();
        (widget, commits)
    }

    fn moscow() -> Arc<ScriptedTransport> {
        Arc::new(ScriptedTransport::new(&MOSCOW))
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    async fn typed(widget: &Widget<GenericKind>, text: &str) {
        widget.focus();
        settle().await;
        widget.input_changed(text);
        settle().await;
    }

    fn values(snapshot: &RenderSnapshot<Value>) -> Vec<&str> {
        snapshot.items.iter().map(|s| s.value.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_shows_results() {
        let (widget, _) = widget(WidgetConfig::default(), moscow());
        typed(&widget, "Мо").await;

        let snapshot = widget.snapshot();
        assert!(snapshot.is_open);
        assert_eq!(snapshot.items.len(), 7);
        assert_eq!(snapshot.highlighted, None);
        assert_eq!(widget.phase(), NavPhase::OpenNoHighlight);
    }

    #[tokio::test(start_paused = true)]
    async fn test_four_down_two_up() {
        let (widget, _) = widget(WidgetConfig::default(), moscow());
        typed(&widget, "Мо").await;

        for _ in 0..4 {
            assert!(widget.key(NavKey::Down));
        }
        widget.key(NavKey::Up);
        widget.key(NavKey::Up);

        let snapshot = widget.snapshot();
        assert_eq!(snapshot.highlighted, Some(1));
        assert_eq!(snapshot.display_text, "Московская обл");
        assert_eq!(snapshot.query, "Мо");
    }

    #[tokio::test(start_paused = true)]
    async fn test_down_clamps_at_last_item() {
        let (widget, _) = widget(WidgetConfig::default(), moscow());
        typed(&widget, "Мо").await;

        for _ in 0..10 {
            widget.key(NavKey::Down);
        }
        let snapshot = widget.snapshot();
        assert_eq!(snapshot.highlighted, Some(6));
        assert_eq!(snapshot.display_text, "Удмуртская Респ, г Можга");
    }

    #[tokio::test(start_paused = true)]
    async fn test_up_restores_typed_text() {
        let (widget, _) = widget(WidgetConfig::default(), moscow());
        typed(&widget, "Мо").await;

        widget.key(NavKey::Down);
        assert_eq!(widget.snapshot().display_text, "г Москва");

        widget.key(NavKey::Up);
        let snapshot = widget.snapshot();
        assert_eq!(snapshot.display_text, "Мо");
        assert_eq!(snapshot.highlighted, None);

        assert!(!widget.key(NavKey::Up));
        assert!(!widget.key(NavKey::Up));
        assert_eq!(widget.snapshot().display_text, "Мо");
        assert_eq!(widget.snapshot().highlighted, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_commits_highlighted_once() {
        let (widget, commits) = widget(WidgetConfig::default(), moscow());
        typed(&widget, "Мо").await;

        assert!(!widget.key(NavKey::Enter));
        assert!(commits.lock().is_empty());
        assert!(widget.snapshot().is_open);

        widget.key(NavKey::Down);
        assert!(widget.key(NavKey::Enter));
        settle().await;

        let commits = commits.lock();
        assert_eq!(commits.len(), 1);
        assert!(matches!(&commits[0], Commit::Selected(s) if s.value == "г Москва"));

        let snapshot = widget.snapshot();
        assert!(!snapshot.is_open);
        assert_eq!(snapshot.query, "г Москва");
        assert_eq!(snapshot.display_text, "г Москва");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pointer_down_ignores_highlight() {
        let (widget, commits) = widget(WidgetConfig::default(), moscow());
        typed(&widget, "Мо").await;

        widget.key(NavKey::Down);
        widget.key(NavKey::Down);
        widget.key(NavKey::Down);
        assert!(widget.pointer_down(1));

        let commits = commits.lock();
        assert_eq!(commits.len(), 1);
        assert!(matches!(&commits[0], Commit::Selected(s) if s.value == "Московская обл"));
        assert_eq!(widget.phase(), NavPhase::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_on_blur() {
        let config = WidgetConfig {
            select_on_blur: true,
            ..Default::default()
        };
        let (widget, commits) = widget(config, moscow());
        typed(&widget, "Мо").await;

        widget.blur();
        let commits = commits.lock();
        assert_eq!(commits.len(), 1);
        assert!(matches!(&commits[0], Commit::Selected(s) if s.value == "г Москва"));
        assert_eq!(widget.snapshot().display_text, "г Москва");
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_on_blur_after_escape_commits_nothing() {
        let config = WidgetConfig {
            select_on_blur: true,
            ..Default::default()
        };
        let (widget, commits) = widget(config, moscow());
        typed(&widget, "Мо").await;

        widget.key(NavKey::Escape);
        assert_eq!(widget.snapshot().items.len(), 7);
        widget.blur();

        assert!(commits.lock().is_empty());
        assert_eq!(widget.snapshot().display_text, "Мо");
    }

    #[tokio::test(start_paused = true)]
    async fn test_blur_closes_without_commit() {
        let (widget, commits) = widget(WidgetConfig::default(), moscow());
        typed(&widget, "Мо").await;

        widget.blur();
        assert!(commits.lock().is_empty());
        let snapshot = widget.snapshot();
        assert!(!snapshot.is_open);
        assert!(!snapshot.focused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_min_chars() {
        let config = WidgetConfig {
            min_chars: 3,
            ..Default::default()
        };
        let transport = moscow();
        let (widget, _) = widget(config, transport.clone());

        typed(&widget, "Мо").await;
        assert_eq!(transport.call_count(), 0);
        assert!(!widget.snapshot().is_open);

        widget.input_changed("Мос");
        settle().await;
        assert_eq!(transport.queries(), vec!["Мос".to_string()]);
        assert!(widget.snapshot().is_open);
        assert_eq!(widget.snapshot().items.len(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_fetches_current_text() {
        let transport = moscow();
        let (widget, _) = widget(WidgetConfig::default(), transport.clone());

        widget.focus();
        assert_eq!(transport.queries(), vec![String::new()]);
        assert_eq!(transport.calls()[0].endpoint, ENDPOINT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce() {
        let config = WidgetConfig {
            delay_ms: 50,
            ..Default::default()
        };
        let transport = moscow();
        let (widget, _) = widget(config, transport.clone());

        widget.input_changed("М");
        widget.input_changed("Мо");
        assert_eq!(transport.call_count(), 0);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(transport.queries(), vec!["Мо".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_order_keeps_latest() {
        let transport = Arc::new(
            ScriptedTransport::new(&[])
                .respond("М", &["old"], Duration::from_millis(100))
                .respond("Мо", &["new"], Duration::from_millis(10)),
        );
        let (widget, _) = widget(WidgetConfig::default(), transport);
        widget.focus();
        widget.input_changed("М");
        widget.input_changed("Мо");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(values(&widget.snapshot()), vec!["new"]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(values(&widget.snapshot()), vec!["new"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_keeps_list_and_text() {
        let transport = Arc::new(ScriptedTransport::new(&MOSCOW).fail("Мос", Duration::ZERO));
        let (widget, _) = widget(WidgetConfig::default(), transport);
        typed(&widget, "Мо").await;

        widget.input_changed("Мос");
        settle().await;

        let snapshot = widget.snapshot();
        assert!(snapshot.is_open);
        assert_eq!(snapshot.items.len(), 7);
        assert_eq!(snapshot.display_text, "Мос");
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_without_focus_stay_closed() {
        let (widget, _) = widget(WidgetConfig::default(), moscow());
        widget.input_changed("Мо");
        settle().await;

        let snapshot = widget.snapshot();
        assert_eq!(snapshot.items.len(), 7);
        assert!(!snapshot.is_open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_results_never_open() {
        let transport = Arc::new(ScriptedTransport::new(&[]));
        let (widget, _) = widget(WidgetConfig::default(), transport);
        typed(&widget, "zzz").await;
        assert!(!widget.snapshot().is_open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_value_resets_without_fetch() {
        let transport = moscow();
        let (widget, commits) = widget(WidgetConfig::default(), transport.clone());
        typed(&widget, "Мо").await;
        let calls = transport.call_count();

        widget.set_value(Some(Suggestion::new(
            "Краснодарский край, Мостовский р-н",
            Value::Null,
        )));
        settle().await;

        let snapshot = widget.snapshot();
        assert_eq!(snapshot.display_text, "Краснодарский край, Мостовский р-н");
        assert!(snapshot.items.is_empty());
        assert!(!snapshot.is_open);
        assert_eq!(transport.call_count(), calls);
        assert!(commits.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_value_discards_in_flight() {
        let transport = Arc::new(
            ScriptedTransport::new(&MOSCOW).respond("Мо", &["late"], Duration::from_millis(50)),
        );
        let (widget, _) = widget(WidgetConfig::default(), transport);
        widget.focus();
        settle().await;
        widget.input_changed("Мо");
        widget.set_value(None);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let snapshot = widget.snapshot();
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.display_text, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_input_value() {
        let transport = moscow();
        let (widget, commits) = widget(WidgetConfig::default(), transport.clone());

        widget.set_input_value("Test Value");
        settle().await;

        assert_eq!(widget.snapshot().display_text, "Test Value");
        assert_eq!(transport.call_count(), 0);
        assert!(commits.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_escape_restores_typed_text() {
        let (widget, _) = widget(WidgetConfig::default(), moscow());
        typed(&widget, "Мо").await;

        widget.key(NavKey::Down);
        assert!(widget.key(NavKey::Escape));

        let snapshot = widget.snapshot();
        assert!(!snapshot.is_open);
        assert_eq!(snapshot.display_text, "Мо");
        assert!(!widget.key(NavKey::Escape));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_emits_cleared() {
        let (widget, commits) = widget(WidgetConfig::default(), moscow());
        typed(&widget, "Мо").await;

        widget.clear();
        assert_eq!(*commits.lock(), vec![Commit::Cleared]);
        assert!(widget.snapshot().items.is_empty());
        assert_eq!(widget.snapshot().query, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_autoload() {
        let config = WidgetConfig {
            autoload: true,
            default_query: Some("Мос".to_string()),
            ..Default::default()
        };
        let transport = moscow();
        let (widget, _) = widget(config, transport.clone());
        assert_eq!(widget.snapshot().display_text, "Мос");

        widget.mount();
        assert_eq!(transport.queries(), vec!["Мос".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_autoload_without_flag_or_text() {
        let transport = moscow();
        let without_flag = WidgetConfig {
            default_query: Some("Мос".to_string()),
            ..Default::default()
        };
        let without_text = WidgetConfig {
            autoload: true,
            ..Default::default()
        };

        let (first, _) = widget(without_flag, transport.clone());
        first.mount();
        let (second, _) = widget(without_text, transport.clone());
        second.mount();

        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_value_text() {
        let widget = Widget::builder(GenericKind::new(ENDPOINT), moscow())
            .value(Suggestion::new("г Москва", Value::Null))
            .build();
        assert_eq!(widget.snapshot().display_text, "г Москва");
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_shape() {
        let config = WidgetConfig {
            url: Some("https://example.com".to_string()),
            token: Some("TEST_TOKEN".to_string()),
            count: 20,
            ..Default::default()
        };
        let transport = moscow();
        let (widget, _) = widget(config, transport.clone());
        widget.input_changed("Мос");

        let calls = transport.calls();
        let call = &calls[0];
        assert_eq!(call.endpoint, "https://example.com");
        assert_eq!(call.header("Authorization"), Some("Token TEST_TOKEN"));
        assert_eq!(call.payload["count"], 20);
        assert_eq!(call.payload["query"], "Мос");
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_cache_flag() {
        let config = WidgetConfig {
            http_cache: true,
            ..Default::default()
        };
        let transport = moscow();
        let (widget, _) = widget(config, transport.clone());
        typed(&widget, "Мо").await;
        widget.input_changed("Мос");
        settle().await;
        widget.input_changed("Мо");
        settle().await;

        assert_eq!(
            transport.queries(),
            vec![String::new(), "Мо".to_string(), "Мос".to_string()]
        );
        assert_eq!(widget.snapshot().items.len(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_shared_between_widgets() {
        let transport = moscow();
        let cache: Arc<dyn SuggestionCache<Value>> = Arc::new(MemoryCache::new());

        let first = Widget::builder(GenericKind::new(ENDPOINT), transport.clone())
            .cache(cache.clone())
            .build();
        let second = Widget::builder(GenericKind::new(ENDPOINT), transport.clone())
            .cache(cache)
            .build();

        typed(&first, "Мо").await;
        typed(&second, "Мо").await;

        assert_eq!(transport.call_count(), 2);
        assert_eq!(second.snapshot().items.len(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_keys_are_dropped() {
        let transport = Arc::new(ScriptedTransport::new(&["a", "a", "b"]));
        let (widget, _) = widget(WidgetConfig::default(), transport);
        typed(&widget, "x").await;

        let snapshot = widget.snapshot();
        assert_eq!(values(&snapshot), vec!["a", "b"]);
        assert_eq!(snapshot.keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_discards_in_flight() {
        let transport = Arc::new(
            ScriptedTransport::new(&MOSCOW).respond("Мос", &["late"], Duration::from_millis(50)),
        );
        let (widget, _) = widget(WidgetConfig::default(), transport);
        typed(&widget, "Мо").await;

        widget.input_changed("Мос");
        widget.key(NavKey::Down);
        widget.key(NavKey::Enter);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let snapshot = widget.snapshot();
        assert!(!snapshot.is_open);
        assert_eq!(snapshot.query, "г Москва");
    }

    fn late() -> FetchOutcome<Value> {
        FetchOutcome::Results {
            items: vec![Suggestion::new("late", Value::Null)],
            source: FetchSource::Network,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcome_of_committed_generation_is_ignored() {
        let (widget, _) = widget(WidgetConfig::default(), moscow());
        typed(&widget, "Мо").await;
        let seq = widget.current_seq();

        widget.key(NavKey::Down);
        widget.key(NavKey::Enter);
        widget.shared.deliver(seq, late());

        let snapshot = widget.snapshot();
        assert!(!snapshot.is_open);
        assert!(!values(&snapshot).contains(&"late"));
        assert_eq!(snapshot.query, "г Москва");
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcome_of_edited_query_is_ignored() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(ScriptedTransport::new(&MOSCOW).hold("Мос", &["held"], gate));
        let (widget, _) = widget(WidgetConfig::default(), transport);
        typed(&widget, "Мо").await;
        let seq = widget.current_seq();

        widget.input_changed("Мос");
        widget.shared.deliver(seq, late());

        let snapshot = widget.snapshot();
        assert_eq!(snapshot.items.len(), 7);
        assert_eq!(snapshot.display_text, "Мос");
    }

    #[tokio::test(start_paused = true)]
    async fn test_escape_ignores_outcome_of_dismissed_generation() {
        let (widget, _) = widget(WidgetConfig::default(), moscow());
        typed(&widget, "Мо").await;
        let seq = widget.current_seq();

        assert!(widget.key(NavKey::Escape));
        widget.shared.deliver(seq, late());
        assert!(!widget.snapshot().is_open);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_commit_wins_over_concurrent_response() {
        let gate = Arc::new(Notify::new());
        let transport =
            Arc::new(ScriptedTransport::new(&MOSCOW).hold("Мос", &["late"], gate.clone()));
        let (widget, commits) = widget(WidgetConfig::default(), transport);

        widget.focus();
        widget.input_changed("Мо");
        for _ in 0..200 {
            if widget.snapshot().is_open {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(widget.snapshot().is_open);

        widget.input_changed("Мос");
        assert!(widget.key(NavKey::Down));

        // Hold the widget lock while the response is released so its delivery
        // passes the sequence check and then waits on us, as in the Enter path.
        let mut state = widget.shared.state.lock();
        gate.notify_one();
        std::thread::sleep(Duration::from_millis(100));
        let floor = widget.next_floor();
        let committed = commit_in(&mut *state, floor, |nav| nav.commit_highlighted());
        drop(state);
        widget.commit(committed.expect("highlighted item"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(commits.lock().len(), 1);
        assert_eq!(widget.phase(), NavPhase::Closed);
        let state = widget.shared.state.lock();
        assert!(state.nav.items().iter().all(|s| s.value != "late"));
        assert_eq!(state.query, "г Москва");
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_cache_uses_configured_ttl() {
        let transport = moscow();
        let config = WidgetConfig {
            http_cache_ttl_ms: 1000,
            ..Default::default()
        };
        let widget = Widget::builder(GenericKind::new(ENDPOINT), transport.clone())
            .config(config)
            .cache(Arc::new(MemoryCache::new()))
            .build();
        typed(&widget, "Мо").await;

        widget.input_changed("Мо");
        settle().await;
        assert_eq!(transport.call_count(), 2);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        widget.input_changed("Мо");
        settle().await;
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_with_request_in_flight() {
        let transport = Arc::new(
            ScriptedTransport::new(&[]).respond("Мо", &["late"], Duration::from_millis(50)),
        );
        let (widget, _) = widget(WidgetConfig::default(), transport.clone());
        widget.focus();
        widget.input_changed("Мо");
        let rx = widget.subscribe();

        drop(widget);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(transport.call_count(), 2);
        assert!(rx.borrow().items.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_sees_updates() {
        let (widget, _) = widget(WidgetConfig::default(), moscow());
        let mut rx = widget.subscribe();

        widget.focus();
        widget.input_changed("Мо");
        rx.changed().await.unwrap();
        settle().await;

        assert_eq!(rx.borrow_and_update().items.len(), 7);
    }
}
