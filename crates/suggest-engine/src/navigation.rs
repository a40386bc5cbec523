//! Selection/navigation state machine for the suggestion list.
//!
//! These types are runtime-independent to enable testing and clear separation.
//! The machine never touches input text; transitions return what the caller
//! needs (an item to preview, a signal to restore typed text, a committed item).

use suggest_core::Suggestion;

// =============================================================================
// Phase
// =============================================================================

/// Observable phase of the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavPhase {
    /// List hidden.
    Closed,
    /// List shown, the input text is authoritative.
    OpenNoHighlight,
    /// List shown with the given item highlighted and previewed.
    OpenHighlighted(usize),
}

/// Result of an upward move.
#[derive(Debug, PartialEq)]
pub enum UpMove<'a, T> {
    /// The highlight moved to this item.
    Highlighted(&'a Suggestion<T>),
    /// The highlight moved past the top; restore the typed text.
    Restored,
    /// Nothing changed.
    Unchanged,
}

// =============================================================================
// Navigation
// =============================================================================

/// Ordered result list with a highlight cursor.
///
/// Invariants: the highlight, when set, indexes into `items`; the list is
/// only open when `items` is non-empty.
#[derive(Debug, Clone)]
pub struct Navigation<T> {
    items: Vec<Suggestion<T>>,
    highlighted: Option<usize>,
    open: bool,
}

impl<T> Default for Navigation<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            highlighted: None,
            open: false,
        }
    }
}

impl<T: Clone> Navigation<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list with a fresh result set.
    ///
    /// The highlight always resets, even when items overlap the previous set.
    pub fn show_results(&mut self, items: Vec<Suggestion<T>>, focused: bool) {
        self.open = focused && !items.is_empty();
        self.items = items;
        self.highlighted = None;
    }

    /// Empty the list and close it.
    pub fn clear(&mut self) {
        self.items.clear();
        self.highlighted = None;
        self.open = false;
    }

    /// Close the list, keeping its items.
    pub fn close(&mut self) {
        self.highlighted = None;
        self.open = false;
    }

    /// Drop the highlight without closing.
    pub fn unhighlight(&mut self) {
        self.highlighted = None;
    }

    /// Advance the highlight by one, clamped to the last item.
    ///
    /// Returns the item to preview, or `None` when the list is closed.
    pub fn move_down(&mut self) -> Option<&Suggestion<T>> {
        if !self.open {
            return None;
        }
        let last = self.items.len().checked_sub(1)?;
        let next = match self.highlighted {
            None => 0,
            Some(i) => (i + 1).min(last),
        };
        self.highlighted = Some(next);
        self.items.get(next)
    }

    /// Move the highlight up by one. Past the top the highlight clears.
    pub fn move_up(&mut self) -> UpMove<'_, T> {
        if !self.open {
            return UpMove::Unchanged;
        }
        match self.highlighted {
            None => UpMove::Unchanged,
            Some(0) => {
                self.highlighted = None;
                UpMove::Restored
            }
            Some(i) => {
                self.highlighted = Some(i - 1);
                match self.items.get(i - 1) {
                    Some(item) => UpMove::Highlighted(item),
                    None => UpMove::Unchanged,
                }
            }
        }
    }

    /// Commit the highlighted item and close. No effect without a highlight.
    pub fn commit_highlighted(&mut self) -> Option<Suggestion<T>> {
        if !self.open {
            return None;
        }
        let item = self.items.get(self.highlighted?)?.clone();
        self.close();
        Some(item)
    }

    /// Commit the item at `index` (pointer-down) regardless of the highlight.
    pub fn commit_at(&mut self, index: usize) -> Option<Suggestion<T>> {
        let item = self.items.get(index)?.clone();
        self.close();
        Some(item)
    }

    /// Handle focus loss. Always closes.
    ///
    /// With `select_on_blur` and an open list, commits the highlighted item,
    /// or the first item when nothing is highlighted. A closed list commits
    /// nothing even when it still holds items.
    pub fn blur(&mut self, select_on_blur: bool) -> Option<Suggestion<T>> {
        let committed = if select_on_blur && self.open {
            self.items.get(self.highlighted.unwrap_or(0)).cloned()
        } else {
            None
        };
        self.close();
        committed
    }

    /// Close on Escape. Returns whether the list was open.
    pub fn dismiss(&mut self) -> bool {
        let was_open = self.open;
        self.close();
        was_open
    }

    pub fn phase(&self) -> NavPhase {
        match (self.open, self.highlighted) {
            (false, _) => NavPhase::Closed,
            (true, None) => NavPhase::OpenNoHighlight,
            (true, Some(i)) => NavPhase::OpenHighlighted(i),
        }
    }

    pub fn items(&self) -> &[Suggestion<T>] {
        &self.items
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn highlighted_item(&self) -> Option<&Suggestion<T>> {
        self.highlighted.and_then(|i| self.items.get(i))
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
