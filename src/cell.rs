use crate::{HistoryManager, RedoError, UndoError};
use tracing::debug;

/// Options for [`StateWithHistory`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HistoryOptions {
    /// Don't record an edit made through [`StateWithHistory::commit`] when it equals the
    /// present state.
    pub squash_unchanged: bool,
}

/// A mutable slot that always holds the most recent [`HistoryManager`].
///
/// Hosts that apply one change at a time can keep this instead of threading manager values
/// through their own state.
///
/// # Example
///
/// ```
/// # use branching_history::*;
/// let mut state = StateWithHistory::new(1);
/// state.set_state(state.state() + 1);
/// assert_eq!(*state.state(), 2);
/// assert!(state.undo());
/// assert!(!state.undo());
/// assert_eq!(*state.state(), 1);
/// ```
#[derive(Debug)]
pub struct StateWithHistory<S> {
    history: HistoryManager<S>,
    options: HistoryOptions,
}

impl<S> Clone for StateWithHistory<S> {
    fn clone(&self) -> Self {
        Self {
            history: self.history.clone(),
            options: self.options,
        }
    }
}

impl<S: Default> Default for StateWithHistory<S> {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

impl<S> From<HistoryManager<S>> for StateWithHistory<S> {
    fn from(history: HistoryManager<S>) -> Self {
        Self {
            history,
            options: HistoryOptions::default(),
        }
    }
}

impl<S> StateWithHistory<S> {
    /// Constructs a slot holding a fresh history of `initial` with default options.
    pub fn new(initial: S) -> Self {
        Self::with_options(initial, HistoryOptions::default())
    }

    /// Constructs a slot holding a fresh history of `initial`.
    pub fn with_options(initial: S, options: HistoryOptions) -> Self {
        Self {
            history: HistoryManager::new(initial),
            options,
        }
    }

    /// Returns the present state.
    pub fn state(&self) -> &S {
        self.history.current()
    }

    /// Returns the history currently held.
    pub fn history(&self) -> &HistoryManager<S> {
        &self.history
    }

    /// Consumes the slot and returns the history it held.
    pub fn into_history(self) -> HistoryManager<S> {
        self.history
    }

    /// Returns the options this slot was constructed with.
    pub fn options(&self) -> HistoryOptions {
        self.options
    }

    /// Records `new_state` as an edit, even if it equals the present state.
    pub fn set_state(&mut self, new_state: S) {
        self.history = self.history.update(new_state);
        debug!(depth = self.history.undo_depth(), "recorded edit");
    }

    /// Undoes the last edit. Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.try_undo() {
            Ok(history) => {
                self.history = history;
                debug!(
                    depth = self.history.undo_depth(),
                    branches = self.history.redo_states().count(),
                    "undid edit"
                );
                true
            }
            Err(UndoError) => false,
        }
    }

    /// Redoes the most recently undone edit. Returns `false` if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.history.try_redo() {
            Ok(history) => {
                self.history = history;
                debug!(
                    depth = self.history.undo_depth(),
                    branches = self.history.redo_states().count(),
                    "redid edit"
                );
                true
            }
            Err(_) => false,
        }
    }

    /// Redoes along a specific branch. See [`HistoryManager::redo_branch`].
    pub fn redo_branch(&mut self, index: usize) -> Result<(), RedoError> {
        self.history = self.history.redo_branch(index)?;
        debug!(
            index,
            depth = self.history.undo_depth(),
            branches = self.history.redo_states().count(),
            "redid edit on branch"
        );
        Ok(())
    }
}

impl<S: PartialEq> StateWithHistory<S> {
    /// Records `new_state` as an edit, honoring [`HistoryOptions::squash_unchanged`].
    ///
    /// Returns whether an edit was recorded.
    pub fn commit(&mut self, new_state: S) -> bool {
        if self.options.squash_unchanged && new_state == *self.state() {
            debug!(depth = self.history.undo_depth(), "squashed unchanged edit");
            return false;
        }
        self.set_state(new_state);
        true
    }
}
