#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod cell;

pub use cell::{HistoryOptions, StateWithHistory};

use std::{fmt, iter, rc::Rc};

/// The error type of [`HistoryManager::try_undo`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("nothing to undo")]
pub struct UndoError;

/// The error type of [`HistoryManager::try_redo`] and [`HistoryManager::redo_branch`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedoError {
    #[error("nothing to redo")]
    NothingToRedo,

    #[error("redo branch {index} out of range ({len} available)")]
    BranchOutOfRange { index: usize, len: usize },
}

/// A forward branch that is not currently being followed.
struct FutureNode<S> {
    state: Rc<S>,
    futures: Futures<S>,
}

impl<S> Clone for FutureNode<S> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            futures: self.futures.clone(),
        }
    }
}

/// Persistent list of forward branches, most recently abandoned first.
struct Futures<S>(Option<Rc<FutureCons<S>>>);

struct FutureCons<S> {
    head: FutureNode<S>,
    tail: Futures<S>,
}

impl<S> Futures<S> {
    const fn empty() -> Self {
        Self(None)
    }

    fn cons(head: FutureNode<S>, tail: Self) -> Self {
        Self(Some(Rc::new(FutureCons { head, tail })))
    }

    fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    fn split_first(&self) -> Option<(&FutureNode<S>, &Self)> {
        self.0.as_deref().map(|cons| (&cons.head, &cons.tail))
    }

    fn iter(&self) -> impl Iterator<Item = &FutureNode<S>> {
        iter::successors(self.split_first(), |&(_, tail)| tail.split_first())
            .map(|(head, _)| head)
    }
}

impl<S> Clone for Futures<S> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<S> Drop for Futures<S> {
    // Branches nest arbitrarily deep; unlink them iteratively.
    fn drop(&mut self) {
        let mut pending: Vec<_> = self.0.take().into_iter().collect();
        while let Some(link) = pending.pop() {
            if let Ok(mut cons) = Rc::try_unwrap(link) {
                pending.extend(cons.head.futures.0.take());
                pending.extend(cons.tail.0.take());
            }
        }
    }
}

/// A state that was once the present, everything before it, and the branches that were
/// waiting at that point.
struct PastNode<S> {
    state: Rc<S>,
    past: Option<Rc<PastNode<S>>>,
    alternative_futures: Futures<S>,
}

impl<S> Drop for PastNode<S> {
    fn drop(&mut self) {
        let mut next = self.past.take();
        while let Some(link) = next {
            next = match Rc::try_unwrap(link) {
                Ok(mut node) => node.past.take(),
                Err(_) => None,
            };
        }
    }
}

/// A pair of substructures still to be compared by [`structurally_eq`].
enum Comparison<'a, S> {
    Past(Option<&'a Rc<PastNode<S>>>, Option<&'a Rc<PastNode<S>>>),
    Futures(&'a Futures<S>, &'a Futures<S>),
}

/// Compares two histories node by node with an explicit worklist, skipping subtrees the two
/// sides share.
fn structurally_eq<S: PartialEq>(a: &HistoryManager<S>, b: &HistoryManager<S>) -> bool {
    if a.state != b.state {
        return false;
    }
    let mut pending = vec![
        Comparison::Futures(&a.futures, &b.futures),
        Comparison::Past(a.past.as_ref(), b.past.as_ref()),
    ];
    while let Some(comparison) = pending.pop() {
        match comparison {
            Comparison::Past(None, None) => {}
            Comparison::Past(Some(x), Some(y)) => {
                if Rc::ptr_eq(x, y) {
                    continue;
                }
                if x.state != y.state {
                    return false;
                }
                pending.push(Comparison::Futures(
                    &x.alternative_futures,
                    &y.alternative_futures,
                ));
                pending.push(Comparison::Past(x.past.as_ref(), y.past.as_ref()));
            }
            Comparison::Futures(x, y) => match (&x.0, &y.0) {
                (None, None) => {}
                (Some(x), Some(y)) => {
                    if Rc::ptr_eq(x, y) {
                        continue;
                    }
                    if x.head.state != y.head.state {
                        return false;
                    }
                    pending.push(Comparison::Futures(&x.head.futures, &y.head.futures));
                    pending.push(Comparison::Futures(&x.tail, &y.tail));
                }
                _ => return false,
            },
            Comparison::Past(..) => return false,
        }
    }
    true
}

/// An immutable undo/redo history that remembers every branch ever abandoned.
///
/// Every operation returns a new manager and leaves `self` as it was. Cloning is *O*(1) and
/// never clones `S`.
///
/// Equality compares the whole tree: states, past chain and every alternative branch.
pub struct HistoryManager<S> {
    state: Rc<S>,
    past: Option<Rc<PastNode<S>>>,
    futures: Futures<S>,
}

impl<S: PartialEq> PartialEq for HistoryManager<S> {
    fn eq(&self, other: &Self) -> bool {
        structurally_eq(self, other)
    }
}

impl<S: Eq> Eq for HistoryManager<S> {}

/// Shows the present, the past states newest first, and the states one redo away. Branches
/// further ahead are not shown.
impl<S: fmt::Debug> fmt::Debug for HistoryManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryManager")
            .field("state", &self.state)
            .field("past", &self.past_states().collect::<Vec<_>>())
            .field("futures", &self.redo_states().collect::<Vec<_>>())
            .finish()
    }
}

impl<S> Clone for HistoryManager<S> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            past: self.past.clone(),
            futures: self.futures.clone(),
        }
    }
}

impl<S: Default> Default for HistoryManager<S> {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

impl<S> From<S> for HistoryManager<S> {
    fn from(initial: S) -> Self {
        Self::new(initial)
    }
}

impl<S> HistoryManager<S> {
    /// Constructs a new history with the given initial state and nothing to undo or redo.
    ///
    /// # Example
    ///
    /// ```
    /// # use branching_history::*;
    /// let history = HistoryManager::new(42);
    /// assert_eq!(*history.current(), 42);
    /// assert!(!history.can_undo());
    /// assert!(!history.can_redo());
    /// ```
    pub fn new(initial: S) -> Self {
        Self {
            state: Rc::new(initial),
            past: None,
            futures: Futures::empty(),
        }
    }

    /// Returns the present state.
    pub fn current(&self) -> &S {
        &self.state
    }

    /// Returns a shared handle to the present state.
    pub fn current_rc(&self) -> Rc<S> {
        Rc::clone(&self.state)
    }

    /// Consumes the history and returns the present state.
    pub fn into_current(self) -> Rc<S> {
        self.state
    }

    /// Returns whether [`undo`](Self::undo) would change anything.
    pub fn can_undo(&self) -> bool {
        self.past.is_some()
    }

    /// Returns whether [`redo`](Self::redo) would change anything.
    pub fn can_redo(&self) -> bool {
        !self.futures.is_empty()
    }

    /// Returns the number of states before the present.
    ///
    /// # Time complexity
    ///
    /// Takes *O*(n) time in the number of past states.
    pub fn undo_depth(&self) -> usize {
        self.past_nodes().count()
    }

    /// Returns the states before the present, from newest to oldest.
    pub fn past_states(&self) -> impl Iterator<Item = &S> {
        self.past_nodes().map(|node| &*node.state)
    }

    /// Returns the states [`redo_branch`](Self::redo_branch) can move to, in index order.
    ///
    /// The first one is the state [`redo`](Self::redo) moves to.
    pub fn redo_states(&self) -> impl Iterator<Item = &S> {
        self.futures.iter().map(|node| &*node.state)
    }

    fn past_nodes(&self) -> impl Iterator<Item = &PastNode<S>> {
        iter::successors(self.past.as_deref(), |&node| node.past.as_deref())
    }

    /// Commits an edit and returns the resulting history.
    ///
    /// Anything that could have been redone is filed as an alternative future of the state
    /// being left, where a later [`undo`](Self::undo) will find it again. The new state is
    /// recorded even if it equals the present one; see
    /// [`update_if_changed`](Self::update_if_changed).
    ///
    /// # Example
    ///
    /// ```
    /// # use branching_history::*;
    /// let history = HistoryManager::new(1).update(2).update(3);
    /// assert_eq!(*history.current(), 3);
    /// assert_eq!(history.past_states().copied().collect::<Vec<_>>(), [2, 1]);
    /// ```
    ///
    /// # Time complexity
    ///
    /// Takes *O*(1) time.
    pub fn update(&self, new_state: S) -> Self {
        Self {
            state: Rc::new(new_state),
            past: Some(Rc::new(PastNode {
                state: Rc::clone(&self.state),
                past: self.past.clone(),
                alternative_futures: self.futures.clone(),
            })),
            futures: Futures::empty(),
        }
    }

    /// Moves back one state, or returns an error if there is nothing before the present.
    ///
    /// The state being left becomes the first thing to redo, ahead of any branches that were
    /// already waiting at the previous state.
    ///
    /// # Time complexity
    ///
    /// Takes *O*(1) time.
    pub fn try_undo(&self) -> Result<Self, UndoError> {
        let past = self.past.as_deref().ok_or(UndoError)?;
        let abandoned = FutureNode {
            state: Rc::clone(&self.state),
            futures: self.futures.clone(),
        };
        Ok(Self {
            state: Rc::clone(&past.state),
            past: past.past.clone(),
            futures: Futures::cons(abandoned, past.alternative_futures.clone()),
        })
    }

    /// Moves back one state. Returns an identical history if there is nothing to undo.
    ///
    /// # Example
    ///
    /// ```
    /// # use branching_history::*;
    /// let history = HistoryManager::new(1).update(2);
    /// assert_eq!(*history.undo().current(), 1);
    /// assert_eq!(*history.undo().undo().current(), 1);
    /// ```
    pub fn undo(&self) -> Self {
        match self.try_undo() {
            Ok(history) => history,
            Err(error) => {
                tracing::trace!(%error, "undo had no effect");
                self.clone()
            }
        }
    }

    /// Moves forward along the most recently abandoned branch, or returns an error if there
    /// is nothing to redo.
    ///
    /// # Time complexity
    ///
    /// Takes *O*(1) time.
    pub fn try_redo(&self) -> Result<Self, RedoError> {
        let (next, alternatives) = self.futures.split_first().ok_or(RedoError::NothingToRedo)?;
        Ok(self.redo_into(next, alternatives.clone()))
    }

    /// Moves forward along the most recently abandoned branch. Returns an identical history if
    /// there is nothing to redo.
    ///
    /// # Example
    ///
    /// ```
    /// # use branching_history::*;
    /// let history = HistoryManager::new(1).update(2).undo();
    /// assert_eq!(*history.redo().current(), 2);
    /// assert_eq!(*history.redo().redo().current(), 2);
    /// ```
    pub fn redo(&self) -> Self {
        match self.try_redo() {
            Ok(history) => history,
            Err(error) => {
                tracing::trace!(%error, "redo had no effect");
                self.clone()
            }
        }
    }

    /// Moves forward along the branch at `index` in [`redo_states`](Self::redo_states).
    ///
    /// Index 0 is equivalent to [`try_redo`](Self::try_redo). The branches not taken keep
    /// their order and become redoable again after an [`undo`](Self::undo).
    ///
    /// # Example
    ///
    /// ```
    /// # use branching_history::*;
    /// let history = HistoryManager::new(1).update(2).undo().update(3).undo();
    /// assert_eq!(history.redo_states().copied().collect::<Vec<_>>(), [3, 2]);
    /// assert_eq!(*history.redo_branch(1).unwrap().current(), 2);
    /// assert_eq!(
    ///     history.redo_branch(2),
    ///     Err(RedoError::BranchOutOfRange { index: 2, len: 2 })
    /// );
    /// ```
    ///
    /// # Time complexity
    ///
    /// Takes *O*(`index`) time.
    pub fn redo_branch(&self, index: usize) -> Result<Self, RedoError> {
        if self.futures.is_empty() {
            return Err(RedoError::NothingToRedo);
        }
        let mut skipped = Vec::new();
        let mut rest = &self.futures;
        while skipped.len() < index {
            let Some((node, tail)) = rest.split_first() else { break };
            skipped.push(node);
            rest = tail;
        }
        let (next, tail) = rest.split_first().ok_or(RedoError::BranchOutOfRange {
            index,
            len: skipped.len(),
        })?;
        let alternatives = skipped
            .into_iter()
            .rev()
            .fold(tail.clone(), |acc, node| Futures::cons(node.clone(), acc));
        Ok(self.redo_into(next, alternatives))
    }

    fn redo_into(&self, next: &FutureNode<S>, alternatives: Futures<S>) -> Self {
        Self {
            state: Rc::clone(&next.state),
            past: Some(Rc::new(PastNode {
                state: Rc::clone(&self.state),
                past: self.past.clone(),
                alternative_futures: alternatives,
            })),
            futures: next.futures.clone(),
        }
    }
}

impl<S: PartialEq> HistoryManager<S> {
    /// Like [`update`](Self::update), but returns an identical history when `new_state` equals
    /// the present state.
    ///
    /// # Example
    ///
    /// ```
    /// # use branching_history::*;
    /// let history = HistoryManager::new(1).update_if_changed(1);
    /// assert!(!history.can_undo());
    /// ```
    pub fn update_if_changed(&self, new_state: S) -> Self {
        if new_state == *self.state {
            tracing::trace!("skipping unchanged state");
            self.clone()
        } else {
            self.update(new_state)
        }
    }
}
