//! Window stacking order
//!
//! [`WindowStack`] keeps windows from bottom to top, the last entry being the
//! frontmost. The in-memory host uses it for its visible window list and the
//! in-memory client model uses it for the sibling chain of top-level windows.

use std::collections::HashMap;
use std::hash::Hash;

/// Stacking order of windows with `O(1)` position lookup.
///
/// # Examples
///
/// ```
/// use winsync::stack::WindowStack;
///
/// let mut stack = WindowStack::new();
/// stack.push(1);
/// stack.push(2);
///
/// assert_eq!(stack.top(), Some(2));
/// assert_eq!(stack.front_to_back(), vec![2, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct WindowStack<T> {
    /// Windows ordered from bottom to top
    windows: Vec<T>,

    /// Fast lookup: window → position in stack
    positions: HashMap<T, usize>,
}

impl<T: Copy + Eq + Hash> WindowStack<T> {
    pub fn new() -> Self {
        Self {
            windows: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Adds a window on top.
    ///
    /// Returns `false` if the window was already present.
    pub fn push(&mut self, window: T) -> bool {
        if self.positions.contains_key(&window) {
            return false;
        }

        self.positions.insert(window, self.windows.len());
        self.windows.push(window);
        true
    }

    /// Removes a window, returning its previous position
    pub fn remove(&mut self, window: T) -> Option<usize> {
        let pos = self.positions.remove(&window)?;
        self.windows.remove(pos);
        self.rebuild_positions();
        Some(pos)
    }

    /// Moves (or adds) a window to the top
    pub fn raise_to_top(&mut self, window: T) {
        self.remove(window);
        self.push(window);
    }

    /// Moves (or adds) `window` directly above `anchor`.
    ///
    /// Returns `false` and leaves the stack untouched if `anchor` is not in
    /// the stack or is `window` itself.
    pub fn place_above(&mut self, window: T, anchor: T) -> bool {
        if window == anchor || !self.positions.contains_key(&anchor) {
            return false;
        }
        self.remove(window);
        let pos = self.positions.get(&anchor).map_or(self.windows.len(), |&p| p + 1);
        self.windows.insert(pos, window);
        self.rebuild_positions();
        true
    }

    /// Moves (or adds) `window` directly below `anchor`.
    pub fn place_below(&mut self, window: T, anchor: T) -> bool {
        if window == anchor || !self.positions.contains_key(&anchor) {
            return false;
        }
        self.remove(window);
        let pos = self.positions.get(&anchor).copied().unwrap_or(0);
        self.windows.insert(pos, window);
        self.rebuild_positions();
        true
    }

    /// Window directly in front of `window`
    pub fn above(&self, window: T) -> Option<T> {
        let pos = *self.positions.get(&window)?;
        self.windows.get(pos + 1).copied()
    }

    /// Window directly behind `window`
    pub fn below(&self, window: T) -> Option<T> {
        let pos = *self.positions.get(&window)?;
        pos.checked_sub(1).and_then(|p| self.windows.get(p).copied())
    }

    pub fn top(&self) -> Option<T> {
        self.windows.last().copied()
    }

    /// Windows from frontmost to backmost
    pub fn front_to_back(&self) -> Vec<T> {
        self.windows.iter().rev().copied().collect()
    }

    /// Windows from backmost to frontmost
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.windows.iter()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn contains(&self, window: T) -> bool {
        self.positions.contains_key(&window)
    }

    /// Position from the bottom, 0 being the backmost window
    pub fn position(&self, window: T) -> Option<usize> {
        self.positions.get(&window).copied()
    }

    fn rebuild_positions(&mut self) {
        self.positions.clear();
        for (i, &window) in self.windows.iter().enumerate() {
            self.positions.insert(window, i);
        }
    }
}

impl<T: Copy + Eq + Hash> Default for WindowStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_of(ids: &[u32]) -> WindowStack<u32> {
        let mut stack = WindowStack::new();
        for &id in ids {
            stack.push(id);
        }
        stack
    }

    #[test]
    fn test_push_and_duplicates() {
        let mut stack = WindowStack::new();
        assert!(stack.is_empty());
        assert!(stack.push(1));
        assert!(stack.push(2));
        assert!(!stack.push(1));

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.top(), Some(2));
        assert_eq!(stack.position(1), Some(0));
    }

    #[test]
    fn test_remove_rebuilds_positions() {
        let mut stack = stack_of(&[1, 2, 3]);
        assert_eq!(stack.remove(2), Some(1));
        assert_eq!(stack.remove(2), None);
        assert_eq!(stack.position(3), Some(1));
        assert!(!stack.contains(2));
    }

    #[test]
    fn test_raise_to_top() {
        let mut stack = stack_of(&[1, 2, 3]);
        stack.raise_to_top(1);
        assert_eq!(stack.front_to_back(), vec![1, 3, 2]);

        stack.raise_to_top(4);
        assert_eq!(stack.top(), Some(4));
    }

    #[test]
    fn test_place_relative() {
        let mut stack = stack_of(&[1, 2, 3]);

        assert!(stack.place_above(1, 2));
        assert_eq!(stack.front_to_back(), vec![3, 1, 2]);

        assert!(stack.place_below(3, 2));
        assert_eq!(stack.front_to_back(), vec![1, 2, 3]);

        // new windows can be placed directly
        assert!(stack.place_below(4, 1));
        assert_eq!(stack.front_to_back(), vec![1, 4, 2, 3]);
    }

    #[test]
    fn test_place_relative_to_missing_anchor() {
        let mut stack = stack_of(&[1, 2]);
        assert!(!stack.place_above(1, 9));
        assert!(!stack.place_below(1, 1));
        assert_eq!(stack.front_to_back(), vec![2, 1]);
    }

    #[test]
    fn test_neighbors() {
        let stack = stack_of(&[1, 2, 3]);
        assert_eq!(stack.above(2), Some(3));
        assert_eq!(stack.below(2), Some(1));
        assert_eq!(stack.above(3), None);
        assert_eq!(stack.below(1), None);
        assert_eq!(stack.above(7), None);
    }
}
