//! Sparse layer stack.

use std::sync::Arc;

use crate::view::PageView;

/// Slots indexed by layer number. Each slot holds at most one view; gaps are
/// allowed. The stack does not own its views' lifetimes: disposal is decided
/// by the manager.
#[derive(Debug, Default)]
pub(crate) struct LayerStack {
    slots: Vec<Option<Arc<PageView>>>,
}

impl LayerStack {
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Arc<PageView>> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Whether slot `index` holds exactly `view`.
    pub(crate) fn holds(&self, index: usize, view: &Arc<PageView>) -> bool {
        self.get(index).is_some_and(|current| Arc::ptr_eq(current, view))
    }

    /// Whether `view` occupies any slot.
    pub(crate) fn contains(&self, view: &Arc<PageView>) -> bool {
        self.position(view).is_some()
    }

    /// Index of the slot holding `view`.
    pub(crate) fn position(&self, view: &Arc<PageView>) -> Option<usize> {
        self.occupied()
            .find(|(_, current)| Arc::ptr_eq(current, view))
            .map(|(index, _)| index)
    }

    pub(crate) fn place(&mut self, index: usize, view: Arc<PageView>) {
        if self.slots.len() <= index {
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = Some(view);
    }

    pub(crate) fn clear(&mut self, index: usize) -> Option<Arc<PageView>> {
        let removed = self.slots.get_mut(index).and_then(Option::take);
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
        removed
    }

    /// Occupied slots, bottom first.
    pub(crate) fn occupied(&self) -> impl Iterator<Item = (usize, &Arc<PageView>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|view| (index, view)))
    }

    pub(crate) fn top(&self) -> Option<(usize, &Arc<PageView>)> {
        self.occupied().last()
    }

    pub(crate) fn snapshot(&self) -> Vec<Option<Arc<PageView>>> {
        self.slots.clone()
    }

    pub(crate) fn drain(&mut self) -> Vec<Arc<PageView>> {
        self.slots.drain(..).flatten().collect()
    }
}
