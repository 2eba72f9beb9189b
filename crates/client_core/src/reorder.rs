//! Drag-to-reorder: maps a pointer position to an insertion index and keeps
//! the transient drag state apart from the collection.

use shared::domain::EntryId;

/// Vertical extent of one rendered item, as reported by the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedItem {
    pub id: EntryId,
    pub top: f32,
    pub height: f32,
}

impl RenderedItem {
    pub fn new(id: EntryId, top: f32, height: f32) -> Self {
        Self { id, top, height }
    }

    pub fn midpoint(&self) -> f32 {
        self.top + self.height / 2.0
    }
}

/// Index at which the dragged item should be inserted.
///
/// The dragged item is skipped, so the result indexes the list without it,
/// which is what [`Collection::move_to`](crate::collection::Collection::move_to)
/// expects. Among items whose midpoint lies below the pointer, the one with
/// the nearest midpoint wins; with none, the result is the end of the list.
pub fn insertion_index(
    items: &[RenderedItem],
    dragged: Option<EntryId>,
    pointer_y: f32,
) -> usize {
    let mut best: Option<(usize, f32)> = None;
    let mut position = 0;

    for item in items {
        if Some(item.id) == dragged {
            continue;
        }
        let offset = pointer_y - item.midpoint();
        if offset < 0.0 && best.map_or(true, |(_, closest)| offset > closest) {
            best = Some((position, offset));
        }
        position += 1;
    }

    best.map_or(position, |(index, _)| index)
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DragState {
    dragged: Option<EntryId>,
    placeholder: Option<usize>,
}

impl DragState {
    pub fn start(&mut self, id: EntryId) {
        self.dragged = Some(id);
        self.placeholder = None;
    }

    pub fn is_active(&self) -> bool {
        self.dragged.is_some()
    }

    pub fn dragged(&self) -> Option<EntryId> {
        self.dragged
    }

    pub fn placeholder(&self) -> Option<usize> {
        self.placeholder
    }

    /// Moves the visual placeholder only. Returns `None` when no drag is active.
    pub fn hover(&mut self, items: &[RenderedItem], pointer_y: f32) -> Option<usize> {
        let dragged = self.dragged?;
        let index = insertion_index(items, Some(dragged), pointer_y);
        self.placeholder = Some(index);
        Some(index)
    }

    /// Ends the drag, yielding the move to commit if the pointer ever hovered.
    pub fn finish(&mut self) -> Option<(EntryId, usize)> {
        let state = std::mem::take(self);
        Some((state.dragged?, state.placeholder?))
    }

    pub fn cancel(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
#[path = "tests/reorder_tests.rs"]
mod tests;
