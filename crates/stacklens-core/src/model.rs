//! # List Models
//!
//! Render-ready state of the two lists the view drives: the frames of the
//! selected stack and the (filtered) thread list. Front-ends only read these;
//! all mutation goes through [`FramesView`](crate::view::FramesView).

use crate::types::{FrameRef, StackFrame, StackId, StackRef};

/// One row of the frame list.
#[derive(Debug, Clone)]
pub enum FrameEntry
{
    /// A loaded frame.
    Frame(FrameRef),
    /// Terminal error reported by the backend.
    Error(String),
    /// More frames are on their way.
    Loading,
}

impl FrameEntry
{
    /// `true` for the loading placeholder.
    #[must_use]
    pub const fn is_placeholder(&self) -> bool
    {
        matches!(self, Self::Loading)
    }

    /// The frame of this row, if it is one.
    #[must_use]
    pub const fn as_frame(&self) -> Option<&FrameRef>
    {
        match self {
            Self::Frame(frame) => Some(frame),
            _ => None,
        }
    }
}

/// Frames of the currently selected stack.
#[derive(Debug, Default)]
pub struct FrameListModel
{
    entries: Vec<FrameEntry>,
    selected: Option<usize>,
    scroll_offset: usize,
}

impl FrameListModel
{
    /// All rows, in display order.
    #[must_use]
    pub fn entries(&self) -> &[FrameEntry]
    {
        &self.entries
    }

    /// Number of rows including placeholders.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    /// `true` if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }

    /// Row at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&FrameEntry>
    {
        self.entries.get(index)
    }

    /// Index of the selected row.
    #[must_use]
    pub const fn selected_index(&self) -> Option<usize>
    {
        self.selected
    }

    /// Frame of the selected row, if that row is a frame.
    #[must_use]
    pub fn selected_frame(&self) -> Option<&FrameRef>
    {
        self.selected.and_then(|index| self.entries.get(index)).and_then(FrameEntry::as_frame)
    }

    /// First row holding a frame equal to `frame`.
    #[must_use]
    pub fn position_of(&self, frame: &dyn StackFrame) -> Option<usize>
    {
        self.entries
            .iter()
            .position(|entry| entry.as_frame().is_some_and(|candidate| candidate.same_frame(frame)))
    }

    /// `true` if the last row is the loading placeholder.
    #[must_use]
    pub fn has_loading_tail(&self) -> bool
    {
        matches!(self.entries.last(), Some(FrameEntry::Loading))
    }

    /// First visible row.
    #[must_use]
    pub const fn scroll_offset(&self) -> usize
    {
        self.scroll_offset
    }

    pub(crate) fn set_scroll_offset(&mut self, offset: usize)
    {
        self.scroll_offset = offset;
    }

    pub(crate) fn select(&mut self, index: Option<usize>)
    {
        self.selected = index.filter(|index| *index < self.entries.len());
    }

    pub(crate) fn push(&mut self, entry: FrameEntry)
    {
        self.entries.push(entry);
    }

    pub(crate) fn clear(&mut self)
    {
        self.entries.clear();
        self.selected = None;
    }

    /// Insert `values` before a trailing placeholder, then add the placeholder
    /// if more is coming or drop it if this was the final batch.
    pub(crate) fn splice_batch(&mut self, values: Vec<FrameEntry>, last: bool)
    {
        let loading = self.has_loading_tail();
        let insert_at = if loading { self.entries.len() - 1 } else { self.entries.len() };
        self.entries.splice(insert_at..insert_at, values);

        if last {
            if loading {
                self.entries.pop();
            }
        } else if !loading {
            self.entries.push(FrameEntry::Loading);
        }
    }
}

/// One row of the thread list.
#[derive(Debug, Clone)]
pub enum ThreadEntry
{
    /// A known execution stack.
    Stack(StackRef),
    /// Thread discovery still running.
    Loading,
}

impl ThreadEntry
{
    /// The stack of this row, if it is one.
    #[must_use]
    pub const fn as_stack(&self) -> Option<&StackRef>
    {
        match self {
            Self::Stack(stack) => Some(stack),
            Self::Loading => None,
        }
    }
}

/// Visible threads plus the filter field state.
#[derive(Debug)]
pub struct ThreadListModel
{
    entries: Vec<ThreadEntry>,
    selected: Option<StackId>,
    filter_text: String,
    busy: bool,
    chooser_visible: bool,
}

impl Default for ThreadListModel
{
    fn default() -> Self
    {
        Self {
            entries: Vec::new(),
            selected: None,
            filter_text: String::new(),
            busy: false,
            chooser_visible: true,
        }
    }
}

impl ThreadListModel
{
    /// All rows, in display order.
    #[must_use]
    pub fn entries(&self) -> &[ThreadEntry]
    {
        &self.entries
    }

    /// Visible stacks, skipping placeholders.
    pub fn stacks(&self) -> impl Iterator<Item = &StackRef>
    {
        self.entries.iter().filter_map(ThreadEntry::as_stack)
    }

    /// Row index of `stack`.
    #[must_use]
    pub fn position(&self, stack: StackId) -> Option<usize>
    {
        self.entries
            .iter()
            .position(|entry| entry.as_stack().is_some_and(|candidate| candidate.id() == stack))
    }

    /// `true` if `stack` is visible.
    #[must_use]
    pub fn contains(&self, stack: StackId) -> bool
    {
        self.position(stack).is_some()
    }

    /// Selected stack.
    #[must_use]
    pub const fn selected(&self) -> Option<StackId>
    {
        self.selected
    }

    /// Current filter text.
    #[must_use]
    pub fn filter_text(&self) -> &str
    {
        &self.filter_text
    }

    /// `true` while stack-trace digests are being computed.
    #[must_use]
    pub const fn is_busy(&self) -> bool
    {
        self.busy
    }

    /// `false` when the only thread has no name and the chooser is pointless.
    #[must_use]
    pub const fn is_chooser_visible(&self) -> bool
    {
        self.chooser_visible
    }

    /// `true` if the last row is the loading placeholder.
    #[must_use]
    pub fn has_loading_tail(&self) -> bool
    {
        matches!(self.entries.last(), Some(ThreadEntry::Loading))
    }

    pub(crate) fn set_selected(&mut self, stack: Option<StackId>)
    {
        self.selected = stack;
    }

    pub(crate) fn set_filter_text(&mut self, text: String)
    {
        self.filter_text = text;
    }

    pub(crate) fn set_busy(&mut self, busy: bool)
    {
        self.busy = busy;
    }

    pub(crate) fn set_chooser_visible(&mut self, visible: bool)
    {
        self.chooser_visible = visible;
    }

    /// Append `stack`, keeping a trailing placeholder last.
    pub(crate) fn push_stack(&mut self, stack: StackRef)
    {
        if self.has_loading_tail() {
            let at = self.entries.len() - 1;
            self.entries.insert(at, ThreadEntry::Stack(stack));
        } else {
            self.entries.push(ThreadEntry::Stack(stack));
        }
    }

    pub(crate) fn insert_placeholder(&mut self)
    {
        if !self.has_loading_tail() {
            self.entries.push(ThreadEntry::Loading);
        }
    }

    pub(crate) fn remove_placeholder(&mut self)
    {
        self.entries.retain(|entry| !matches!(entry, ThreadEntry::Loading));
    }

    /// Replace the visible stacks, keeping the placeholder if present.
    pub(crate) fn replace_stacks(&mut self, stacks: Vec<StackRef>)
    {
        let loading = self.has_loading_tail();
        self.entries = stacks.into_iter().map(ThreadEntry::Stack).collect();
        if loading {
            self.entries.push(ThreadEntry::Loading);
        }
    }

    pub(crate) fn clear(&mut self)
    {
        self.entries.clear();
        self.selected = None;
    }
}

#[cfg(test)]
mod tests
{
    use std::any::Any;
    use std::fmt;
    use std::sync::Arc;

    use super::*;

    struct Numbered(usize);

    impl fmt::Display for Numbered
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
        {
            write!(f, "frame {}", self.0)
        }
    }

    impl StackFrame for Numbered
    {
        fn as_any(&self) -> &dyn Any
        {
            self
        }

        fn same_frame(&self, other: &dyn StackFrame) -> bool
        {
            other.as_any().downcast_ref::<Self>().is_some_and(|other| other.0 == self.0)
        }
    }

    fn frames(range: std::ops::Range<usize>) -> Vec<FrameEntry>
    {
        range.map(|n| FrameEntry::Frame(Arc::new(Numbered(n)))).collect()
    }

    fn render(model: &FrameListModel) -> Vec<String>
    {
        model
            .entries()
            .iter()
            .map(|entry| match entry {
                FrameEntry::Frame(frame) => frame.to_string(),
                FrameEntry::Error(message) => format!("error: {message}"),
                FrameEntry::Loading => "<loading>".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_splice_keeps_placeholder_last_until_final_batch()
    {
        let mut model = FrameListModel::default();

        model.splice_batch(frames(0..2), false);
        assert_eq!(render(&model), vec!["frame 0", "frame 1", "<loading>"]);

        model.splice_batch(frames(2..3), false);
        assert_eq!(render(&model), vec!["frame 0", "frame 1", "frame 2", "<loading>"]);

        model.splice_batch(frames(3..4), true);
        assert_eq!(render(&model), vec!["frame 0", "frame 1", "frame 2", "frame 3"]);
    }

    #[test]
    fn test_error_entry_replaces_placeholder()
    {
        let mut model = FrameListModel::default();
        model.splice_batch(frames(0..1), false);
        model.splice_batch(vec![FrameEntry::Error("boom".to_string())], true);

        assert_eq!(render(&model), vec!["frame 0", "error: boom"]);
    }

    #[test]
    fn test_position_uses_frame_equality()
    {
        let mut model = FrameListModel::default();
        model.splice_batch(frames(0..4), true);

        assert_eq!(model.position_of(&Numbered(2)), Some(2));
        assert_eq!(model.position_of(&Numbered(9)), None);
    }

    #[test]
    fn test_select_out_of_range_clears_selection()
    {
        let mut model = FrameListModel::default();
        model.splice_batch(frames(0..2), true);

        model.select(Some(1));
        assert_eq!(model.selected_index(), Some(1));

        model.select(Some(5));
        assert_eq!(model.selected_index(), None);
    }
}
