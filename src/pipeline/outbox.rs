//! Bounded per-stage output buffer.

use std::collections::VecDeque;

use crate::file::FileRecord;

/// Number of files an outbox holds before it reports back-pressure.
pub const HIGH_WATER_MARK: usize = 64;

/// Files emitted by a stage and not yet taken by the next one.
///
/// `ready` never grows past [`HIGH_WATER_MARK`] through [`push_all`]; the
/// overflow waits in `pending` and moves up as the consumer pops. Order is
/// preserved across both queues.
///
/// [`push_all`]: Outbox::push_all
#[derive(Debug, Default)]
pub struct Outbox {
    ready: VecDeque<FileRecord>,
    pending: VecDeque<FileRecord>,
}

impl Outbox {
    /// Empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit one file. Returns whether the outbox can take more without
    /// exceeding the high-water mark.
    pub fn push(&mut self, file: FileRecord) -> bool {
        if self.pending.is_empty() {
            self.ready.push_back(file);
        } else {
            self.pending.push_back(file);
        }
        self.can_accept()
    }

    /// Emit a batch; files beyond the high-water mark are released only as
    /// the consumer drains.
    pub fn push_all(&mut self, files: impl IntoIterator<Item = FileRecord>) {
        for file in files {
            if self.pending.is_empty() && self.can_accept() {
                self.ready.push_back(file);
            } else {
                self.pending.push_back(file);
            }
        }
    }

    /// Whether the ready queue is below the high-water mark.
    #[must_use]
    pub fn can_accept(&self) -> bool {
        self.pending.is_empty() && self.ready.len() < HIGH_WATER_MARK
    }

    /// Take the oldest file.
    pub fn pop(&mut self) -> Option<FileRecord> {
        let file = self.ready.pop_front()?;
        while self.ready.len() < HIGH_WATER_MARK {
            match self.pending.pop_front() {
                Some(next) => self.ready.push_back(next),
                None => break,
            }
        }
        Some(file)
    }

    /// Files held, ready or pending.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ready.len() + self.pending.len()
    }

    /// Whether nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Files currently released to the consumer.
    #[must_use]
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }
}
