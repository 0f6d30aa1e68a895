/// Newest-first ordered log that never holds more than `limit` entries.
/// Inserting at capacity evicts the oldest entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CappedLog<T> {
    entries: Vec<T>,
    limit: usize,
}

impl<T> CappedLog<T> {
    /// Wraps entries already in newest-first order, trimming any overflow.
    pub fn from_entries(mut entries: Vec<T>, limit: usize) -> Self {
        entries.truncate(limit);
        Self { entries, limit }
    }

    /// Inserts at the front and returns whatever fell off the back.
    pub fn push(&mut self, entry: T) -> Vec<T> {
        self.entries.insert(0, entry);
        if self.entries.len() > self.limit {
            self.entries.split_off(self.limit)
        } else {
            Vec::new()
        }
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<T> {
        self.entries
    }
}
