/// Anything that takes effect at a point in time.
pub trait Timed {
    /// Seconds from the start of the piece
    fn start_time(&self) -> f64;
}

/// Signatures sorted ascending by start time.
///
/// Equal start times keep insertion order, so the later insert wins a lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct Timeline<T> {
    entries: Vec<T>,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T: Timed> Timeline<T> {
    pub fn new(mut entries: Vec<T>) -> Self {
        // Stable sort keeps authored order for ties
        entries.sort_by(|a, b| a.start_time().total_cmp(&b.start_time()));
        Self { entries }
    }

    pub fn insert(&mut self, entry: T) {
        let t = entry.start_time();
        let idx = self.entries.partition_point(|e| e.start_time() <= t);
        self.entries.insert(idx, entry);
    }

    /// Most recent entry with `start_time <= time`, if any.
    pub fn at(&self, time: f64) -> Option<&T> {
        let idx = self.entries.partition_point(|e| e.start_time() <= time);
        idx.checked_sub(1).map(|i| &self.entries[i])
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Timed + Clone + Default> Timeline<T> {
    /// Like [`Timeline::at`], falling back to `T::default()`.
    pub fn resolve(&self, time: f64) -> T {
        self.at(time).cloned().unwrap_or_default()
    }
}
