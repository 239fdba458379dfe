use crate::codec::{Sample, FEATURES_PER_SAMPLE};

pub const DEFAULT_WINDOW_SIZE: usize = 60;

/// A full, immutable batch drained from a [`WindowBuffer`].
#[derive(Debug, Clone, PartialEq)]
pub struct Window<T> {
    items: Vec<T>,
}

impl<T> Window<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl Window<Sample> {
    /// Row-major `(len, 6)` feature matrix.
    pub fn to_features(&self) -> Vec<f32> {
        let mut features = Vec::with_capacity(self.items.len() * FEATURES_PER_SAMPLE);
        for sample in &self.items {
            features.extend_from_slice(&sample.features());
        }
        features
    }
}

/// Tumbling window: consecutive windows never share items.
#[derive(Debug)]
pub struct WindowBuffer<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> WindowBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be non-zero");
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `item`. When this fills the buffer the full window is moved
    /// out and the buffer is left empty.
    pub fn push(&mut self, item: T) -> Option<Window<T>> {
        self.items.push(item);
        if self.items.len() < self.capacity {
            return None;
        }

        let items = std::mem::replace(&mut self.items, Vec::with_capacity(self.capacity));
        Some(Window { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discards the partial window.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T> Default for WindowBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_emits_on_nth_push() {
        let mut buffer = WindowBuffer::new(60);
        for i in 0..59 {
            assert!(buffer.push(i).is_none());
            assert_eq!(buffer.len(), i + 1);
        }
        let window = buffer.push(59).unwrap();
        assert_eq!(window.len(), 60);
        assert_eq!(window.items(), (0..60).collect::<Vec<_>>().as_slice());
        assert_eq!(buffer.len(), 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_windows_are_disjoint() {
        let mut buffer = WindowBuffer::new(3);
        let windows: Vec<_> = (0..10).filter_map(|i| buffer.push(i)).collect();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].items(), &[0, 1, 2]);
        assert_eq!(windows[1].items(), &[3, 4, 5]);
        assert_eq!(windows[2].items(), &[6, 7, 8]);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_clear_discards_partial() {
        let mut buffer = WindowBuffer::new(4);
        buffer.push('a');
        buffer.push('b');
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.push('c').is_none());
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_capacity_one() {
        let mut buffer = WindowBuffer::new(1);
        assert_eq!(buffer.push(7).unwrap().into_inner(), vec![7]);
        assert_eq!(buffer.capacity(), 1);
    }
}
