use crate::waveform::ScopeError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayPoint {
    /// Seconds from the start of the page.
    pub time: f64,
    /// Reduced amplitude in raw sample units.
    pub amplitude: i32,
}

/// Fixed-capacity page of display points, cleared and reused for the whole session.
#[derive(Debug)]
pub struct PageBuffer {
    points: Vec<DisplayPoint>,
    capacity: usize,
}

impl PageBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, point: DisplayPoint) -> Result<(), ScopeError> {
        if self.is_full() {
            return Err(ScopeError::BufferOverflow {
                capacity: self.capacity,
            });
        }
        self.points.push(point);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.points.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keeps the allocation.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[DisplayPoint] {
        &self.points
    }

    pub fn snapshot(&self) -> Vec<DisplayPoint> {
        self.points.clone()
    }

    /// Replaces the contents with `other`'s points and empties `other`.
    pub fn take_from(&mut self, other: &mut PageBuffer) {
        self.points.clear();
        self.points.extend(other.points.drain(..).take(self.capacity));
    }
}
