/// Fixed-capacity ring buffer. Oldest entry is overwritten when full.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    data: Vec<T>,
    head: usize,   // next slot to overwrite once full
    cap:  usize,
}

impl<T: Clone> RingBuffer<T> {
    /// A zero capacity is treated as one.
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self { data: Vec::with_capacity(cap), head: 0, cap }
    }

    pub fn push(&mut self, val: T) {
        if self.data.len() < self.cap {
            self.data.push(val);
        } else {
            self.data[self.head] = val;
            self.head = (self.head + 1) % self.cap;
        }
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (newer, older) = self.data.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    pub fn to_vec(&self) -> Vec<T> { self.iter().cloned().collect() }

    pub fn newest(&self) -> Option<&T> {
        if self.data.is_empty() { return None; }
        let idx = (self.head + self.data.len() - 1) % self.data.len();
        self.data.get(idx)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize { self.data.len() }

    #[cfg(test)]
    pub fn capacity(&self) -> usize { self.cap }
}
