//! Fixed-capacity FIFO storage for one channel.
//!
//! Mirrors the shape of the original C `buffer_t`: a capacity, a count, and
//! a head index into a flat backing store, with wraparound instead of
//! shifting elements on remove.

/// A fixed-capacity ring of message slots. Capacity 0 is legal and always
/// reports full-for-push and empty-for-pop; it is never actually indexed
/// into, since a zero-capacity channel never materializes a value here.
pub(crate) struct RingBuffer<T> {
    data: Vec<Option<T>>,
    head: usize,
    count: usize,
}

impl<T> RingBuffer<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        let mut data = Vec::with_capacity(capacity);
        data.resize_with(capacity, || None);
        RingBuffer {
            data,
            head: 0,
            count: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.count
    }

    pub(crate) fn is_full(&self) -> bool {
        self.count >= self.data.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Pushes `value` at the tail. Caller must have already checked
    /// `!is_full()`; capacity 0 is always full, so this is never called
    /// on a zero-capacity buffer.
    pub(crate) fn push(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }
        let cap = self.data.len();
        let tail = (self.head + self.count) % cap;
        self.data[tail] = Some(value);
        self.count += 1;
        Ok(())
    }

    /// Removes and returns the front value in FIFO order.
    pub(crate) fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let cap = self.data.len();
        let value = self.data[self.head].take();
        self.head = (self.head + 1) % cap;
        self.count -= 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut buf = RingBuffer::new(3);
        buf.push(1).unwrap();
        buf.push(2).unwrap();
        buf.push(3).unwrap();
        assert!(buf.push(4).is_err());
        assert_eq!(buf.pop(), Some(1));
        assert_eq!(buf.pop(), Some(2));
        buf.push(5).unwrap();
        assert_eq!(buf.pop(), Some(3));
        assert_eq!(buf.pop(), Some(5));
        assert_eq!(buf.pop(), None);
    }

    #[test]
    fn wraps_around() {
        let mut buf = RingBuffer::new(2);
        for i in 0..10 {
            buf.push(i).unwrap();
            assert_eq!(buf.pop(), Some(i));
        }
    }

    #[test]
    fn zero_capacity_is_always_full_and_empty() {
        let mut buf: RingBuffer<()> = RingBuffer::new(0);
        assert!(buf.is_full());
        assert!(buf.is_empty());
        assert!(buf.push(()).is_err());
        assert_eq!(buf.pop(), None);
    }

    #[test]
    fn null_payload_round_trips() {
        let mut buf: RingBuffer<Option<&'static str>> = RingBuffer::new(1);
        buf.push(None).unwrap();
        assert_eq!(buf.pop(), Some(None));
    }
}
