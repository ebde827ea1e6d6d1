use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    #[error("stack full ({capacity} values)")]
    StackFull { capacity: usize },

    #[error("no more objects in stack")]
    NoMoreObjectsInStack,
}

/// A fixed-depth, last-in-first-out stack of values.
///
/// Slots are filled from the top of the array down: the first value pushed goes in the last slot.
#[derive(Debug, Clone)]
pub struct Stack<T> {
    slots: Box<[Option<T>]>,

    /// Number of free slots, the next push goes right below it
    free: usize,
}

impl<T> Stack<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            free: capacity,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of values in the stack
    #[must_use]
    pub fn len(&self) -> usize {
        self.capacity() - self.free
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.free == self.capacity()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.free == 0
    }

    /// Index of the slot the next value will be pushed to, `-1` when the stack is full
    #[must_use]
    pub fn pointer(&self) -> isize {
        // The capacity of a boxed slice always fits in an isize
        #[allow(clippy::cast_possible_wrap)]
        let free = self.free as isize;
        free - 1
    }

    /// Push a value on top of the stack
    ///
    /// # Errors
    ///
    /// Fails with [`StackError::StackFull`] if every slot is used.
    pub fn push(&mut self, value: T) -> Result<(), StackError> {
        if self.is_full() {
            return Err(StackError::StackFull {
                capacity: self.capacity(),
            });
        }

        self.free -= 1;
        trace!(slot = self.free, "Pushing value");
        self.slots[self.free] = Some(value);
        Ok(())
    }

    /// Take the value on top of the stack, clearing its slot
    ///
    /// # Errors
    ///
    /// Fails with [`StackError::NoMoreObjectsInStack`] if the stack is empty.
    pub fn pop(&mut self) -> Result<T, StackError> {
        let value = self
            .slots
            .get_mut(self.free)
            .and_then(Option::take)
            .ok_or(StackError::NoMoreObjectsInStack)?;
        trace!(slot = self.free, "Popping value");
        self.free += 1;
        Ok(value)
    }

    /// Look at the value on top of the stack
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.slots.get(self.free).and_then(Option::as_ref)
    }

    /// Values from the top of the stack to the bottom
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots[self.free..].iter().flatten()
    }
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new(crate::constants::STACK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn lifo_test() {
        let mut stack = Stack::new(5);
        for value in 1..=5 {
            stack.push(value).unwrap();
        }

        assert_eq!(stack.push(6), Err(StackError::StackFull { capacity: 5 }));
        assert_eq!(stack.iter().copied().collect::<Vec<_>>(), vec![5, 4, 3, 2, 1]);

        let popped: Vec<_> = (0..5).map(|_| stack.pop().unwrap()).collect();
        assert_eq!(popped, vec![5, 4, 3, 2, 1]);
        assert_eq!(stack.pop(), Err(StackError::NoMoreObjectsInStack));
    }

    #[test]
    fn pointer_test() {
        let mut stack = Stack::new(2);
        assert!(stack.is_empty());
        assert_eq!(stack.pointer(), 1);

        stack.push('a').unwrap();
        assert_eq!(stack.pointer(), 0);
        assert_eq!(stack.peek(), Some(&'a'));

        stack.push('b').unwrap();
        assert!(stack.is_full());
        assert_eq!(stack.pointer(), -1);
        assert_eq!(stack.len(), 2);

        assert_eq!(stack.pop(), Ok('b'));
        assert_eq!(stack.pointer(), 0);
    }

    #[test]
    fn pop_clears_slot_test() {
        let mut stack = Stack::new(1);
        stack.push(String::from("x")).unwrap();
        assert_eq!(stack.pop().as_deref(), Ok("x"));
        assert!(stack.slots.iter().all(Option::is_none));
        assert_eq!(stack.pop(), Err(StackError::NoMoreObjectsInStack));
    }

    #[test]
    fn interleaved_test() {
        let mut stack = Stack::new(3);
        stack.push(1).unwrap();
        stack.push(2).unwrap();
        assert_eq!(stack.pop(), Ok(2));
        stack.push(3).unwrap();
        assert_eq!(stack.pop(), Ok(3));
        assert_eq!(stack.pop(), Ok(1));
        assert!(stack.is_empty());
    }

    #[test]
    fn zero_capacity_test() {
        let mut stack = Stack::new(0);
        assert_eq!(stack.push(1), Err(StackError::StackFull { capacity: 0 }));
        assert_eq!(stack.pop(), Err(StackError::NoMoreObjectsInStack));
    }
}
