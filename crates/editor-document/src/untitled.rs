//! Untitled document numbers.
//!
//! Every document without a location owns an [`UntitledNumber`] handed out by an
//! [`UntitledNumbers`] allocator shared by all documents of an application. The number is the
//! lowest positive integer not currently in use, and it returns to the pool when the handle is
//! dropped (the document got a location, or the document itself was dropped).

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

/// Allocator of untitled document numbers.
///
/// Cloning yields another handle to the same pool.
#[derive(Clone, Default)]
pub struct UntitledNumbers {
    in_use: Rc<RefCell<BTreeSet<u32>>>,
}

impl UntitledNumbers {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the lowest free number (starting at 1).
    pub fn allocate(&self) -> UntitledNumber {
        let mut in_use = self.in_use.borrow_mut();
        let mut number = 1;
        for &taken in in_use.iter() {
            if taken != number {
                break;
            }
            number += 1;
        }
        in_use.insert(number);

        UntitledNumber {
            number,
            pool: Rc::clone(&self.in_use),
        }
    }

    /// Numbers currently reserved, ascending.
    pub fn in_use(&self) -> Vec<u32> {
        self.in_use.borrow().iter().copied().collect()
    }
}

impl fmt::Debug for UntitledNumbers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UntitledNumbers")
            .field("in_use", &self.in_use.borrow())
            .finish()
    }
}

/// A reserved untitled number; released on drop.
pub struct UntitledNumber {
    number: u32,
    pool: Rc<RefCell<BTreeSet<u32>>>,
}

impl UntitledNumber {
    /// The reserved number.
    pub fn get(&self) -> u32 {
        self.number
    }
}

impl Drop for UntitledNumber {
    fn drop(&mut self) {
        self.pool.borrow_mut().remove(&self.number);
    }
}

impl fmt::Debug for UntitledNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UntitledNumber").field(&self.number).finish()
    }
}
