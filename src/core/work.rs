//! Work items: an opaque procedure plus borrowed input/output buffers.
//!
//! A [`WorkItem`] is the unit of dispatch. It carries a plain function
//! pointer and the raw spans of two caller-owned buffers: a read-only input
//! and a writable output. The pool copies the item by value into a mailbox
//! slot and the owning worker runs it exactly once; ownership of the buffers
//! never transfers, so their lifetimes are the submitter's responsibility.

use std::fmt;
use std::slice;

/// Signature of a work procedure.
///
/// The procedure may read any prefix of `input` and write any prefix of
/// `output`. It must not retain either slice beyond return and should not
/// block indefinitely; there is no preemption and no cancellation once an
/// item has been dequeued.
pub type WorkFn = fn(input: &[u8], output: &mut [u8]);

/// A unit of work: procedure, borrowed input bytes, borrowed output bytes.
///
/// The buffers are held as raw spans because the pool does not track
/// completion; no borrow can be scoped to the submit-to-completion window.
/// The [`WorkItem::new`] contract is what keeps the raw spans sound.
pub struct WorkItem {
    func: WorkFn,
    input_ptr: *const u8,
    input_len: usize,
    output_ptr: *mut u8,
    output_len: usize,
}

// SAFETY: the spans point into buffers the `new` caller guaranteed to keep
// alive and unaliased until the item completes, so moving the item to the
// consuming worker thread is sound.
unsafe impl Send for WorkItem {}

impl WorkItem {
    /// Build a work item over the caller's buffers.
    ///
    /// # Safety
    ///
    /// The caller must guarantee, until the procedure has returned on the
    /// executing worker:
    ///
    /// - both `input` and `output` stay alive (the pool does not signal
    ///   completion; coordinate through the procedure itself, e.g. a flag or
    ///   sentinel the procedure writes into `output`, or through
    ///   [`crate::core::WhirlPool::stats`] counters),
    /// - `output` is not read or written by anything else,
    /// - `input` is not written by anything else.
    #[must_use]
    pub unsafe fn new(func: WorkFn, input: &[u8], output: &mut [u8]) -> Self {
        Self {
            func,
            input_ptr: input.as_ptr(),
            input_len: input.len(),
            output_ptr: output.as_mut_ptr(),
            output_len: output.len(),
        }
    }

    /// Invoke the procedure over the borrowed buffers. Consumes the item;
    /// an item runs at most once.
    pub(crate) fn run(self) {
        // SAFETY: upheld by the `new` contract; the item is consumed so the
        // spans are rematerialized exactly once.
        let input = unsafe { slice::from_raw_parts(self.input_ptr, self.input_len) };
        let output = unsafe { slice::from_raw_parts_mut(self.output_ptr, self.output_len) };
        (self.func)(input, output);
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("func", &(self.func as usize as *const ()))
            .field("input_len", &self.input_len)
            .field("output_len", &self.output_len)
            .finish()
    }
}
