//! Thread-local storage for worker identification.
//!
//! Workers never hold random state of their own: every sample is seeded from
//! `(loader seed, epoch, index)`. The ID only serves logging and error
//! messages.

use std::cell::Cell;

thread_local! {
    /// Thread-local worker ID.
    ///
    /// Each worker thread is assigned a unique ID (0 to num_workers-1) when
    /// spawned. Threads that are not loader workers report `None`.
    pub static WORKER_ID: Cell<Option<usize>> = const { Cell::new(None) };
}

/// The loader worker ID of the calling thread, if any.
pub fn current_worker_id() -> Option<usize> {
    WORKER_ID.with(|id| id.get())
}

pub(crate) fn set_worker_id(worker_id: usize) {
    WORKER_ID.with(|id| id.set(Some(worker_id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_id_is_thread_local() {
        assert_eq!(current_worker_id(), None);
        let handle = std::thread::spawn(|| {
            set_worker_id(3);
            current_worker_id()
        });
        assert_eq!(handle.join().unwrap(), Some(3));
        assert_eq!(current_worker_id(), None);
    }
}
