//! Helpers shared by the iterator and the worker threads.

pub mod thread;
