//! Ordered single-lane scheduler over an unordered worker pool.
//!
//! Submissions are appended to a FIFO queue. The first submitter that finds
//! the lane idle claims drain ownership and hands one drain task to the pool;
//! that task runs queued callbacks one at a time and gives ownership back
//! only after seeing the queue empty under the same lock that guards
//! enqueueing. No thread is parked on the lane while it is idle.

mod lane;


pub use self::lane::OrderedScheduler;
