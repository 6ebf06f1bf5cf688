//! Shared task primitives for skein.
//!
//! - [`KeyedMutex`]: FIFO mutual exclusion per opaque key, for async tasks.
//! - [`spawn`]: classified task spawning with tracing spans.
//! - [`WorkerJoinSet`]: fan-out helper that drains completions and reports panics.

mod class;
mod join_set;
mod keyed_mutex;
mod spawn;

pub use class::TaskClass;
pub use join_set::{WorkerJoinSet, join_error_panic_message};
pub use keyed_mutex::{KeyedGuard, KeyedMutex};
pub use spawn::spawn;
