//! # Algorithms
//!
//! Pure decision logic, free of I/O and locking.
//!
//! - `majority`: pick the participant whose answer most others share
//! - `fork`: locate forks, decide which branch is shorter, collect a tail

pub mod fork;
pub mod majority;

pub use fork::{collect_tail, find_fork_point, has_fork, short_branch, Branch, ForkPoint};
pub use majority::select_majority;
