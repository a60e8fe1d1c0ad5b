pub mod interrupt;
pub mod pacing;

pub use interrupt::{Interrupt, InterruptHandle};
pub use pacing::{pause, DelayPolicy, FixedDelay, RandomDelay};
