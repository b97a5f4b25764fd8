// Timing - Monotonic clocks for rate limiting and scheduling

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};
