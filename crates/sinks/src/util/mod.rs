//! Internal utilities shared by sink implementations.

mod throttle;

pub(crate) use throttle::WarnThrottle;
