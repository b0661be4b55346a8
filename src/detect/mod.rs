pub mod detector;
pub mod gesture;
pub mod landmarks;
pub mod throttle;
pub mod worker;
