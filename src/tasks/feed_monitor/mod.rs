pub mod dedup;
pub mod extract;
pub mod runner;
pub mod source;

pub use runner::FeedMonitor;
