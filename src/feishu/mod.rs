pub mod card;
pub mod client;
pub mod types;
