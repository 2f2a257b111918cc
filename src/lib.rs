pub mod config;
pub mod errors;
pub mod feishu;
pub mod http;
pub mod models;
pub mod notify;
pub mod observability;
pub mod state;
pub mod tasks;
pub mod telegram;
#[cfg(test)]
pub mod test_helpers;
pub mod translate;
