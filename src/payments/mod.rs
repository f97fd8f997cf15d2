pub mod client;
pub mod error;
pub mod provider;
pub mod providers;
pub mod token;
pub mod types;
