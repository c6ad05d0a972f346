pub mod bidding;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod extract;
pub mod handlers;
pub mod intake;
pub mod message_broker;
pub mod scheduler;
pub mod store;
