pub mod client;
pub mod health;
pub mod worker;
