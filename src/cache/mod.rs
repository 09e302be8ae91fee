pub mod credential;
pub mod persist;
pub mod token_store;
