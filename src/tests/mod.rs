pub mod common;

mod gateway_retry;
