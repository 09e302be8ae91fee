pub mod settings;
pub mod service;
pub mod loader;
pub mod validator;
