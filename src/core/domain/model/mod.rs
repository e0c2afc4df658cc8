pub mod action;
pub mod api_response;
pub mod client_config;
pub mod connection;
pub mod console;
pub mod host;
pub mod session_context;
pub mod vm;
