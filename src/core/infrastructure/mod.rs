pub mod api_client;
pub mod virt_backend;
