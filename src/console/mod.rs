pub mod session_manager;
pub mod transport;
