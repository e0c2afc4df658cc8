mod client_tests;
mod console_tests;
mod host_tests;
mod lifecycle_tests;
