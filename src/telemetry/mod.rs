pub mod monitor;
pub mod polling_loop;
pub mod rate_sampler;
pub mod status_board;
