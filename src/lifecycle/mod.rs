pub mod action_controller;
pub mod delete_gate;
