pub mod banner;
pub mod commands;
pub mod config;
pub mod console;
pub mod consts;
pub mod delivery;
pub mod identity;
pub mod job;
pub mod limits;
pub mod server;
pub mod state;
pub mod submit;
pub mod tasks;
pub mod worker;
