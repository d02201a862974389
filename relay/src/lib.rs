pub mod config;
pub mod server;
pub mod session;
pub mod upstream;

pub use screenlive_types as types;
