mod client;

pub use screenlive_types as types;
pub use client::{connect, connect_with_config, Client, Config, ConnectionState, ServerRx};

#[cfg(feature = "utils")]
pub use screenlive_utils as utils;
