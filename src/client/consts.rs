pub const RELAY_URL_ENV: &str = "SCREENLIVE_RELAY_URL";

pub const DEFAULT_RELAY_URL: &str = "ws://localhost:9083/ws";
