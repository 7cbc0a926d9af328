const FLEET_CONFIG: &str = "FLEET_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "fleet.json";

pub fn get_config_path() -> String {
    let path_from_env = std::env::var(FLEET_CONFIG);
    path_from_env.unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

const FLEET_POLL_INTERVAL: &str = "FLEET_POLL_INTERVAL";

pub fn get_poll_interval(default: u64) -> u64 {
    let interval_from_env = std::env::var(FLEET_POLL_INTERVAL);
    interval_from_env.map_or(default, |res| res.parse().unwrap_or(default))
}

const FLEET_REFRESH_INTERVAL: &str = "FLEET_REFRESH_INTERVAL";

pub fn get_refresh_interval(default: u64) -> u64 {
    let interval_from_env = std::env::var(FLEET_REFRESH_INTERVAL);
    interval_from_env.map_or(default, |res| res.parse().unwrap_or(default))
}
