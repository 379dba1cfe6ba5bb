use std::env;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_audience: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub routing: RoutingSettings,
    pub search: SearchSettings,
}

/// Outbound routing service settings.
#[derive(Clone, Debug)]
pub struct RoutingSettings {
    pub base_url: String,
    /// Per-attempt timeout
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
}

#[derive(Clone, Copy, Debug)]
pub struct SearchSettings {
    pub default_radius_m: f64,
    pub max_radius_m: f64,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            base_url: "https://router.project-osrm.org".to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 2,
            backoff_base: Duration::from_millis(250),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_radius_m: 20_000.0,
            max_radius_m: 100_000.0,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let routing_defaults = RoutingSettings::default();
        let search_defaults = SearchSettings::default();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            jwt_audience: env::var("JWT_AUDIENCE").ok().filter(|a| !a.is_empty()),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            routing: RoutingSettings {
                base_url: env::var("OSRM_BASE_URL")
                    .unwrap_or(routing_defaults.base_url),
                timeout: env::var("ROUTING_TIMEOUT_SECS")
                    .map(|v| {
                        Duration::from_secs(
                            v.parse().expect("ROUTING_TIMEOUT_SECS must be a number"),
                        )
                    })
                    .unwrap_or(routing_defaults.timeout),
                max_retries: env::var("ROUTING_MAX_RETRIES")
                    .map(|v| v.parse().expect("ROUTING_MAX_RETRIES must be a number"))
                    .unwrap_or(routing_defaults.max_retries),
                backoff_base: env::var("ROUTING_BACKOFF_MS")
                    .map(|v| {
                        Duration::from_millis(
                            v.parse().expect("ROUTING_BACKOFF_MS must be a number"),
                        )
                    })
                    .unwrap_or(routing_defaults.backoff_base),
            },
            search: SearchSettings {
                default_radius_m: env::var("SEARCH_DEFAULT_RADIUS_M")
                    .map(|v| v.parse().expect("SEARCH_DEFAULT_RADIUS_M must be a number"))
                    .unwrap_or(search_defaults.default_radius_m),
                max_radius_m: env::var("SEARCH_MAX_RADIUS_M")
                    .map(|v| v.parse().expect("SEARCH_MAX_RADIUS_M must be a number"))
                    .unwrap_or(search_defaults.max_radius_m),
            },
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
