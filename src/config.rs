use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub database_url: String,
    pub db_max_open_conns: u32,
    pub db_max_idle_conns: u32,
    pub db_conn_max_lifetime: Duration,
    pub jwt_secret: String,
    pub jwt_expiry: Duration,
    pub cors_origins: Vec<String>,
    pub trust_proxy_headers: bool,
}

fn parse_cors_origins(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Assemble a postgres URL from the discrete `DB_*` variables.
fn database_url_from_parts(
    host: &str,
    port: &str,
    user: &str,
    password: &str,
    name: &str,
    sslmode: &str,
) -> String {
    format!("postgres://{user}:{password}@{host}:{port}/{name}?sslmode={sslmode}")
}

fn listen_addr(listen: Option<String>, port: Option<String>) -> String {
    match (listen, port) {
        (Some(listen), _) => listen,
        (None, Some(port)) => format!("0.0.0.0:{port}"),
        (None, None) => "0.0.0.0:8080".into(),
    }
}

impl Config {
    pub fn load() -> Self {
        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            database_url_from_parts(
                &env_or("DB_HOST", "localhost"),
                &env_or("DB_PORT", "5432"),
                &env_or("DB_USER", "postgres"),
                &env_or("DB_PASSWORD", "postgres"),
                &env_or("DB_NAME", "crm"),
                &env_or("DB_SSLMODE", "disable"),
            )
        });

        Self {
            listen: listen_addr(env::var("CRM_LISTEN").ok(), env::var("PORT").ok()),
            database_url,
            db_max_open_conns: env_parse("DB_MAX_OPEN_CONNS", 25),
            db_max_idle_conns: env_parse("DB_MAX_IDLE_CONNS", 5),
            db_conn_max_lifetime: Duration::from_secs(env_parse("DB_CONN_MAX_LIFETIME", 300)),
            jwt_secret: env_or("JWT_SECRET", "change-me-in-production"),
            jwt_expiry: Duration::from_secs(env_parse::<u64>("JWT_EXPIRY_HOURS", 24) * 3600),
            cors_origins: env::var("CRM_CORS_ORIGINS")
                .ok()
                .map_or_else(Vec::new, |v| parse_cors_origins(&v)),
            trust_proxy_headers: env::var("CRM_TRUST_PROXY")
                .ok()
                .is_some_and(|v| v == "true"),
        }
    }
}
