use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

/// How unexpected errors are surfaced to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Full diagnostic detail in error responses.
    Development,
    /// Generic 500 responses, details only in the server log.
    #[default]
    Production,
}

impl RunMode {
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("development") {
            Self::Development
        } else {
            Self::Production
        }
    }

    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub facade_url: String,
    pub facade_timeout: Option<Duration>,
    pub mode: RunMode,
    pub public_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            facade_url: "http://127.0.0.1:3000".into(),
            facade_timeout: None,
            mode: RunMode::Production,
            public_dir: PathBuf::from("public"),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(defaults.port);
        let host = env::var("HOST").unwrap_or(defaults.host);
        let facade_url = env::var("FACADE_URL").unwrap_or(defaults.facade_url);
        let facade_timeout = env::var("FACADE_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_secs);
        let mode = env::var("APP_ENV")
            .map(|value| RunMode::from_name(&value))
            .unwrap_or(defaults.mode);
        let public_dir = env::var("PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.public_dir);

        Self {
            host,
            port,
            facade_url,
            facade_timeout,
            mode,
            public_dir,
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}
