use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::services::progress::DEFAULT_DAILY_GOAL;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// Directory for daily rolling log files; `None` keeps logs on stdout only.
    pub log_dir: Option<PathBuf>,
    pub database_path: PathBuf,
    pub jwt_secret: Option<String>,
    pub default_daily_goal: i64,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let log_dir = file_log_dir(
            std::env::var("ENABLE_FILE_LOGS").ok().as_deref(),
            std::env::var("LOG_DIR").ok().as_deref(),
        );

        let database_path = std::env::var("DATABASE_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(crate::db::default_db_path);

        let jwt_secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let default_daily_goal = std::env::var("DEFAULT_DAILY_GOAL")
            .ok()
            .and_then(|value| value.parse::<i64>().ok())
            .filter(|goal| *goal > 0)
            .unwrap_or(DEFAULT_DAILY_GOAL);

        Self {
            host,
            port,
            log_level,
            log_dir,
            database_path,
            jwt_secret,
            default_daily_goal,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn file_log_dir(enabled: Option<&str>, dir: Option<&str>) -> Option<PathBuf> {
    if !matches!(enabled.map(str::trim), Some("true" | "1")) {
        return None;
    }
    let dir = dir.map(str::trim).filter(|d| !d.is_empty()).unwrap_or("./logs");
    Some(PathBuf::from(dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_logs_need_an_explicit_opt_in() {
        assert_eq!(file_log_dir(None, Some("/var/log/lq")), None);
        assert_eq!(file_log_dir(Some("false"), None), None);
        assert_eq!(file_log_dir(Some("1"), None), Some(PathBuf::from("./logs")));
        assert_eq!(
            file_log_dir(Some("true"), Some(" /var/log/lq ")),
            Some(PathBuf::from("/var/log/lq"))
        );
    }
}
