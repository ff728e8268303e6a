use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// One-time code settings used by sign-up and code re-issuance.
#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    pub length: usize,
    pub ttl_minutes: i64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            length: 6,
            ttl_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt: JwtConfig,
    pub otp: OtpConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => database_url_from_parts(&get)
                .context("DATABASE_URL or USER_SERVICE_DB_* variables must be set")?,
        };

        let jwt = JwtConfig {
            secret: get("JWT_ACCESS_TOKEN_SECRET").context("JWT_ACCESS_TOKEN_SECRET is not set")?,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "account-service".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "account-service-users".into()),
            ttl_minutes: get("JWT_TTL_MINUTES")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };

        let defaults = OtpConfig::default();
        let otp = OtpConfig {
            length: get("OTP_LENGTH")
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|len| (1..=18).contains(len))
                .unwrap_or(defaults.length),
            ttl_minutes: get("OTP_TTL_MINUTES")
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|m| *m > 0)
                .unwrap_or(defaults.ttl_minutes),
        };

        let port = match get("APP_PORT") {
            Some(p) => p.parse::<u16>().with_context(|| format!("invalid APP_PORT {p}"))?,
            None => 8080,
        };

        Ok(Self {
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            database_url,
            jwt,
            otp,
        })
    }
}

fn database_url_from_parts<F>(get: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let host = get("USER_SERVICE_DB_HOST")?;
    let user = get("USER_SERVICE_DB_USERNAME")?;
    let password = get("USER_SERVICE_DB_PASSWORD").unwrap_or_default();
    let name = get("USER_SERVICE_DB_NAME")?;
    let port = get("USER_SERVICE_DB_PORT").unwrap_or_else(|| "5432".into());
    Some(format!("postgres://{user}:{password}@{host}:{port}/{name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_keys_missing() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://u:p@db:5432/users"),
            ("JWT_ACCESS_TOKEN_SECRET", "s3cret"),
        ]))
        .expect("config");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.otp.length, 6);
        assert_eq!(cfg.otp.ttl_minutes, 30);
        assert_eq!(cfg.jwt.ttl_minutes, 60);
    }

    #[test]
    fn database_url_is_composed_from_parts() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("USER_SERVICE_DB_HOST", "db"),
            ("USER_SERVICE_DB_PORT", "6543"),
            ("USER_SERVICE_DB_USERNAME", "svc"),
            ("USER_SERVICE_DB_PASSWORD", "pw"),
            ("USER_SERVICE_DB_NAME", "users"),
            ("JWT_ACCESS_TOKEN_SECRET", "s3cret"),
        ]))
        .expect("config");
        assert_eq!(cfg.database_url, "postgres://svc:pw@db:6543/users");
    }

    #[test]
    fn missing_jwt_secret_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert!(err.to_string().contains("JWT_ACCESS_TOKEN_SECRET"));
    }

    #[test]
    fn invalid_port_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_ACCESS_TOKEN_SECRET", "s"),
            ("APP_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));
    }
}
