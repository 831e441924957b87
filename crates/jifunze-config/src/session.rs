use std::env;
use std::str::FromStr;

/// Where revoked token ids are recorded.
///
/// `memory` is only correct for a single server instance; every process that
/// validates tokens must share the `redis` store otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RevocationBackend {
    #[default]
    Memory,
    Redis,
}

impl FromStr for RevocationBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown revocation backend '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub revocation_backend: RevocationBackend,
    pub redis_url: String,
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self {
            revocation_backend: env::var("REVOCATION_BACKEND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend() {
        assert_eq!("redis".parse::<RevocationBackend>(), Ok(RevocationBackend::Redis));
        assert_eq!(" Memory ".parse::<RevocationBackend>(), Ok(RevocationBackend::Memory));
        assert!("etcd".parse::<RevocationBackend>().is_err());
    }
}
