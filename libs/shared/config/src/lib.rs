use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_port: u16,
    pub hold_ttl_seconds: i64,
    pub sweep_interval_seconds: u64,
    pub event_buffer_capacity: usize,
    pub allow_self_hold: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            bind_port: env::var("BIND_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("BIND_PORT not set, using 3000");
                    3000
                }),
            hold_ttl_seconds: env::var("HOLD_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("HOLD_TTL_SECONDS not set, using 300");
                    300
                }),
            sweep_interval_seconds: env::var("SWEEP_INTERVAL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("SWEEP_INTERVAL_SECONDS not set, using 30");
                    30
                }),
            event_buffer_capacity: env::var("EVENT_BUFFER_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("EVENT_BUFFER_CAPACITY not set, using 256");
                    256
                }),
            allow_self_hold: env::var("ALLOW_SELF_HOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - check environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        self.hold_ttl_seconds > 0
            && self.sweep_interval_seconds > 0
            && self.event_buffer_capacity > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig {
            bind_port: 3000,
            hold_ttl_seconds: 300,
            sweep_interval_seconds: 30,
            event_buffer_capacity: 256,
            allow_self_hold: false,
        };
        assert!(config.is_configured());
    }
}
