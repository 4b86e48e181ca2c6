use std::time::Duration;

use crate::config::RelationalConfig;

/// Pool limits applied to a relational connection pool
///
/// Semantics follow the usual SQL pool conventions:
/// - `max_open` of 0 means the driver default
/// - `max_idle` never exceeds `max_open`
/// - `max_lifetime` of zero means connections are never expired by age
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_idle: u32,
    pub max_open: u32,
    pub max_lifetime: Duration,
}

impl PoolSettings {
    pub fn new(max_idle: u32, max_open: u32, max_lifetime: Duration) -> Self {
        Self {
            max_idle,
            max_open,
            max_lifetime,
        }
    }

    pub fn from_config(config: &RelationalConfig) -> Self {
        Self::new(
            config.max_idle_conns,
            config.max_open_conns,
            config.conn_max_lifetime(),
        )
    }

    /// Upper bound on open connections after applying the driver default
    pub fn effective_max_open(&self) -> usize {
        if self.max_open == 0 {
            num_cpus::get() * 4
        } else {
            self.max_open as usize
        }
    }

    /// Idle connections retained, capped at the open limit
    pub fn effective_max_idle(&self) -> usize {
        (self.max_idle as usize).min(self.effective_max_open())
    }

    pub fn lifetime(&self) -> Option<Duration> {
        if self.max_lifetime.is_zero() {
            None
        } else {
            Some(self.max_lifetime)
        }
    }
}

/// Connection pool status information
#[derive(Debug, Clone)]
pub struct PoolStatus {
    pub size: usize,
    pub available: usize,
    pub max_size: usize,
}

/// Mask credentials in connection URL for safe logging
pub fn mask_credentials(url: &str) -> String {
    if let Ok(parsed_url) = url::Url::parse(url) {
        let mut masked = parsed_url.clone();
        if parsed_url.password().is_some() {
            let _ = masked.set_password(Some("***"));
        }
        masked.to_string()
    } else {
        "[invalid-url]".to_string()
    }
}

/// Mask the password of a key/value DSN (`host=... password=...`)
///
/// Values follow the libpq quoting rules: single-quoted values may contain
/// spaces, and a backslash escapes the next character.
pub fn mask_dsn(dsn: &str) -> String {
    let mut masked = Vec::new();
    let mut chars = dsn.chars().peekable();

    loop {
        while chars.next_if_eq(&' ').is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && *c != ' ') {
            key.push(c);
        }
        if chars.next_if_eq(&'=').is_none() {
            masked.push(key);
            continue;
        }

        let mut value = String::new();
        if chars.next_if_eq(&'\'').is_some() {
            value.push('\'');
            while let Some(c) = chars.next() {
                value.push(c);
                match c {
                    '\\' => value.extend(chars.next()),
                    '\'' => break,
                    _ => {}
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| *c != ' ') {
                value.push(c);
            }
        }

        if key == "password" {
            masked.push("password=***".to_string());
        } else {
            masked.push(format!("{}={}", key, value));
        }
    }

    masked.join(" ")
}
