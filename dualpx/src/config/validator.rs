use crate::config::types::ProxyConfig;
use crate::utils::validation::{validate_bind_address, validate_port_range};
use anyhow::{Result, anyhow};

impl ProxyConfig {
    /// Collect every problem with this configuration; an empty list means it can be served
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Err(e) = validate_bind_address(&self.bind_address) {
            errors.push(e);
        }
        if let Err(e) = validate_port_range(self.http_port) {
            errors.push(format!("http_port: {}", e));
        }
        if self.socks_enabled {
            if let Err(e) = validate_port_range(self.socks_port) {
                errors.push(format!("socks_port: {}", e));
            }
            if self.socks_port == self.http_port {
                errors.push(format!("http_port and socks_port cannot both be {}", self.http_port));
            }
        }
        errors
    }

    pub fn validate(&self) -> Result<()> {
        let errors = self.validation_errors();
        if errors.is_empty() { Ok(()) } else { Err(anyhow!("Invalid configuration: {}", errors.join("; "))) }
    }
}
