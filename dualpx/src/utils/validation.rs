//! Common validation utilities shared across modules

use std::net::IpAddr;

/// Validate that a port number is in valid range (1-65535)
pub fn validate_port_range(port: u16) -> Result<(), String> {
    if port == 0 {
        return Err("Port must be between 1 and 65535".to_string());
    }
    Ok(())
}

/// Check if a string is empty or only whitespace
pub fn is_empty_or_whitespace(s: &str) -> bool {
    s.trim().is_empty()
}

/// Validate that a listener bind address is a literal IPv4 or IPv6 address
pub fn validate_bind_address(address: &str) -> Result<IpAddr, String> {
    if is_empty_or_whitespace(address) {
        return Err("Bind address cannot be empty".to_string());
    }
    address.trim().parse::<IpAddr>().map_err(|_| format!("Bind address is not a valid IP address: {}", address))
}

/// Check that an authority (`host:port`) names a host and a non-zero port.
/// Bracketed IPv6 literals such as `[::1]:443` are accepted.
pub fn is_dialable_authority(authority: &str) -> bool {
    let Some((host, port)) = authority.rsplit_once(':') else {
        return false;
    };
    if host.is_empty() || host == "[]" {
        return false;
    }
    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        return false;
    }
    matches!(port.parse::<u16>(), Ok(p) if p != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_port_range_valid() {
        assert!(validate_port_range(1).is_ok());
        assert!(validate_port_range(80).is_ok());
        assert!(validate_port_range(8080).is_ok());
        assert!(validate_port_range(65535).is_ok());
    }

    #[test]
    fn test_validate_port_range_invalid() {
        assert!(validate_port_range(0).is_err());
        assert_eq!(validate_port_range(0).unwrap_err(), "Port must be between 1 and 65535");
    }

    #[test]
    fn test_is_empty_or_whitespace() {
        assert!(is_empty_or_whitespace(""));
        assert!(is_empty_or_whitespace("   "));
        assert!(is_empty_or_whitespace("  \t\n  "));
        assert!(!is_empty_or_whitespace("0.0.0.0"));
        assert!(!is_empty_or_whitespace("  ::1  "));
    }

    #[test]
    fn test_validate_bind_address() {
        assert_eq!(validate_bind_address("0.0.0.0").unwrap().to_string(), "0.0.0.0");
        assert_eq!(validate_bind_address(" 127.0.0.1 ").unwrap().to_string(), "127.0.0.1");
        assert!(validate_bind_address("::").unwrap().is_ipv6());
        assert!(validate_bind_address("").is_err());
        assert!(validate_bind_address("localhost").is_err());
        assert!(validate_bind_address("0.0.0.0:8080").is_err());
    }

    #[test]
    fn test_is_dialable_authority() {
        assert!(is_dialable_authority("example.com:443"));
        assert!(is_dialable_authority("127.0.0.1:8080"));
        assert!(is_dialable_authority("[::1]:443"));

        assert!(!is_dialable_authority("example.com")); // no port
        assert!(!is_dialable_authority("example.com:0"));
        assert!(!is_dialable_authority("example.com:http"));
        assert!(!is_dialable_authority(":443"));
        assert!(!is_dialable_authority("::1:443")); // unbracketed ipv6
        assert!(!is_dialable_authority(""));
    }
}
