//! Common validation helpers shared across modules

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

/// Split a `host:port` address. IPv6 hosts must be bracketed.
pub fn split_host_port(addr: &str) -> Result<(&str, &str), String> {
    let Some((host, port)) = addr.rsplit_once(':') else {
        return Err(format!("missing port in address {addr:?}"));
    };
    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        return Err(format!("too many colons in address {addr:?}"));
    }
    let host = host.trim_start_matches('[').trim_end_matches(']');
    Ok((host, port))
}
