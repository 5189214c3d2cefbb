pub mod conn;
pub mod dns;
pub mod tcp_connect;

pub use conn::SavingConn;
pub use dns::{BogonResolver, SavingResolver, SystemResolver};
pub use tcp_connect::{DnsDialer, SavingDialer, SystemDialer};

/// Splits `host:port`, accepting bracketed IPv6 hosts. Returns `None` when
/// the port separator is missing or the host is an unbracketed IPv6
/// literal.
pub fn split_host_port(address: &str) -> Option<(&str, &str)> {
    if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        let port = tail.strip_prefix(':')?;
        return Some((host, port));
    }
    let (host, port) = address.rsplit_once(':')?;
    if host.contains(':') {
        return None;
    }
    Some((host, port))
}

/// Inverse of [`split_host_port`]: brackets hosts containing `:`.
pub fn join_host_port(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("93.184.216.34:443"), Some(("93.184.216.34", "443")));
        assert_eq!(split_host_port("example.com:80"), Some(("example.com", "80")));
        assert_eq!(split_host_port("[::1]:53"), Some(("::1", "53")));
        assert_eq!(split_host_port("example.com"), None);
        assert_eq!(split_host_port("::1"), None);
        assert_eq!(split_host_port("[::1]"), None);
    }

    #[test]
    fn test_join_host_port() {
        assert_eq!(join_host_port("8.8.8.8", "53"), "8.8.8.8:53");
        assert_eq!(join_host_port("2001:db8::1", "443"), "[2001:db8::1]:443");
    }
}
