use std::net::UdpSocket;

/// Guesses the local IP address the speakers can reach us on.
///
/// Opens a UDP socket "connected" to a public address and reads back the
/// local address the kernel picked. No packet is sent.
/// Falls back to `127.0.0.1` when no route is available.
pub fn guess_local_ip() -> String {
    match UdpSocket::bind("0.0.0.0:0") {
        Ok(socket) => {
            if socket.connect("8.8.8.8:80").is_ok() {
                if let Ok(local_addr) = socket.local_addr() {
                    return local_addr.ip().to_string();
                }
            }
            "127.0.0.1".to_string()
        }
        Err(_) => "127.0.0.1".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    #[test]
    fn test_guess_local_ip_is_an_address() {
        let ip = guess_local_ip();
        assert!(ip.parse::<IpAddr>().is_ok());
    }
}
