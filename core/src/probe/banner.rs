//! Opportunistic banner capture on open TCP ports.

use std::net::IpAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

const READ_LIMIT: usize = 1024;

/// Connects, nudges the service with a minimal HTTP request and reads
/// whatever comes back. Plenty of daemons (SSH, SMTP, FTP) announce
/// themselves before reading anything, so the nudge is harmless for them.
/// Any failure just yields no banner.
pub async fn grab(addr: IpAddr, port: u16, wait: Duration) -> Option<String> {
    timeout(wait, exchange(addr, port)).await.ok().flatten()
}

async fn exchange(addr: IpAddr, port: u16) -> Option<String> {
    let mut stream = TcpStream::connect((addr, port)).await.ok()?;
    let request = format!("GET / HTTP/1.1\r\nHost: {addr}\r\n\r\n");
    stream.write_all(request.as_bytes()).await.ok()?;

    let mut buf = [0u8; READ_LIMIT];
    let n = stream.read(&mut buf).await.ok()?;
    let banner = String::from_utf8_lossy(&buf[..n]).trim().to_string();
    (!banner.is_empty()).then_some(banner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn captures_greeting_from_talkative_service() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(b"SSH-2.0-OpenSSH_9.6\r\n").await.unwrap();
        });

        let banner = grab(addr.ip(), addr.port(), Duration::from_secs(1)).await;
        assert_eq!(banner.as_deref(), Some("SSH-2.0-OpenSSH_9.6"));
    }

    #[tokio::test]
    async fn unreachable_port_yields_none() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let banner = grab(addr.ip(), addr.port(), Duration::from_secs(1)).await;
        assert!(banner.is_none());
    }
}
