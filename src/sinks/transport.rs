//! Connection transports for the syslog sink
//!
//! Sends formatted syslog messages to a remote collector over UDP or TCP.
//! A transport is owned by exactly one sink, which serializes access to it.

use crate::core::{LoggerError, Result};
use std::fmt;
use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs, UdpSocket};
use std::str::FromStr;
use std::time::Duration;

const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// A connection-like resource that accepts whole messages
pub trait Transport: Send {
    /// Send one complete message
    ///
    /// Errors are returned unchanged so callers can surface them verbatim.
    fn send(&mut self, buf: &[u8]) -> std::io::Result<()>;

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Network type for [`connect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Udp,
    Tcp,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Udp => write!(f, "udp"),
            Network::Tcp => write!(f, "tcp"),
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "udp" => Ok(Network::Udp),
            "tcp" => Ok(Network::Tcp),
            _ => Err(format!("Invalid syslog network: '{}' (expected 'udp' or 'tcp')", s)),
        }
    }
}

/// Open a transport of the given network type
pub fn connect(network: Network, addr: &str) -> Result<Box<dyn Transport>> {
    match network {
        Network::Udp => Ok(Box::new(UdpTransport::new(addr)?)),
        Network::Tcp => Ok(Box::new(TcpTransport::new(addr)?)),
    }
}

/// One datagram per message
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub fn new(addr: impl ToSocketAddrs + ToString) -> Result<Self> {
        let address = addr.to_string();
        let socket = UdpSocket::bind("0.0.0.0:0")
            .map_err(|e| LoggerError::io_operation("binding syslog socket", &address, e))?;
        socket
            .connect(&address)
            .map_err(|e| LoggerError::io_operation("connecting syslog transport", &address, e))?;
        Ok(Self { socket })
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.socket.send(buf).map(|_| ())
    }
}

/// Stream transport; each message is terminated by a line feed
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn new(addr: impl ToSocketAddrs + ToString) -> Result<Self> {
        let address = addr.to_string();
        let stream = TcpStream::connect(&address)
            .map_err(|e| LoggerError::io_operation("connecting syslog transport", &address, e))?;

        // Set timeouts to prevent hanging
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
        stream.set_nodelay(true)?;

        Ok(Self { stream })
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(buf)?;
        self.stream.write_all(b"\n")
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stream.flush()
    }
}
