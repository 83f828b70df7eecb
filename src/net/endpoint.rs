//! Transport endpoints.
//!
//! An [`Endpoint`] names one side of a communication: the transport
//! protocol plus the IP address and port. Endpoints are small `Copy` values
//! and are only ever read by the sockets.

use core::fmt;
use core::str::FromStr;
use std::net::{IpAddr, SocketAddr};

//------------ Protocol ------------------------------------------------------

/// The transport protocol of an endpoint or socket.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Protocol {
    /// Datagrams over UDP.
    Udp,

    /// A byte stream over TCP.
    Tcp,
}

impl Protocol {
    /// Returns whether the protocol is stream oriented.
    ///
    /// Messages over a stream protocol need length-prefix framing.
    pub fn is_stream(self) -> bool {
        matches!(self, Protocol::Tcp)
    }

    /// Returns the URL scheme used when displaying an endpoint.
    fn scheme(self) -> &'static str {
        match self {
            Protocol::Udp => "udp",
            Protocol::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Protocol::Udp => f.write_str("UDP"),
            Protocol::Tcp => f.write_str("TCP"),
        }
    }
}

//------------ Family --------------------------------------------------------

/// The address family of an endpoint.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Family {
    /// IPv4.
    Inet,

    /// IPv6.
    Inet6,
}

//------------ Endpoint ------------------------------------------------------

/// A transport address: protocol, IP address, and port.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Endpoint {
    /// The transport protocol.
    protocol: Protocol,

    /// Address and port.
    addr: SocketAddr,
}

impl Endpoint {
    /// Creates a new endpoint.
    pub fn new(protocol: Protocol, addr: SocketAddr) -> Self {
        Endpoint { protocol, addr }
    }

    /// Creates a new UDP endpoint.
    pub fn udp(addr: impl Into<SocketAddr>) -> Self {
        Self::new(Protocol::Udp, addr.into())
    }

    /// Creates a new TCP endpoint.
    pub fn tcp(addr: impl Into<SocketAddr>) -> Self {
        Self::new(Protocol::Tcp, addr.into())
    }

    /// Returns the transport protocol.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Returns the IP address.
    pub fn address(&self) -> IpAddr {
        self.addr.ip()
    }

    /// Returns the port.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Returns the address family.
    pub fn family(&self) -> Family {
        match self.addr {
            SocketAddr::V4(_) => Family::Inet,
            SocketAddr::V6(_) => Family::Inet6,
        }
    }

    /// Returns address and port as a socket address.
    pub fn socket_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns an endpoint with the same protocol but a different address.
    pub(crate) fn with_addr(self, addr: SocketAddr) -> Self {
        Endpoint { addr, ..self }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}://{}", self.protocol.scheme(), self.addr)
    }
}

impl FromStr for Endpoint {
    type Err = ParseEndpointError;

    /// Parses `udp://192.0.2.1:53` or `tcp://[2001:db8::1]:53`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, addr) =
            s.split_once("://").ok_or(ParseEndpointError::MissingScheme)?;
        let protocol = match scheme {
            "udp" => Protocol::Udp,
            "tcp" => Protocol::Tcp,
            _ => return Err(ParseEndpointError::UnknownScheme),
        };
        let addr = addr
            .parse()
            .map_err(|_| ParseEndpointError::InvalidAddress)?;
        Ok(Endpoint::new(protocol, addr))
    }
}

//------------ ParseEndpointError --------------------------------------------

/// An endpoint could not be parsed from a string.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseEndpointError {
    /// The string lacks the `scheme://` part.
    MissingScheme,

    /// The scheme is neither `udp` nor `tcp`.
    UnknownScheme,

    /// The part after the scheme is not an address and port.
    InvalidAddress,
}

impl fmt::Display for ParseEndpointError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ParseEndpointError::MissingScheme => "missing scheme",
            ParseEndpointError::UnknownScheme => "unknown scheme",
            ParseEndpointError::InvalidAddress => "invalid address",
        })
    }
}

impl std::error::Error for ParseEndpointError {}

//============ Testing =======================================================
