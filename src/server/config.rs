//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::params::{BlurBounds, ProcessingParams};
use crate::protocol::constants::*;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host all three sockets bind to
    pub bind_host: IpAddr,

    /// Port frames are sent from
    pub frame_port: u16,

    /// Port accepting REGISTER / UNREGISTER
    pub registration_port: u16,

    /// Port accepting parameter commands
    pub control_port: u16,

    /// Target broadcast frame rate
    pub target_fps: u32,

    /// JPEG quality (1-100)
    ///
    /// Read by `BundledServer::bundled`; caller-built encoders take their own.
    pub jpeg_quality: u8,

    /// Capture width in pixels, read by `BundledServer::bundled`
    pub frame_width: u32,

    /// Capture height in pixels, read by `BundledServer::bundled`
    pub frame_height: u32,

    /// Maximum datagram size including the 12-byte header
    pub max_datagram_size: usize,

    /// Allowed blur radius range
    pub blur_bounds: BlurBounds,

    /// Listener receive timeout; bounds how long shutdown takes to notice
    pub recv_timeout: Duration,

    /// Wait after the source had no frame
    pub source_retry_backoff: Duration,

    /// Wait between stopping workers and closing resources
    pub shutdown_grace: Duration,

    /// Sequence numbers wrap to 0 at this value (at most 2^32)
    pub sequence_modulus: u64,

    /// Parameters in effect at startup
    pub initial_params: ProcessingParams,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            frame_port: DEFAULT_FRAME_PORT,
            registration_port: DEFAULT_REGISTRATION_PORT,
            control_port: DEFAULT_CONTROL_PORT,
            target_fps: 15,
            jpeg_quality: 40,
            frame_width: 640,
            frame_height: 480,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            blur_bounds: BlurBounds::default(),
            recv_timeout: Duration::from_millis(500),
            source_retry_backoff: Duration::from_millis(10),
            shutdown_grace: Duration::from_millis(100),
            sequence_modulus: 1 << 32,
            initial_params: ProcessingParams::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config bound to the given host
    pub fn with_host(host: IpAddr) -> Self {
        Self {
            bind_host: host,
            ..Default::default()
        }
    }

    /// Set the bind host
    pub fn bind(mut self, host: IpAddr) -> Self {
        self.bind_host = host;
        self
    }

    /// Set all three ports
    ///
    /// Port 0 asks the OS for an ephemeral port.
    pub fn ports(mut self, frame: u16, registration: u16, control: u16) -> Self {
        self.frame_port = frame;
        self.registration_port = registration;
        self.control_port = control;
        self
    }

    /// Set the target frame rate
    pub fn target_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps;
        self
    }

    /// Set JPEG quality, clamped to 1..=100
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set capture dimensions
    pub fn frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_width = width;
        self.frame_height = height;
        self
    }

    /// Set the maximum datagram size, capped at the largest UDP payload
    pub fn max_datagram_size(mut self, size: usize) -> Self {
        self.max_datagram_size = size.min(MAX_UDP_PAYLOAD);
        self
    }

    /// Set the blur bounds
    pub fn blur_bounds(mut self, min: u32, max: u32) -> Self {
        self.blur_bounds = BlurBounds::new(min, max);
        self
    }

    /// Set the listener receive timeout
    pub fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Set the shutdown grace period
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Set the sequence number modulus
    pub fn sequence_modulus(mut self, modulus: u64) -> Self {
        self.sequence_modulus = modulus;
        self
    }

    /// Set the parameters in effect at startup
    pub fn initial_params(mut self, params: ProcessingParams) -> Self {
        self.initial_params = params;
        self
    }

    /// Time budget for one frame
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.target_fps.max(1)
    }

    /// Payload bytes per datagram after the header
    pub fn payload_capacity(&self) -> usize {
        self.max_datagram_size.saturating_sub(FRAGMENT_HEADER_SIZE)
    }

    /// Log a fan-out summary every this many frames
    pub fn stats_interval_frames(&self) -> u64 {
        (self.target_fps.max(1) as u64) * 2
    }

    pub fn frame_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.frame_port)
    }

    pub fn registration_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.registration_port)
    }

    pub fn control_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.control_port)
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.target_fps == 0 {
            return Err(Error::Config("target_fps must be at least 1".into()));
        }
        if self.max_datagram_size <= FRAGMENT_HEADER_SIZE {
            return Err(Error::Config(format!(
                "max_datagram_size {} leaves no room after the {}-byte header",
                self.max_datagram_size, FRAGMENT_HEADER_SIZE
            )));
        }
        if self.max_datagram_size > MAX_UDP_PAYLOAD {
            return Err(Error::Config(format!(
                "max_datagram_size {} exceeds the UDP limit of {}",
                self.max_datagram_size, MAX_UDP_PAYLOAD
            )));
        }
        if !self.blur_bounds.is_valid() {
            return Err(Error::Config(format!(
                "blur bounds {}..={} are inverted",
                self.blur_bounds.min, self.blur_bounds.max
            )));
        }
        if self.sequence_modulus < 2 || self.sequence_modulus > (1 << 32) {
            return Err(Error::Config(format!(
                "sequence_modulus {} must be within 2..=2^32",
                self.sequence_modulus
            )));
        }
        if self.recv_timeout.is_zero() {
            return Err(Error::Config("recv_timeout must be non-zero".into()));
        }

        let ports = [self.frame_port, self.registration_port, self.control_port];
        for (i, port) in ports.iter().enumerate() {
            if *port != 0 && ports[i + 1..].contains(port) {
                return Err(Error::Config(format!("port {} is used twice", port)));
            }
        }

        Ok(())
    }
}
