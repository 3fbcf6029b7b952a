//! Wire protocol constants

/// Size of the fragment header: sequence, total, index (3 x u32)
pub const FRAGMENT_HEADER_SIZE: usize = 12;

/// Default maximum datagram size including the header
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 32768;

/// Largest UDP payload over IPv4
pub const MAX_UDP_PAYLOAD: usize = 65507;

/// Default frame port
pub const DEFAULT_FRAME_PORT: u16 = 8888;

/// Default registration port
pub const DEFAULT_REGISTRATION_PORT: u16 = 8889;

/// Default control port
pub const DEFAULT_CONTROL_PORT: u16 = 8890;

/// Receive buffer for text datagrams on the side channels
pub const TEXT_DATAGRAM_BUFFER: usize = 1024;

// Registration channel
pub const MSG_REGISTER: &str = "REGISTER";
pub const MSG_UNREGISTER: &str = "UNREGISTER";
pub const MSG_REGISTERED: &str = "REGISTERED";

// Control channel prefixes
pub const CMD_COLOR: &str = "COLOR";
pub const CMD_INTENSITY: &str = "INTENSITY";
pub const CMD_BLUR: &str = "BLUR";
