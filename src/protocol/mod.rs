//! Wire protocol
//!
//! Three UDP channels:
//!
//! ```text
//!   frame port         server ──► client   binary fragments (see `fragment`)
//!   registration port  client ──► server   "REGISTER" / "UNREGISTER"
//!                      server ──► client   "REGISTERED"
//!   control port       client ──► server   "COLOR:r,g,b" | "INTENSITY:x" | "BLUR:n"
//!                      server ──► client   "<KIND>_OK" | "<KIND>_ERROR"
//! ```

pub mod command;
pub mod constants;
pub mod fragment;
pub mod reassembly;

pub use command::{parse_control, CommandKind, ControlCommand, ControlParse, RegistrationMessage};
pub use fragment::{fragment_count, fragment_frame, Fragment, FragmentError, FragmentHeader, Fragmenter};
pub use reassembly::{CompletedFrame, Reassembler, ReassemblyStats};
