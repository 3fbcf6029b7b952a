//! UDP frame broadcaster with live-tunable processing parameters
//!
//! A server captures frames, applies a tint effect driven by parameters that
//! clients change over a control channel, JPEG-encodes each frame, splits it
//! into header-prefixed datagrams and sends them to every registered client.
//!
//! # Example
//!
//! ```no_run
//! use framecast::{BundledServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> framecast::Result<()> {
//!     let config = ServerConfig::default().jpeg_quality(60);
//!
//!     let server = BundledServer::bundled(config).await?;
//!     server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
//! }
//! ```

pub mod error;
pub mod params;
pub mod pipeline;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stats;

pub use error::{EncodeError, Error, Result, ValidationError};
pub use params::{Color, ParameterStore, ProcessingParams};
pub use pipeline::{Frame, FrameEncoder, FrameProcessor, FrameSource};
pub use protocol::{Fragment, FragmentHeader, Reassembler};
pub use registry::ClientRegistry;
pub use server::{BundledServer, FrameServer, RunFlag, ServerAddrs, ServerConfig};
pub use stats::{BroadcastStats, StatsSnapshot};
