//! UDP frame server
//!
//! # Architecture
//!
//! ```text
//!                          FrameServer
//!   ┌──────────────────────┬──────────────────────┬──────────────────────┐
//!   │ RegistrationListener │ ControlListener      │ BroadcastLoop        │
//!   │ REGISTER/UNREGISTER  │ COLOR/INTENSITY/BLUR │ source → process →   │
//!   │        │             │        │             │ encode → fragment    │
//!   │        ▼             │        ▼             │        │             │
//!   │  ClientRegistry ◄────┼────────┼─────────────┼── snapshot / evict   │
//!   │                      │  ParameterStore ◄────┼── snapshot per frame │
//!   └──────────────────────┴──────────────────────┴──────────────────────┘
//!                    all three stop when the RunFlag clears
//! ```

pub mod broadcast;
pub mod config;
pub mod control;
pub mod listener;
pub mod registration;
pub mod shutdown;

pub use broadcast::{BroadcastLoop, FanOut, SequenceCounter, Stages};
pub use config::ServerConfig;
pub use control::{ControlListener, ControlOutcome};
pub use listener::{BundledServer, FrameServer, ServerAddrs};
pub use registration::{RegistrationListener, RegistrationOutcome};
pub use shutdown::RunFlag;
