//! Client registry for frame fan-out
//!
//! The registry tracks which addresses receive the frame stream. It is
//! mutated by the registration listener (join/leave) and by the broadcast
//! loop (eviction after a failed send).
//!
//! # Architecture
//!
//! ```text
//!                     Arc<ClientRegistry>
//!                ┌──────────────────────────┐
//!                │ clients: RwLock<         │
//!                │   HashSet<SocketAddr>    │
//!                │ >                        │
//!                └───────┬──────────┬───────┘
//!                        │          │
//!        register()      │          │  snapshot() / unregister()
//!        unregister()    │          │
//!                        ▼          ▼
//!          [RegistrationListener]  [BroadcastLoop]
//!                                   for addr in snapshot:
//!                                     send fragments ──► UDP
//! ```
//!
//! # Snapshot reads
//!
//! The broadcast loop never holds the lock while sending. It copies the
//! membership at the start of each frame and iterates the copy.

pub mod store;

pub use store::ClientRegistry;
