//! Frame server
//!
//! Binds the three sockets, opens the frame source, spawns the workers and
//! tears everything down through one path no matter how the run ends.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::params::ParameterStore;
use crate::pipeline::{
    FrameEncoder, FrameProcessor, FrameSource, JpegEncoder, TestPatternSource, TintProcessor,
};
use crate::registry::ClientRegistry;
use crate::server::broadcast::{BroadcastLoop, SharedStages, Stages};
use crate::server::config::ServerConfig;
use crate::server::control::ControlListener;
use crate::server::registration::RegistrationListener;
use crate::server::shutdown::RunFlag;
use crate::stats::{BroadcastStats, StatsSnapshot};

/// Addresses the server actually bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerAddrs {
    pub frame: SocketAddr,
    pub registration: SocketAddr,
    pub control: SocketAddr,
}

struct Sockets {
    frame: Arc<UdpSocket>,
    registration: Arc<UdpSocket>,
    control: Arc<UdpSocket>,
}

async fn bind_socket(role: &'static str, addr: SocketAddr) -> Result<Arc<UdpSocket>> {
    let socket = UdpSocket::bind(addr)
        .await
        .map_err(|source| Error::Bind { role, addr, source })?;

    tracing::info!(role = role, addr = %socket.local_addr()?, "Socket bound");
    Ok(Arc::new(socket))
}

/// Server running the bundled test pattern, tint and JPEG stages
pub type BundledServer = FrameServer<TestPatternSource, TintProcessor, JpegEncoder>;

/// UDP frame broadcast server
pub struct FrameServer<S: FrameSource, P: FrameProcessor, E: FrameEncoder> {
    config: ServerConfig,
    registry: Arc<ClientRegistry>,
    params: Arc<ParameterStore>,
    stats: Arc<BroadcastStats>,
    running: RunFlag,
    sockets: Sockets,
    addrs: ServerAddrs,
    stages: SharedStages<S, P, E>,
}

impl<S: FrameSource, P: FrameProcessor, E: FrameEncoder> FrameServer<S, P, E> {
    /// Validate the config, bind all sockets and open the source
    ///
    /// Any failure releases whatever was already acquired.
    pub async fn bind(config: ServerConfig, source: S, processor: P, encoder: E) -> Result<Self> {
        config.validate()?;

        let frame = bind_socket("frames", config.frame_addr()).await?;
        let registration = bind_socket("registration", config.registration_addr()).await?;
        let control = bind_socket("control", config.control_addr()).await?;

        let addrs = ServerAddrs {
            frame: frame.local_addr()?,
            registration: registration.local_addr()?,
            control: control.local_addr()?,
        };

        let mut stages = Stages::new(source, processor, encoder);
        if let Err(e) = stages.open() {
            tracing::error!(error = %e, "Failed to open frame source");
            return Err(e);
        }

        let params = ParameterStore::with_params(config.initial_params, config.blur_bounds);

        Ok(Self {
            config,
            registry: Arc::new(ClientRegistry::new()),
            params: Arc::new(params),
            stats: Arc::new(BroadcastStats::new()),
            running: RunFlag::new(),
            sockets: Sockets {
                frame,
                registration,
                control,
            },
            addrs,
            stages: Arc::new(Mutex::new(stages)),
        })
    }

    /// Bound socket addresses
    pub fn local_addrs(&self) -> ServerAddrs {
        self.addrs
    }

    /// Get a reference to the client registry
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Get a reference to the parameter store
    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Handle to the shared stats counters
    pub fn stats_handle(&self) -> Arc<BroadcastStats> {
        Arc::clone(&self.stats)
    }

    /// Flag that stops the server when cleared
    pub fn run_flag(&self) -> RunFlag {
        self.running.clone()
    }

    /// Run until the run flag is cleared
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run until `shutdown` completes or the run flag is cleared
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let registration = tokio::spawn(
            RegistrationListener::new(
                Arc::clone(&self.sockets.registration),
                Arc::clone(&self.registry),
                self.running.clone(),
                self.config.recv_timeout,
            )
            .run(),
        );

        let control = tokio::spawn(
            ControlListener::new(
                Arc::clone(&self.sockets.control),
                Arc::clone(&self.params),
                self.running.clone(),
                self.config.recv_timeout,
            )
            .run(),
        );

        let mut broadcast = tokio::spawn(
            BroadcastLoop::new(
                &self.config,
                Arc::clone(&self.sockets.frame),
                Arc::clone(&self.registry),
                Arc::clone(&self.params),
                Arc::clone(&self.stats),
                self.running.clone(),
                Arc::clone(&self.stages),
            )
            .run(),
        );

        tracing::info!(
            frames = %self.addrs.frame,
            registration = %self.addrs.registration,
            control = %self.addrs.control,
            "Frame server running"
        );

        let broadcast_done = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                false
            }
            result = &mut broadcast => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Broadcast loop terminated abnormally");
                }
                true
            }
        };

        let mut workers = vec![("registration", registration), ("control", control)];
        if !broadcast_done {
            workers.push(("broadcast", broadcast));
        }

        self.teardown(workers).await;
        Ok(())
    }

    /// Stop workers, close sockets, release the source
    async fn teardown(self, workers: Vec<(&'static str, JoinHandle<()>)>) {
        tracing::info!("Stopping server");
        self.running.stop();
        tokio::time::sleep(self.config.shutdown_grace).await;

        let limit = self.config.recv_timeout + self.config.frame_interval() + Duration::from_secs(1);
        for (name, mut handle) in workers {
            match tokio::time::timeout(limit, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(worker = name, error = %e, "Worker failed"),
                Err(_) => {
                    tracing::warn!(worker = name, "Worker did not stop in time, aborting");
                    handle.abort();
                }
            }
        }

        let Self { sockets, stages, .. } = self;
        drop(sockets);

        let released = tokio::task::spawn_blocking(move || {
            stages.lock().unwrap_or_else(PoisonError::into_inner).release();
        })
        .await;
        if let Err(e) = released {
            tracing::warn!(error = %e, "Releasing frame source failed");
        }

        tracing::info!("Server stopped");
    }
}

impl BundledServer {
    /// Bind with stages built from the config
    ///
    /// The pattern uses `frame_width` x `frame_height` and the encoder uses
    /// `jpeg_quality`.
    pub async fn bundled(config: ServerConfig) -> Result<Self> {
        let source = TestPatternSource::new(config.frame_width, config.frame_height);
        let encoder = JpegEncoder::new(config.jpeg_quality);
        Self::bind(config, source, TintProcessor::new(), encoder).await
    }
}
