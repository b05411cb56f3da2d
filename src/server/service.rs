//! Server lifecycle: workers, idle sweep and shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use super::dispatch::{Dispatcher, ServerStats, ServerStatsSnapshot};
use super::registry::ClientRegistry;
use super::telemetry::Telemetry;
use super::transport::Transport;
use crate::config::ServerConfig;
use crate::error::{Result, TimesyncError, is_fatal_io};
use crate::filter::now_micros;

/// A running time-synchronization server
pub struct TimesyncServer<T: Transport = UdpSocket> {
    transport: Arc<T>,
    dispatcher: Arc<Dispatcher>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    workers: Vec<JoinHandle<Result<()>>>,
    sweeper: JoinHandle<()>,
}

impl TimesyncServer<UdpSocket> {
    /// Validate `config`, bind its UDP address and start serving.
    ///
    /// # Errors
    /// Returns [`TimesyncError::Config`] for an invalid configuration and
    /// [`TimesyncError::Transport`] if the socket cannot be bound.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let socket = UdpSocket::bind(config.bind_addr).await?;
        info!(addr = %socket.local_addr()?, workers = config.workers, "Time sync server listening");
        Self::start(config, Arc::new(socket))
    }
}

impl<T: Transport> TimesyncServer<T> {
    /// Start serving on an existing transport.
    ///
    /// # Errors
    /// Returns [`TimesyncError::Config`] for an invalid configuration.
    pub fn start(config: ServerConfig, transport: Arc<T>) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(ClientRegistry::new(config.registry_shards));
        let telemetry = Telemetry::new(config.telemetry_capacity);
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            config.filters,
            telemetry,
        ));
        let (shutdown_tx, _) = watch::channel(false);
        let shutdown_tx = Arc::new(shutdown_tx);

        let workers = (0..config.workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    transport: Arc::clone(&transport),
                    dispatcher: Arc::clone(&dispatcher),
                    buf: vec![0u8; config.recv_buf_size],
                    stop: Arc::clone(&shutdown_tx),
                };
                tokio::spawn(worker.run(shutdown_tx.subscribe()))
            })
            .collect();

        let sweeper = spawn_eviction_task(
            registry,
            config.idle_timeout,
            config.eviction_interval,
            shutdown_tx.subscribe(),
        );

        Ok(Self {
            transport,
            dispatcher,
            shutdown_tx,
            workers,
            sweeper,
        })
    }

    /// Address the transport is bound to
    ///
    /// # Errors
    /// Propagates the transport's error.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.transport.local_addr()?)
    }

    /// Client registry
    #[must_use]
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        self.dispatcher.registry()
    }

    /// Sample bus
    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        self.dispatcher.telemetry()
    }

    /// Server counters
    #[must_use]
    pub fn stats(&self) -> ServerStatsSnapshot {
        self.dispatcher.stats().snapshot()
    }

    /// Counters that stay readable after [`Self::shutdown`]
    #[must_use]
    pub fn stats_handle(&self) -> Arc<ServerStats> {
        self.dispatcher.stats_handle()
    }

    /// A receiver that flips to `true` when the server stops
    #[must_use]
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Resolve once the server has stopped on its own (fatal receive error)
    /// or [`Self::shutdown`] has begun.
    pub async fn stopped(&self) {
        let mut rx = self.shutdown_tx.subscribe();
        // Err means the sender is gone, which also means stopped.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Stop accepting datagrams, let in-flight ones finish, then release all
    /// client state.
    ///
    /// # Errors
    /// Returns the first fatal error a worker stopped with, if any.
    pub async fn shutdown(self) -> Result<()> {
        info!("Time sync server shutting down");
        self.shutdown_tx.send_replace(true);

        let mut first_error = None;
        for handle in self.workers {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(join) => warn!("Worker task failed: {join}"),
            }
        }
        if let Err(join) = self.sweeper.await {
            warn!("Eviction task failed: {join}");
        }

        let released = self.dispatcher.registry().clear().await;
        info!(clients = released, "Released client state");

        first_error.map_or(Ok(()), Err)
    }
}

struct Worker<T: Transport> {
    id: usize,
    transport: Arc<T>,
    dispatcher: Arc<Dispatcher>,
    buf: Vec<u8>,
    stop: Arc<watch::Sender<bool>>,
}

impl<T: Transport> Worker<T> {
    async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        debug!(worker = self.id, "Worker started");

        loop {
            tokio::select! {
                result = self.transport.receive(&mut self.buf) => {
                    match result {
                        Ok((len, origin)) => {
                            let received_at = now_micros();
                            self.serve(len, origin, received_at).await;
                        }
                        Err(e) if is_fatal_io(&e) => {
                            error!(worker = self.id, "Receive failed, socket unusable: {e}");
                            self.stop.send_replace(true);
                            return Err(TimesyncError::Transport(e));
                        }
                        Err(e) => {
                            debug!(worker = self.id, "Transient receive error: {e}");
                        }
                    }
                }

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!(worker = self.id, "Worker stopped");
        Ok(())
    }

    async fn serve(&self, len: usize, origin: SocketAddr, received_at: u64) {
        let Some(response) = self
            .dispatcher
            .handle(&self.buf[..len], origin, received_at)
            .await
        else {
            return;
        };

        let stats = self.dispatcher.stats();
        match self.transport.send(&response.encode(), origin).await {
            Ok(_) => stats.record_sent(),
            Err(e) => {
                stats.record_send_failure();
                warn!(client = %origin, sequence = response.sequence, "Send failed: {e}");
            }
        }
    }
}

/// Periodically drop clients idle for longer than `idle_timeout`
pub(crate) fn spawn_eviction_task(
    registry: Arc<ClientRegistry>,
    idle_timeout: Duration,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = registry.evict_idle(idle_timeout).await;
                    if !evicted.is_empty() {
                        info!(count = evicted.len(), "Evicted idle clients");
                        debug!(clients = ?evicted, "Evicted");
                    }
                }

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}
