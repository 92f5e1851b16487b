//! Server socket state machine: `Created → Listening → Closed`.
//!
//! Restart is not supported: once `listen` has been called, every later
//! `listen` fails, including after a failed bind or a `close`.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard};

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Shutdown;

/// Error type for lifecycle operations. None of these are retryable.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Cannot restart a server. Not supported.")]
    CannotRestart,

    #[error("Server not started. Use listen.")]
    NotStarted,

    #[error("Server is not listening")]
    NotListening,

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Server failed to start: {0}")]
    StartFailed(String),

    #[error("Server stopped with error: {0}")]
    Serve(#[source] io::Error),

    #[error("Server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Starting,
    Listening,
    Closed,
}

enum State {
    Created,
    Starting,
    Listening {
        addr: SocketAddr,
        shutdown: Shutdown,
        task: JoinHandle<io::Result<()>>,
    },
    Closed,
}

type ReadySlot = Option<Result<SocketAddr, String>>;

/// Owns the listening socket of one server.
pub struct LifecycleController {
    state: Mutex<State>,
    ready: watch::Sender<ReadySlot>,
}

impl LifecycleController {
    pub fn new() -> Self {
        let (ready, _) = watch::channel(None);
        Self {
            state: Mutex::new(State::Created),
            ready,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> LifecycleState {
        match *self.lock() {
            State::Created => LifecycleState::Created,
            State::Starting => LifecycleState::Starting,
            State::Listening { .. } => LifecycleState::Listening,
            State::Closed => LifecycleState::Closed,
        }
    }

    /// Bound address while listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match *self.lock() {
            State::Listening { addr, .. } => Some(addr),
            _ => None,
        }
    }

    /// Bind `host:port` and start serving `app`. Resolves once bound.
    pub async fn listen(&self, host: &str, port: u16, app: Router) -> Result<SocketAddr, LifecycleError> {
        {
            let mut state = self.lock();
            match *state {
                State::Created => *state = State::Starting,
                _ => return Err(LifecycleError::CannotRestart),
            }
        }
        let starting = StartGuard {
            controller: self,
            armed: true,
        };

        let bind_addr = format!("{}:{}", host, port);
        let bound = match TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener.local_addr().map(|addr| (listener, addr)),
            Err(e) => Err(e),
        };
        let (listener, addr) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                tracing::error!(address = %bind_addr, error = %source, "Failed to bind");
                starting.fail(source.to_string());
                return Err(LifecycleError::Bind {
                    addr: bind_addr,
                    source,
                });
            }
        };

        let shutdown = Shutdown::new();
        let signal = shutdown.wait();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(signal)
                .await
        });

        *self.lock() = State::Listening {
            addr,
            shutdown,
            task,
        };
        self.ready.send_replace(Some(Ok(addr)));
        starting.disarm();

        tracing::info!(address = %addr, "Server listening");
        Ok(addr)
    }

    /// Resolves with the bound address once `listen` has completed.
    /// Fails immediately if `listen` was never called.
    pub async fn ready(&self) -> Result<SocketAddr, LifecycleError> {
        if matches!(*self.lock(), State::Created) {
            return Err(LifecycleError::NotStarted);
        }

        let mut rx = self.ready.subscribe();
        let slot = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| LifecycleError::NotStarted)?
            .clone();

        match slot {
            Some(Ok(addr)) => Ok(addr),
            Some(Err(message)) => Err(LifecycleError::StartFailed(message)),
            None => Err(LifecycleError::NotStarted),
        }
    }

    /// Stop accepting, let in-flight requests finish and release the
    /// socket. Only valid while listening.
    pub async fn close(&self) -> Result<(), LifecycleError> {
        let (addr, shutdown, task) = {
            let mut state = self.lock();
            match std::mem::replace(&mut *state, State::Closed) {
                State::Listening {
                    addr,
                    shutdown,
                    task,
                } => (addr, shutdown, task),
                other => {
                    *state = other;
                    return Err(LifecycleError::NotListening);
                }
            }
        };

        tracing::info!(address = %addr, "Server closing");
        shutdown.trigger();

        match task.await? {
            Ok(()) => {
                tracing::info!(address = %addr, "Server closed");
                Ok(())
            }
            Err(e) => Err(LifecycleError::Serve(e)),
        }
    }

    fn fail_start(&self, message: String) {
        *self.lock() = State::Closed;
        self.ready.send_replace(Some(Err(message)));
    }
}

const LISTEN_CANCELLED: &str = "listen cancelled before the socket was bound";

/// Moves a `Starting` controller to `Closed` if `listen` ends, or is
/// dropped, before the server is up.
struct StartGuard<'a> {
    controller: &'a LifecycleController,
    armed: bool,
}

impl StartGuard<'_> {
    fn fail(mut self, message: String) {
        self.armed = false;
        self.controller.fail_start(message);
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!("{}", LISTEN_CANCELLED);
            self.controller.fail_start(LISTEN_CANCELLED.to_string());
        }
    }
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleController")
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> Router {
        Router::new()
    }

    #[tokio::test]
    async fn test_linear_lifecycle() {
        let controller = LifecycleController::new();
        assert_eq!(controller.state(), LifecycleState::Created);

        let addr = controller.listen("127.0.0.1", 0, app()).await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(controller.state(), LifecycleState::Listening);
        assert_eq!(controller.ready().await.unwrap(), addr);
        assert_eq!(controller.local_addr(), Some(addr));

        controller.close().await.unwrap();
        assert_eq!(controller.state(), LifecycleState::Closed);
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_ready_before_listen_fails() {
        let controller = LifecycleController::new();
        assert!(matches!(controller.ready().await, Err(LifecycleError::NotStarted)));
    }

    #[tokio::test]
    async fn test_listen_twice_fails() {
        let controller = LifecycleController::new();
        controller.listen("127.0.0.1", 0, app()).await.unwrap();
        assert!(matches!(
            controller.listen("127.0.0.1", 0, app()).await,
            Err(LifecycleError::CannotRestart)
        ));
        controller.close().await.unwrap();
        assert!(matches!(
            controller.listen("127.0.0.1", 0, app()).await,
            Err(LifecycleError::CannotRestart)
        ));
    }

    #[tokio::test]
    async fn test_close_requires_listening() {
        let controller = LifecycleController::new();
        assert!(matches!(controller.close().await, Err(LifecycleError::NotListening)));

        controller.listen("127.0.0.1", 0, app()).await.unwrap();
        controller.close().await.unwrap();
        assert!(matches!(controller.close().await, Err(LifecycleError::NotListening)));
    }

    #[tokio::test]
    async fn test_cancelled_listen_closes_controller() {
        let controller = LifecycleController::new();
        {
            // Name resolution runs on the blocking pool, so the first poll
            // cannot complete the bind.
            let listening = controller.listen("localhost", 0, app());
            futures_util::pin_mut!(listening);
            assert!(futures_util::poll!(listening.as_mut()).is_pending());
            assert_eq!(controller.state(), LifecycleState::Starting);
        }

        assert_eq!(controller.state(), LifecycleState::Closed);
        match controller.ready().await {
            Err(LifecycleError::StartFailed(message)) => assert_eq!(message, LISTEN_CANCELLED),
            other => panic!("unexpected ready result: {:?}", other),
        }
        assert!(matches!(
            controller.listen("127.0.0.1", 0, app()).await,
            Err(LifecycleError::CannotRestart)
        ));
    }

    #[tokio::test]
    async fn test_failed_bind_closes_controller() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();

        let controller = LifecycleController::new();
        let err = controller.listen("127.0.0.1", port, app()).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Bind { .. }));
        assert_eq!(controller.state(), LifecycleState::Closed);
        assert!(matches!(controller.ready().await, Err(LifecycleError::StartFailed(_))));
    }
}
