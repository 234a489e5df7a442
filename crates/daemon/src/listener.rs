// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! Each connection carries one request and one response. Requests act on
//! the runtime directly; the queue does its own locking.

use std::sync::Arc;
use std::time::Instant;

use fm_core::{Action, Cause, CauseOfInterruption, Clock, ItemId, LeftItem};
use fm_engine::{BuildError, Runtime, ScheduleRequest};
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::protocol::{
    self, Request, Response, StatusSummary, DEFAULT_TIMEOUT, PROTOCOL_VERSION,
};

/// Listener task for accepting socket connections.
pub struct Listener<C: Clock> {
    socket: UnixListener,
    ctx: Arc<ListenCtx<C>>,
}

/// What request handlers need from the daemon
pub struct ListenCtx<C: Clock> {
    pub runtime: Arc<Runtime<C>>,
    pub start_time: Instant,
    pub shutdown: Arc<Notify>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

impl<C: Clock> Listener<C> {
    pub fn new(socket: UnixListener, ctx: ListenCtx<C>) -> Self {
        Self {
            socket,
            ctx: Arc::new(ctx),
        }
    }

    /// Accept connections until the task is dropped, one task per connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &ctx).await {
                            match e {
                                ConnectionError::Protocol(
                                    protocol::ProtocolError::ConnectionClosed,
                                ) => debug!("Client disconnected"),
                                ConnectionError::Protocol(protocol::ProtocolError::Timeout) => {
                                    warn!("Connection timeout")
                                }
                                _ => error!("Connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

async fn handle_connection<C: Clock>(
    stream: UnixStream,
    ctx: &ListenCtx<C>,
) -> Result<(), ConnectionError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;

    // Reads are frequent (polling); log them quietly
    if matches!(
        request,
        Request::Ping | Request::Status | Request::Queue | Request::Item { .. } | Request::Executors
    ) {
        debug!(request = ?request, "received query");
    } else {
        info!(request = ?request, "received request");
    }

    let response = handle_request(request, ctx).await;
    debug!("Sending response: {:?}", response);

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;
    Ok(())
}

/// Handle a single request and return a response.
pub(crate) async fn handle_request<C: Clock>(request: Request, ctx: &ListenCtx<C>) -> Response {
    let runtime = &ctx.runtime;
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Schedule {
            task,
            quiet_period_secs,
            parameters,
            user,
        } => {
            let mut req = ScheduleRequest::new(task).cause(match user {
                Some(name) => Cause::User { name },
                None => Cause::Remote {
                    host: "localhost".to_string(),
                    note: None,
                },
            });
            if let Some(secs) = quiet_period_secs {
                req = req.quiet_period(std::time::Duration::from_secs(secs));
            }
            if !parameters.is_empty() {
                req = req.action(Action::parameters(parameters));
            }
            match runtime.queue().schedule(req) {
                Ok(scheduled) => Response::Scheduled {
                    item: scheduled.item,
                    created: scheduled.created,
                },
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }

        Request::Cancel { item } => Response::Cancelled {
            cancelled: runtime.queue().cancel(item),
        },

        Request::Wait { item } => wait_for(runtime, item).await,

        Request::Interrupt {
            computer,
            executor,
            result,
            user,
        } => {
            let cause = user.map(|name| CauseOfInterruption::User { name });
            match runtime.interrupt(&computer, executor, result, cause) {
                Ok(interrupted) => Response::Interrupted { interrupted },
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }

        Request::QuietDown { on } => {
            runtime.queue().quiet_down(on);
            Response::Ok
        }

        Request::SetOffline { computer, offline } => match runtime.set_offline(&computer, offline)
        {
            Ok(()) => Response::Ok,
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },

        Request::Queue => Response::Queue {
            items: runtime.queue().items(),
        },

        Request::Item { item } => Response::Item {
            queued: runtime.queue().item(item),
            left: runtime.queue().left_item(item),
        },

        Request::Executors => Response::Executors {
            executors: runtime.executors(),
        },

        Request::Status => {
            let executors = runtime.executors();
            Response::Status(StatusSummary {
                version: PROTOCOL_VERSION.to_string(),
                uptime_secs: ctx.start_time.elapsed().as_secs(),
                queued: runtime.queue().len(),
                buildable: runtime.queue().buildable_items().len(),
                executors_busy: executors.iter().filter(|e| e.current.is_some()).count(),
                executors_total: executors.len(),
                quieting_down: runtime.queue().is_quieting_down(),
            })
        }

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }
    }
}

async fn wait_for<C: Clock>(runtime: &Runtime<C>, item: ItemId) -> Response {
    let Some(future) = runtime.queue().future(item) else {
        // Already gone: answer from the left item's record
        return match runtime.queue().left_item(item) {
            Some(left) if left.is_cancelled() => Response::Finished {
                item,
                result: None,
                error: Some(BuildError::Cancelled.to_string()),
            },
            Some(LeftItem {
                result: Some(result),
                ..
            }) => Response::Finished {
                item,
                result: Some(result),
                error: None,
            },
            _ => Response::Error {
                message: format!("item {} is not queued or running", item),
            },
        };
    };
    match future.wait().await {
        Ok(result) => Response::Finished {
            item,
            result: Some(result),
            error: None,
        },
        Err(e) => Response::Finished {
            item,
            result: None,
            error: Some(e.to_string()),
        },
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
