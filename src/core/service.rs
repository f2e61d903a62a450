use std::sync::Arc;

use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::time::Duration;
use tracing_futures::Instrument;

use crate::common::{error, info, ErrorKind, Result};
use crate::core::middleware::{Dispatcher, MiddlewareChain, Storage};
use crate::core::token::{self, JwtVerifier};
use crate::core::{Backend, Config, UnitOfWork};
use crate::protocol::codec::Codec;
use crate::protocol::{ErrorResponse, Outcome, Request, Response};

pub(crate) struct Builder {
    config: Config,
    token: token::Config,
}

impl Builder {
    pub(crate) fn from_config(config: Config, token: token::Config) -> Self {
        Self { config, token }
    }

    pub(crate) async fn build(self) -> Result<Service> {
        let (send, recv) = mpsc::channel(self.config.request_channel_buffer());

        let verifier = Arc::new(JwtVerifier::from_config(&self.token)?);
        let dispatcher = self.build_dispatcher().await?;

        let mw = MiddlewareChain::new(verifier, dispatcher);

        Ok(Service {
            request_send: send,
            request_recv: recv,
            middlewares: Arc::new(mw),
            request_timeout: self.config.request_timeout(),
        })
    }

    async fn build_dispatcher(&self) -> Result<Dispatcher> {
        let storage = match self.config.backend() {
            Backend::File => {
                let root_dir = self.config.root_dir.clone().ok_or_else(|| {
                    ErrorKind::Config("root_dir is required by the file backend".into())
                })?;
                Storage::File { root_dir }
            }
            Backend::Memory => Storage::Memory,
        };

        let dispatcher = Dispatcher::new(storage, self.config.table_channel_buffer());
        dispatcher.load_tables().await?;

        Ok(dispatcher)
    }
}

pub(crate) struct Service {
    request_recv: Receiver<UnitOfWork>,
    request_send: Sender<UnitOfWork>,
    middlewares: Arc<MiddlewareChain>,
    request_timeout: Duration,
}

impl Service {
    pub(crate) fn handle(&self) -> ServiceHandle {
        ServiceHandle {
            request_sender: self.request_send.clone(),
            request_timeout: self.request_timeout,
        }
    }

    /// Runs until every handle has been dropped.
    pub(crate) async fn run(self) {
        let Service {
            mut request_recv,
            request_send,
            middlewares,
            ..
        } = self;
        drop(request_send);

        info!("Configuration service running");

        while let Some(uow) = request_recv.recv().await {
            let middlewares = Arc::clone(&middlewares);
            let span = tracing::info_span!("uow", operation = %uow.operation());

            tokio::spawn(
                async move {
                    if let Err(err) = middlewares.apply(uow).await {
                        error!(backtrace = ?err.backtrace(), "Handle unit of work {}", err);
                    }
                }
                .instrument(span),
            );
        }

        info!("Configuration service stopped");
    }
}

/// Entry point of every transport into the configuration service.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    request_sender: Sender<UnitOfWork>,
    request_timeout: Duration,
}

impl ServiceHandle {
    pub async fn execute(&self, request: Request) -> Outcome {
        self.try_execute(request).await.map_err(ErrorResponse::from)
    }

    /// Decode a frame, execute it and encode the outcome with the same codec.
    pub async fn exchange<C>(&self, codec: &C, frame: &[u8]) -> C::Output
    where
        C: Codec + Sync,
        C::Context: Send,
    {
        let (context, request) = codec.decode(frame);
        let outcome = match request {
            Ok(request) => self.execute(request).await,
            Err(err) => Err(err),
        };
        codec.encode(context, outcome)
    }

    async fn try_execute(&self, request: Request) -> Result<Response> {
        let (uow, pending) = UnitOfWork::new(request);
        let sender = &self.request_sender;

        tokio::time::timeout(self.request_timeout, async move {
            sender.send(uow).await?;
            pending.recv().await
        })
        .await?
    }
}
