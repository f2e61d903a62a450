use std::sync::Arc;

use crate::common::Result;
use crate::core::middleware::{Authenticator, Authorizer, Dispatcher, Logger, Middleware};
use crate::core::token::TokenVerifier;
use crate::core::UnitOfWork;

pub(crate) struct MiddlewareChain {
    root: Logger<Authenticator<Authorizer<Dispatcher>>>,
}

impl MiddlewareChain {
    pub(crate) fn new(verifier: Arc<dyn TokenVerifier>, dispatcher: Dispatcher) -> Self {
        let authorizer = Authorizer::new(dispatcher);

        let authenticator = Authenticator::new(verifier, authorizer);

        let logger = Logger::new(authenticator);

        Self { root: logger }
    }

    pub(crate) async fn apply(&self, uow: UnitOfWork) -> Result<()> {
        self.root.apply(uow).await
    }
}
