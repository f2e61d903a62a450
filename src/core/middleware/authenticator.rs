use std::sync::Arc;

use async_trait::async_trait;

use crate::common::Result;
use crate::core::middleware::Middleware;
use crate::core::token::TokenVerifier;
use crate::core::UnitOfWork;

pub(crate) struct Authenticator<MW> {
    verifier: Arc<dyn TokenVerifier>,
    next: MW,
}

impl<MW> Authenticator<MW> {
    pub(crate) fn new(verifier: Arc<dyn TokenVerifier>, next: MW) -> Self {
        Self { verifier, next }
    }
}

#[async_trait]
impl<MW> Middleware for Authenticator<MW>
where
    MW: Middleware + Send + Sync + 'static,
{
    async fn apply(&self, mut uow: UnitOfWork) -> Result<()> {
        let verified = self.verifier.verify(uow.token());
        match verified {
            Ok(principal) => {
                uow.set_principal(principal);
                self.next.apply(uow).await
            }
            Err(err) => uow.send_error(err),
        }
    }
}
