use async_trait::async_trait;

use crate::common::{ErrorKind, Result};
use crate::core::middleware::Middleware;
use crate::core::{policy, UnitOfWork};

pub(crate) struct Authorizer<MW> {
    next: MW,
}

impl<MW> Authorizer<MW> {
    pub(crate) fn new(next: MW) -> Self {
        Self { next }
    }
}

#[async_trait]
impl<MW> Middleware for Authorizer<MW>
where
    MW: Middleware + Send + Sync + 'static,
{
    async fn apply(&self, uow: UnitOfWork) -> Result<()> {
        let role = match uow.principal() {
            Some(principal) => principal.role,
            None => {
                return uow.send_error(
                    ErrorKind::Internal("unauthenticated unit of work".into()).into(),
                )
            }
        };

        match policy::authorize(uow.operation(), role) {
            Ok(()) => self.next.apply(uow).await,
            Err(err) => uow.send_error(err),
        }
    }
}
