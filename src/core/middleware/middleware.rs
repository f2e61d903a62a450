use async_trait::async_trait;

use crate::common::Result;
use crate::core::UnitOfWork;

#[async_trait]
pub(crate) trait Middleware {
    // Err means the unit of work could not be answered at all.
    async fn apply(&self, uow: UnitOfWork) -> Result<()>;
}
