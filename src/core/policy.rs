use crate::common::{ErrorKind, Result};
use crate::core::Role;
use crate::protocol::Operation;

pub(crate) fn is_allowed(operation: Operation, role: Role) -> bool {
    match operation {
        Operation::CreateRepository => matches!(role, Role::Owner),
        Operation::Save
        | Operation::Delete
        | Operation::CreateEntry
        | Operation::UpdateEntry => matches!(role, Role::Owner | Role::Admin),
        Operation::Fetch | Operation::Entries | Operation::History => {
            matches!(role, Role::Owner | Role::Admin | Role::Member)
        }
    }
}

pub(crate) fn authorize(operation: Operation, role: Role) -> Result<()> {
    if is_allowed(operation, role) {
        Ok(())
    } else {
        Err(ErrorKind::InsufficientPermission { role, operation }.into())
    }
}
