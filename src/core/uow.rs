mod create_repository;
pub(crate) use self::create_repository::CreateRepository;

mod save;
pub(crate) use self::save::Save;

mod fetch;
pub(crate) use self::fetch::Fetch;

mod entries;
pub(crate) use self::entries::Entries;

mod delete;
pub(crate) use self::delete::Delete;

mod write_entry;
pub(crate) use self::write_entry::{Expect, WriteEntry};

mod history;
pub(crate) use self::history::History;

use std::fmt;

use tokio::sync::oneshot;

use crate::common::{Error, ErrorKind, Result};
use crate::core::Principal;
use crate::protocol::{
    Command, Entry, Key, Operation, RepositoryName, Request, Response, Revision, Value,
};

pub(crate) enum UnitOfWork {
    CreateRepository(Work<CreateRepository, ()>),
    Save(Work<Save, ()>),
    Fetch(Work<Fetch, Entry>),
    Entries(Work<Entries, Vec<Entry>>),
    Delete(Work<Delete, ()>),
    WriteEntry(Work<WriteEntry, usize>),
    History(Work<History, Vec<Revision>>),
}

pub(crate) struct Work<Req, Res> {
    pub(crate) token: String,
    // Set by the authenticator.
    pub(crate) principal: Option<Principal>,
    pub(crate) request: Req,
    // Wrap with option so that response can be sent via mut reference.
    pub(crate) response_sender: Option<oneshot::Sender<Result<Res>>>,
}

impl<Req, Res> Work<Req, Res> {
    fn new(token: String, request: Req) -> (Self, oneshot::Receiver<Result<Res>>) {
        let (tx, rx) = oneshot::channel();
        (
            Work {
                token,
                principal: None,
                request,
                response_sender: Some(tx),
            },
            rx,
        )
    }

    /// True once the requester stopped waiting, after a timeout for instance.
    pub(crate) fn is_abandoned(&self) -> bool {
        self.response_sender
            .as_ref()
            .map_or(true, |sender| sender.is_closed())
    }

    pub(crate) fn send_response(&mut self, response: Result<Res>) -> Result<()> {
        self.response_sender
            .take()
            .ok_or_else(|| Error::from(ErrorKind::Internal("response already sent".to_owned())))?
            .send(response)
            .map_err(|_| ErrorKind::Internal("requester has gone away".to_owned()).into())
    }
}

// Apply the same expression to the work of every variant.
macro_rules! with_work {
    ($uow:expr, $work:ident => $body:expr) => {
        match $uow {
            UnitOfWork::CreateRepository($work) => $body,
            UnitOfWork::Save($work) => $body,
            UnitOfWork::Fetch($work) => $body,
            UnitOfWork::Entries($work) => $body,
            UnitOfWork::Delete($work) => $body,
            UnitOfWork::WriteEntry($work) => $body,
            UnitOfWork::History($work) => $body,
        }
    };
}

impl UnitOfWork {
    pub(crate) fn new(request: Request) -> (UnitOfWork, PendingResponse) {
        let Request { token, command } = request;
        match command {
            Command::CreateRepository { repository } => {
                let (work, rx) = Work::new(token, CreateRepository { repository });
                (
                    UnitOfWork::CreateRepository(work),
                    PendingResponse::Acknowledgment(rx),
                )
            }
            Command::Save {
                repository,
                key,
                value,
            } => {
                let (work, rx) = Work::new(
                    token,
                    Save {
                        repository,
                        key,
                        value,
                    },
                );
                (UnitOfWork::Save(work), PendingResponse::Acknowledgment(rx))
            }
            Command::Fetch {
                repository,
                key,
                version,
            } => {
                let (work, rx) = Work::new(
                    token,
                    Fetch {
                        repository,
                        key,
                        version,
                    },
                );
                (UnitOfWork::Fetch(work), PendingResponse::Entry(rx))
            }
            Command::Entries {
                repository,
                version,
            } => {
                let (work, rx) = Work::new(
                    token,
                    Entries {
                        repository,
                        version,
                    },
                );
                (UnitOfWork::Entries(work), PendingResponse::Entries(rx))
            }
            Command::Delete { repository, key } => {
                let (work, rx) = Work::new(token, Delete { repository, key });
                (UnitOfWork::Delete(work), PendingResponse::Acknowledgment(rx))
            }
            Command::CreateEntry {
                repository,
                key,
                value,
            } => UnitOfWork::write_entry(token, repository, key, value, Expect::Absent),
            Command::UpdateEntry {
                repository,
                key,
                value,
            } => UnitOfWork::write_entry(token, repository, key, value, Expect::Present),
            Command::History { repository, key } => {
                let (work, rx) = Work::new(token, History { repository, key });
                (UnitOfWork::History(work), PendingResponse::History(rx))
            }
        }
    }

    fn write_entry(
        token: String,
        repository: RepositoryName,
        key: Key,
        value: Value,
        expect: Expect,
    ) -> (UnitOfWork, PendingResponse) {
        let (work, rx) = Work::new(
            token,
            WriteEntry {
                repository,
                key,
                value,
                expect,
            },
        );
        (UnitOfWork::WriteEntry(work), PendingResponse::Version(rx))
    }

    pub(crate) fn operation(&self) -> Operation {
        match self {
            UnitOfWork::CreateRepository(_) => Operation::CreateRepository,
            UnitOfWork::Save(_) => Operation::Save,
            UnitOfWork::Fetch(_) => Operation::Fetch,
            UnitOfWork::Entries(_) => Operation::Entries,
            UnitOfWork::Delete(_) => Operation::Delete,
            UnitOfWork::WriteEntry(write) => match write.request.expect {
                Expect::Absent => Operation::CreateEntry,
                Expect::Present => Operation::UpdateEntry,
            },
            UnitOfWork::History(_) => Operation::History,
        }
    }

    pub(crate) fn repository(&self) -> &RepositoryName {
        with_work!(self, work => &work.request.repository)
    }

    pub(crate) fn is_abandoned(&self) -> bool {
        with_work!(self, work => work.is_abandoned())
    }

    pub(crate) fn token(&self) -> &str {
        with_work!(self, work => &work.token)
    }

    pub(crate) fn principal(&self) -> Option<&Principal> {
        with_work!(self, work => work.principal.as_ref())
    }

    pub(crate) fn set_principal(&mut self, principal: Principal) {
        with_work!(self, work => work.principal = Some(principal))
    }

    /// Answers the requester with the given error instead of a result.
    pub(crate) fn send_error(mut self, err: Error) -> Result<()> {
        with_work!(&mut self, work => work.send_response(Err(err)))
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        with_work!(self, work => write!(f, "{}", work.request))
    }
}

/// Receiving half of a unit of work.
pub(crate) enum PendingResponse {
    Acknowledgment(oneshot::Receiver<Result<()>>),
    Entry(oneshot::Receiver<Result<Entry>>),
    Entries(oneshot::Receiver<Result<Vec<Entry>>>),
    Version(oneshot::Receiver<Result<usize>>),
    History(oneshot::Receiver<Result<Vec<Revision>>>),
}

impl PendingResponse {
    pub(crate) async fn recv(self) -> Result<Response> {
        match self {
            PendingResponse::Acknowledgment(rx) => rx.await?.map(|_| Response::Acknowledgment),
            PendingResponse::Entry(rx) => rx.await?.map(Response::Entry),
            PendingResponse::Entries(rx) => rx.await?.map(Response::Entries),
            PendingResponse::Version(rx) => rx.await?.map(Response::Version),
            PendingResponse::History(rx) => rx.await?.map(Response::History),
        }
    }
}
