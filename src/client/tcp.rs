use async_trait::async_trait;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::Duration;

use crate::client::Api;
use crate::common::{debug, ErrorKind};
use crate::protocol::codec::RequestResponseCodec;
use crate::protocol::connection::Connection;
use crate::protocol::{Command, Entry, Request, Revision};
use crate::{Key, RepositoryName, Result, Value};

const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Request/response client over the framed tcp transport.
pub struct Client {
    connection: Connection,
    token: String,
    response_timeout: Duration,
}

impl Client {
    pub fn new(stream: impl Into<TcpStream>, token: impl Into<String>) -> Self {
        Self {
            connection: Connection::new(stream.into(), Some(1024 * 4)),
            token: token.into(),
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    pub async fn from_addr(addr: impl ToSocketAddrs, token: impl Into<String>) -> Result<Self> {
        Ok(Client::new(TcpStream::connect(addr).await?, token))
    }

    pub fn set_response_timeout(&mut self, timeout: Duration) {
        self.response_timeout = timeout;
    }

    async fn request(&mut self, command: Command) -> Result<Value> {
        let request = Request::new(self.token.clone(), command);
        debug!(operation = %request.operation(), "Send request");

        let envelope = RequestResponseCodec::request_envelope(request);
        self.connection.write_envelope(&envelope).await?;

        let frame = self
            .connection
            .read_frame_with_timeout(self.response_timeout)
            .await?
            .ok_or(ErrorKind::ConnectionResetByPeer)?;

        match RequestResponseCodec::decode_reply(&frame)? {
            Ok(data) => Ok(data),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl Api for Client {
    async fn create_repository(&mut self, repository: RepositoryName) -> Result<()> {
        self.request(Command::CreateRepository { repository })
            .await
            .map(|_| ())
    }

    async fn save(&mut self, repository: RepositoryName, key: Key, value: Value) -> Result<()> {
        self.request(Command::Save {
            repository,
            key,
            value,
        })
        .await
        .map(|_| ())
    }

    async fn fetch(
        &mut self,
        repository: RepositoryName,
        key: Key,
        version: Option<usize>,
    ) -> Result<Value> {
        let mut data = self
            .request(Command::Fetch {
                repository,
                key,
                version,
            })
            .await?;
        Ok(take(&mut data, "value").unwrap_or(Value::Null))
    }

    async fn entries(
        &mut self,
        repository: RepositoryName,
        version: Option<usize>,
    ) -> Result<Vec<Entry>> {
        let mut data = self
            .request(Command::Entries {
                repository,
                version,
            })
            .await?;
        let entries = take(&mut data, "entries").unwrap_or_else(|| Value::Array(Vec::new()));

        Ok(serde_json::from_value(entries)?)
    }

    async fn delete(&mut self, repository: RepositoryName, key: Key) -> Result<()> {
        self.request(Command::Delete { repository, key })
            .await
            .map(|_| ())
    }

    async fn create_entry(
        &mut self,
        repository: RepositoryName,
        key: Key,
        value: Value,
    ) -> Result<usize> {
        let data = self
            .request(Command::CreateEntry {
                repository,
                key,
                value,
            })
            .await?;
        version(&data)
    }

    async fn update_entry(
        &mut self,
        repository: RepositoryName,
        key: Key,
        value: Value,
    ) -> Result<usize> {
        let data = self
            .request(Command::UpdateEntry {
                repository,
                key,
                value,
            })
            .await?;
        version(&data)
    }

    async fn history(&mut self, repository: RepositoryName, key: Key) -> Result<Vec<Revision>> {
        let mut data = self.request(Command::History { repository, key }).await?;
        let history = take(&mut data, "history").unwrap_or_else(|| Value::Array(Vec::new()));

        Ok(serde_json::from_value(history)?)
    }
}

fn take(data: &mut Value, field: &str) -> Option<Value> {
    data.get_mut(field).map(Value::take)
}

fn version(data: &Value) -> Result<usize> {
    data.get("version")
        .and_then(Value::as_u64)
        .and_then(|version| usize::try_from(version).ok())
        .ok_or_else(|| {
            ErrorKind::NetworkFraming(format!("version expected in reply, got {}", data)).into()
        })
}
