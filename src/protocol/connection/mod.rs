mod frame;

use std::io::{self, Cursor};

use bytes::{Buf, BytesMut};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::time::Duration;

use crate::common::{Error, ErrorKind, Result};
use crate::protocol::MAX_VALUE_BYTES;

use self::frame::{frameprefix, DELIMITER};

// Room for the envelope and the fields around the largest value.
const MAX_FRAME_BYTES: usize = MAX_VALUE_BYTES + 64 * 1024;

/// Exchanges `$<len>\r\n<json>\r\n` frames.
pub struct Connection<T = TcpStream> {
    stream: BufWriter<T>,
    // The buffer for reading frames.
    buffer: BytesMut,
}

impl<T> Connection<T>
where
    T: AsyncWrite + AsyncRead + Unpin,
{
    pub(crate) fn new(stream: T, buffer_size: Option<usize>) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(buffer_size.unwrap_or(4 * 1024)),
        }
    }

    pub(crate) async fn write_envelope(&mut self, envelope: &Value) -> Result<()> {
        let payload = serde_json::to_vec(envelope)?;
        self.write_frame(&payload).await
    }

    pub(crate) async fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        self.stream.write_u8(frameprefix::ENVELOPE).await?;
        self.write_decimal(payload.len() as u64).await?;
        self.stream.write_all(payload).await?;
        self.stream.write_all(DELIMITER).await?;

        self.stream.flush().await?;
        Ok(())
    }

    pub(crate) async fn read_frame_with_timeout(
        &mut self,
        duration: Duration,
    ) -> Result<Option<Vec<u8>>> {
        match tokio::time::timeout(duration, self.read_frame()).await {
            Ok(read_result) => read_result,
            Err(elapsed) => Err(Error::from(elapsed)),
        }
    }

    pub(crate) async fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if let Some(payload) = self.parse_frame()? {
                return Ok(Some(payload));
            }

            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(ErrorKind::ConnectionResetByPeer.into())
                };
            }
        }
    }

    fn parse_frame(&mut self) -> Result<Option<Vec<u8>>> {
        use frame::Error::{Incomplete, Invalid};

        let mut buf = Cursor::new(&self.buffer[..]);

        match frame::check(&mut buf, MAX_FRAME_BYTES) {
            Ok(_) => {
                let len = buf.position() as usize;
                buf.set_position(0);
                let payload = frame::parse(&mut buf, MAX_FRAME_BYTES).map_err(|err| match err {
                    Incomplete => ErrorKind::NetworkFraming("incomplete frame".into()),
                    Invalid(description) => ErrorKind::NetworkFraming(description),
                })?;
                self.buffer.advance(len);

                Ok(Some(payload))
            }
            Err(Incomplete) => Ok(None),
            Err(Invalid(description)) => Err(ErrorKind::NetworkFraming(description).into()),
        }
    }

    async fn write_decimal(&mut self, val: u64) -> io::Result<()> {
        use std::io::Write;

        let mut buf = [0u8; 20];
        let mut buf = Cursor::new(&mut buf[..]);
        write!(&mut buf, "{}", val)?;

        let pos = buf.position() as usize;
        self.stream.write_all(&buf.get_ref()[..pos]).await?;
        self.stream.write_all(DELIMITER).await
    }
}
