use bytes::Buf;

pub(crate) const DELIMITER: &[u8] = b"\r\n";

pub(crate) mod frameprefix {
    pub(crate) const ENVELOPE: u8 = b'$';
}

#[derive(Debug)]
pub(crate) enum Error {
    /// Not enough data is available to decode a frame from buffer.
    Incomplete,
    Invalid(String),
}

type ByteCursor<'a> = std::io::Cursor<&'a [u8]>;

/// Validates that a whole frame is buffered without copying it.
pub(crate) fn check(src: &mut ByteCursor, max_bytes: usize) -> Result<(), Error> {
    let len = ensure_prefix_format(src, max_bytes)?;
    // skip payload + delimiter
    cursor::skip(src, len + DELIMITER.len())
}

pub(crate) fn parse(src: &mut ByteCursor, max_bytes: usize) -> Result<Vec<u8>, Error> {
    let len = ensure_prefix_format(src, max_bytes)?;
    let n = len + DELIMITER.len();
    if src.remaining() < n {
        return Err(Error::Incomplete);
    }
    if &src.chunk()[len..n] != DELIMITER {
        return Err(Error::Invalid("frame delimiter expected".into()));
    }
    let payload = Vec::from(&src.chunk()[..len]);

    cursor::skip(src, n)?;

    Ok(payload)
}

fn ensure_prefix_format(src: &mut ByteCursor, max_bytes: usize) -> Result<usize, Error> {
    if cursor::get_u8(src)? != frameprefix::ENVELOPE {
        return Err(Error::Invalid("frame prefix expected".into()));
    }

    let len = cursor::get_decimal(src)? as usize;
    if len > max_bytes {
        return Err(Error::Invalid(format!(
            "frame length {} exceeds maximum bytes({})",
            len, max_bytes
        )));
    }
    Ok(len)
}

// cursor utilities.
mod cursor {
    use super::*;

    pub(super) fn get_u8(src: &mut ByteCursor) -> Result<u8, Error> {
        if !src.has_remaining() {
            return Err(Error::Incomplete);
        }
        Ok(src.get_u8())
    }

    pub(super) fn skip(src: &mut ByteCursor, n: usize) -> Result<(), Error> {
        if src.remaining() < n {
            return Err(Error::Incomplete);
        }
        src.advance(n);
        Ok(())
    }

    pub(super) fn get_decimal(src: &mut ByteCursor) -> Result<u64, Error> {
        let line = get_line(src)?;

        atoi::atoi::<u64>(line)
            .ok_or_else(|| Error::Invalid("invalid protocol decimal format".into()))
    }

    pub(super) fn get_line<'a>(src: &'a mut ByteCursor) -> Result<&'a [u8], Error> {
        let start = src.position() as usize;
        let end = src.get_ref().len().saturating_sub(1);

        for i in start..end {
            if src.get_ref()[i] == DELIMITER[0] && src.get_ref()[i + 1] == DELIMITER[1] {
                src.set_position((i + 2) as u64);

                return Ok(&src.get_ref()[start..i]);
            }
        }

        Err(Error::Incomplete)
    }
}
