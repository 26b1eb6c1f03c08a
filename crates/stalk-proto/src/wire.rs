use std::io::{BufRead, Read};

use crate::error::ProtocolError;
use crate::MAX_LINE_LEN;

/// Read one CRLF-terminated line, without the terminator.
///
/// Returns `Ok(None)` when the peer closed the stream before sending any byte
/// of a new line.
pub(crate) fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, ProtocolError> {
    let limit = (MAX_LINE_LEN + 2) as u64;
    let mut buf = Vec::with_capacity(64);
    let read = reader.by_ref().take(limit).read_until(b'\n', &mut buf)?;
    if read == 0 {
        return Ok(None);
    }

    if !buf.ends_with(b"\n") {
        if buf.len() as u64 >= limit {
            return Err(ProtocolError::LineTooLong { max: MAX_LINE_LEN });
        }
        return Err(ProtocolError::UnexpectedEof);
    }
    if !buf.ends_with(b"\r\n") {
        return Err(ProtocolError::Malformed(
            String::from_utf8_lossy(&buf).trim_end().to_string(),
        ));
    }

    buf.truncate(buf.len() - 2);
    String::from_utf8(buf)
        .map(Some)
        .map_err(|e| ProtocolError::Malformed(String::from_utf8_lossy(e.as_bytes()).into_owned()))
}

/// Read a data block of `len` bytes followed by CRLF.
pub(crate) fn read_block<R: BufRead>(reader: &mut R, len: usize) -> Result<Vec<u8>, ProtocolError> {
    let total = len
        .checked_add(2)
        .ok_or_else(|| ProtocolError::Malformed(format!("data block of {len} bytes")))?;
    let mut data = Vec::new();
    reader.by_ref().take(total as u64).read_to_end(&mut data)?;
    if data.len() != total {
        return Err(ProtocolError::UnexpectedEof);
    }
    if !data.ends_with(b"\r\n") {
        return Err(ProtocolError::MissingCrlf);
    }
    data.truncate(len);
    Ok(data)
}

/// Parse a numeric protocol argument, reporting the whole line on failure.
pub(crate) fn parse_number<T: std::str::FromStr>(word: &str, line: &str) -> Result<T, ProtocolError> {
    word.parse()
        .map_err(|_| ProtocolError::Malformed(line.to_string()))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn read_line_strips_crlf() {
        let mut input = Cursor::new(b"USING emails\r\nrest".to_vec());
        assert_eq!(read_line(&mut input).unwrap().as_deref(), Some("USING emails"));
    }

    #[test]
    fn read_line_clean_eof_is_none() {
        let mut input = Cursor::new(Vec::new());
        assert!(read_line(&mut input).unwrap().is_none());
    }

    #[test]
    fn read_line_rejects_bare_lf() {
        let mut input = Cursor::new(b"DELETED\n".to_vec());
        assert!(matches!(read_line(&mut input), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn read_line_rejects_truncated_line() {
        let mut input = Cursor::new(b"DELET".to_vec());
        assert!(matches!(read_line(&mut input), Err(ProtocolError::UnexpectedEof)));
    }

    #[test]
    fn read_line_enforces_max_length() {
        let mut long = vec![b'a'; MAX_LINE_LEN + 10];
        long.extend_from_slice(b"\r\n");
        let mut input = Cursor::new(long);
        assert!(matches!(
            read_line(&mut input),
            Err(ProtocolError::LineTooLong { .. })
        ));
    }

    #[test]
    fn read_block_requires_terminator() {
        let mut input = Cursor::new(b"hello!!".to_vec());
        assert!(matches!(read_block(&mut input, 5), Err(ProtocolError::MissingCrlf)));

        let mut input = Cursor::new(b"hel".to_vec());
        assert!(matches!(read_block(&mut input, 5), Err(ProtocolError::UnexpectedEof)));
    }

    #[test]
    fn read_block_keeps_embedded_crlf() {
        let mut input = Cursor::new(b"a\r\nb\r\n".to_vec());
        assert_eq!(read_block(&mut input, 4).unwrap(), b"a\r\nb");
    }

    #[test]
    fn read_block_rejects_length_at_usize_max() {
        let mut input = Cursor::new(b"x\r\n".to_vec());
        assert!(matches!(
            read_block(&mut input, usize::MAX),
            Err(ProtocolError::Malformed(_))
        ));
    }
}
