use std::io::{self, BufRead, Write};

use crate::error::ProtocolError;
use crate::wire::{parse_number, read_block, read_line};

/// A server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Using(String),
    Watching(u32),
    Inserted(u64),
    /// The server accepted the job but could not grow its priority queue.
    Buried(u64),
    Reserved { id: u64, data: Vec<u8> },
    TimedOut,
    DeadlineSoon,
    Deleted,
    NotFound,
    NotIgnored,
    /// YAML body of a `stats-*` reply.
    Ok(Vec<u8>),
    ExpectedCrlf,
    JobTooBig,
    Draining,
    OutOfMemory,
    InternalError,
    BadFormat,
    UnknownCommand,
}

impl Response {
    /// The leading keyword of the reply line.
    pub fn keyword(&self) -> &'static str {
        match self {
            Response::Using(_) => "USING",
            Response::Watching(_) => "WATCHING",
            Response::Inserted(_) => "INSERTED",
            Response::Buried(_) => "BURIED",
            Response::Reserved { .. } => "RESERVED",
            Response::TimedOut => "TIMED_OUT",
            Response::DeadlineSoon => "DEADLINE_SOON",
            Response::Deleted => "DELETED",
            Response::NotFound => "NOT_FOUND",
            Response::NotIgnored => "NOT_IGNORED",
            Response::Ok(_) => "OK",
            Response::ExpectedCrlf => "EXPECTED_CRLF",
            Response::JobTooBig => "JOB_TOO_BIG",
            Response::Draining => "DRAINING",
            Response::OutOfMemory => "OUT_OF_MEMORY",
            Response::InternalError => "INTERNAL_ERROR",
            Response::BadFormat => "BAD_FORMAT",
            Response::UnknownCommand => "UNKNOWN_COMMAND",
        }
    }

    /// Errors any command may receive, independent of its semantics.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Response::OutOfMemory
                | Response::InternalError
                | Response::BadFormat
                | Response::UnknownCommand
        )
    }

    /// Decode the next reply from a server stream.
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Response, ProtocolError> {
        let line = read_line(reader)?.ok_or(ProtocolError::UnexpectedEof)?;
        let words: Vec<&str> = line.split(' ').collect();

        let response = match words.as_slice() {
            ["USING", tube] => Response::Using(tube.to_string()),
            ["WATCHING", count] => Response::Watching(parse_number(count, &line)?),
            ["INSERTED", id] => Response::Inserted(parse_number(id, &line)?),
            ["BURIED", id] => Response::Buried(parse_number(id, &line)?),
            ["RESERVED", id, bytes] => {
                let id = parse_number(id, &line)?;
                let bytes = parse_number(bytes, &line)?;
                Response::Reserved {
                    id,
                    data: read_block(reader, bytes)?,
                }
            }
            ["OK", bytes] => {
                let bytes = parse_number(bytes, &line)?;
                Response::Ok(read_block(reader, bytes)?)
            }
            ["TIMED_OUT"] => Response::TimedOut,
            ["DEADLINE_SOON"] => Response::DeadlineSoon,
            ["DELETED"] => Response::Deleted,
            ["NOT_FOUND"] => Response::NotFound,
            ["NOT_IGNORED"] => Response::NotIgnored,
            ["EXPECTED_CRLF"] => Response::ExpectedCrlf,
            ["JOB_TOO_BIG"] => Response::JobTooBig,
            ["DRAINING"] => Response::Draining,
            ["OUT_OF_MEMORY"] => Response::OutOfMemory,
            ["INTERNAL_ERROR"] => Response::InternalError,
            ["BAD_FORMAT"] => Response::BadFormat,
            ["UNKNOWN_COMMAND"] => Response::UnknownCommand,
            _ => return Err(ProtocolError::Malformed(line.clone())),
        };
        Ok(response)
    }

    /// Encode the reply line and, for `RESERVED` and `OK`, its data block.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Response::Using(tube) => write!(writer, "USING {tube}\r\n"),
            Response::Watching(count) => write!(writer, "WATCHING {count}\r\n"),
            Response::Inserted(id) => write!(writer, "INSERTED {id}\r\n"),
            Response::Buried(id) => write!(writer, "BURIED {id}\r\n"),
            Response::Reserved { id, data } => {
                write!(writer, "RESERVED {id} {}\r\n", data.len())?;
                writer.write_all(data)?;
                writer.write_all(b"\r\n")
            }
            Response::Ok(data) => {
                write!(writer, "OK {}\r\n", data.len())?;
                writer.write_all(data)?;
                writer.write_all(b"\r\n")
            }
            other => write!(writer, "{}\r\n", other.keyword()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn decode(bytes: &[u8]) -> Result<Response, ProtocolError> {
        Response::read_from(&mut Cursor::new(bytes.to_vec()))
    }

    #[test]
    fn decodes_reserved_job_with_payload() {
        let response = decode(b"RESERVED 17 11\r\n{\"body\":1}\n\r\n").unwrap();
        assert_eq!(
            response,
            Response::Reserved {
                id: 17,
                data: b"{\"body\":1}\n".to_vec(),
            }
        );
    }

    #[test]
    fn decodes_keyword_only_replies() {
        assert_eq!(decode(b"TIMED_OUT\r\n").unwrap(), Response::TimedOut);
        assert_eq!(decode(b"NOT_FOUND\r\n").unwrap(), Response::NotFound);
        assert_eq!(decode(b"INSERTED 9\r\n").unwrap(), Response::Inserted(9));
        assert_eq!(decode(b"WATCHING 2\r\n").unwrap(), Response::Watching(2));
    }

    #[test]
    fn server_errors_are_flagged() {
        for line in ["OUT_OF_MEMORY", "INTERNAL_ERROR", "BAD_FORMAT", "UNKNOWN_COMMAND"] {
            let response = decode(format!("{line}\r\n").as_bytes()).unwrap();
            assert!(response.is_server_error(), "{line} should be a server error");
            assert_eq!(response.keyword(), line);
        }
        assert!(!Response::NotFound.is_server_error());
    }

    #[test]
    fn rejects_garbage_and_eof() {
        assert!(matches!(decode(b"INSERTED x\r\n"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(decode(b"HELLO\r\n"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(decode(b""), Err(ProtocolError::UnexpectedEof)));
        assert!(matches!(
            decode(b"RESERVED 1 10\r\nshort\r\n"),
            Err(ProtocolError::UnexpectedEof)
        ));
        assert!(matches!(
            decode(b"RESERVED 1 18446744073709551615\r\nx\r\n"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn encoded_replies_decode_back() {
        let replies = [
            Response::Using("emails".to_string()),
            Response::Reserved {
                id: 3,
                data: b"payload".to_vec(),
            },
            Response::Ok(b"---\nname: emails\n".to_vec()),
            Response::DeadlineSoon,
        ];

        let mut buf = Vec::new();
        for reply in &replies {
            reply.write_to(&mut buf).unwrap();
        }

        let mut input = Cursor::new(buf);
        for reply in replies {
            assert_eq!(Response::read_from(&mut input).unwrap(), reply);
        }
    }
}
