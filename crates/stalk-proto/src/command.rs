use std::borrow::Cow;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::time::Duration;

use crate::error::ProtocolError;
use crate::wire::{parse_number, read_block, read_line};

/// A client request. Borrowed on the client side, owned (`'static`) once
/// decoded by a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Use { tube: Cow<'a, str> },
    Watch { tube: Cow<'a, str> },
    Ignore { tube: Cow<'a, str> },
    Put {
        priority: u32,
        /// Whole seconds before the job becomes ready.
        delay: u32,
        /// Whole seconds a reservation may last.
        ttr: u32,
        data: Cow<'a, [u8]>,
    },
    ReserveWithTimeout { timeout: u32 },
    Delete { id: u64 },
    StatsTube { tube: Cow<'a, str> },
}

impl<'a> Command<'a> {
    pub fn use_tube(tube: &'a str) -> Self {
        Command::Use { tube: Cow::Borrowed(tube) }
    }

    pub fn watch(tube: &'a str) -> Self {
        Command::Watch { tube: Cow::Borrowed(tube) }
    }

    pub fn ignore(tube: &'a str) -> Self {
        Command::Ignore { tube: Cow::Borrowed(tube) }
    }

    pub fn put(priority: u32, delay: Duration, ttr: Duration, data: &'a [u8]) -> Self {
        Command::Put {
            priority,
            delay: whole_seconds(delay),
            ttr: whole_seconds(ttr),
            data: Cow::Borrowed(data),
        }
    }

    pub fn stats_tube(tube: &'a str) -> Self {
        Command::StatsTube { tube: Cow::Borrowed(tube) }
    }

    /// The protocol keyword of this command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Use { .. } => "use",
            Command::Watch { .. } => "watch",
            Command::Ignore { .. } => "ignore",
            Command::Put { .. } => "put",
            Command::ReserveWithTimeout { .. } => "reserve-with-timeout",
            Command::Delete { .. } => "delete",
            Command::StatsTube { .. } => "stats-tube",
        }
    }

    /// Encode the command line and, for `put`, its data block.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(writer, "{self}\r\n")?;
        if let Command::Put { data, .. } = self {
            writer.write_all(data)?;
            writer.write_all(b"\r\n")?;
        }
        Ok(())
    }

    /// Decode the next request from a client stream.
    ///
    /// Returns `Ok(None)` when the client hung up between requests.
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Option<Command<'static>>, ProtocolError> {
        let Some(line) = read_line(reader)? else {
            return Ok(None);
        };

        let words: Vec<&str> = line.split(' ').collect();
        let command = match words.as_slice() {
            ["use", tube] => Command::Use { tube: owned(tube) },
            ["watch", tube] => Command::Watch { tube: owned(tube) },
            ["ignore", tube] => Command::Ignore { tube: owned(tube) },
            ["put", priority, delay, ttr, bytes] => {
                let priority = parse_number(priority, &line)?;
                let delay = parse_number(delay, &line)?;
                let ttr = parse_number(ttr, &line)?;
                let bytes: usize = parse_number(bytes, &line)?;
                let data = read_block(reader, bytes)?;
                Command::Put {
                    priority,
                    delay,
                    ttr,
                    data: Cow::Owned(data),
                }
            }
            ["reserve-with-timeout", timeout] => Command::ReserveWithTimeout {
                timeout: parse_number(timeout, &line)?,
            },
            ["delete", id] => Command::Delete {
                id: parse_number(id, &line)?,
            },
            ["stats-tube", tube] => Command::StatsTube { tube: owned(tube) },
            [name, ..] if is_known(name) => return Err(ProtocolError::Malformed(line.clone())),
            [name, ..] => return Err(ProtocolError::UnknownCommand(name.to_string())),
            [] => return Err(ProtocolError::Malformed(line.clone())),
        };
        Ok(Some(command))
    }
}

fn owned(word: &str) -> Cow<'static, str> {
    Cow::Owned(word.to_string())
}

fn is_known(name: &str) -> bool {
    matches!(
        name,
        "use" | "watch" | "ignore" | "put" | "reserve-with-timeout" | "delete" | "stats-tube"
    )
}

/// The request line, without CRLF or data block.
impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Use { tube } => write!(f, "use {tube}"),
            Command::Watch { tube } => write!(f, "watch {tube}"),
            Command::Ignore { tube } => write!(f, "ignore {tube}"),
            Command::Put {
                priority,
                delay,
                ttr,
                data,
            } => write!(f, "put {priority} {delay} {ttr} {}", data.len()),
            Command::ReserveWithTimeout { timeout } => write!(f, "reserve-with-timeout {timeout}"),
            Command::Delete { id } => write!(f, "delete {id}"),
            Command::StatsTube { tube } => write!(f, "stats-tube {tube}"),
        }
    }
}

/// Convert a duration to the whole seconds the protocol carries.
///
/// Any sub-second remainder rounds up, so a delayed job never becomes ready
/// before the requested time. Saturates at `u32::MAX`.
pub fn whole_seconds(duration: Duration) -> u32 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    u32::try_from(secs).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn encode(command: &Command<'_>) -> Vec<u8> {
        let mut buf = Vec::new();
        command.write_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn put_encodes_header_and_block() {
        let command = Command::put(1024, Duration::ZERO, Duration::from_secs(90), b"hello");
        assert_eq!(encode(&command), b"put 1024 0 90 5\r\nhello\r\n");
    }

    #[test]
    fn put_rounds_sub_second_delay_up() {
        let command = Command::put(1, Duration::from_millis(1500), Duration::from_secs(60), b"");
        assert_eq!(encode(&command), b"put 1 2 60 0\r\n\r\n");
    }

    #[test]
    fn whole_seconds_rounding() {
        assert_eq!(whole_seconds(Duration::ZERO), 0);
        assert_eq!(whole_seconds(Duration::from_millis(1)), 1);
        assert_eq!(whole_seconds(Duration::from_millis(1000)), 1);
        assert_eq!(whole_seconds(Duration::from_millis(1001)), 2);
        assert_eq!(whole_seconds(Duration::from_secs(u64::MAX)), u32::MAX);
    }

    #[test]
    fn simple_commands_encode_as_single_line() {
        assert_eq!(encode(&Command::use_tube("emails")), b"use emails\r\n");
        assert_eq!(encode(&Command::watch("emails")), b"watch emails\r\n");
        assert_eq!(encode(&Command::ignore("default")), b"ignore default\r\n");
        assert_eq!(
            encode(&Command::ReserveWithTimeout { timeout: 0 }),
            b"reserve-with-timeout 0\r\n"
        );
        assert_eq!(encode(&Command::Delete { id: 42 }), b"delete 42\r\n");
        assert_eq!(encode(&Command::stats_tube("emails")), b"stats-tube emails\r\n");
    }

    #[test]
    fn server_decodes_put_with_binary_payload() {
        let payload = b"{\"body\":\"a\\r\\nb\"}\r\n";
        let command = Command::put(7, Duration::from_secs(3), Duration::from_secs(30), payload);
        let mut input = Cursor::new(encode(&command));

        let decoded = Command::read_from(&mut input).unwrap().unwrap();
        assert_eq!(decoded, command);
        assert!(Command::read_from(&mut input).unwrap().is_none());
    }

    #[test]
    fn server_reports_unknown_and_malformed_commands() {
        let mut input = Cursor::new(b"kick 10\r\n".to_vec());
        assert!(matches!(
            Command::read_from(&mut input),
            Err(ProtocolError::UnknownCommand(name)) if name == "kick"
        ));

        let mut input = Cursor::new(b"delete abc\r\n".to_vec());
        assert!(matches!(
            Command::read_from(&mut input),
            Err(ProtocolError::Malformed(_))
        ));

        let mut input = Cursor::new(b"use\r\n".to_vec());
        assert!(matches!(
            Command::read_from(&mut input),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn server_rejects_put_without_crlf_after_block() {
        let mut input = Cursor::new(b"put 1 0 1 3\r\nabcXY".to_vec());
        assert!(matches!(
            Command::read_from(&mut input),
            Err(ProtocolError::MissingCrlf)
        ));
    }
}
