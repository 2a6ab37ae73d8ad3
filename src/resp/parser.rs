//! Reply Parser: consumes bytes from a connection and incrementally yields
//! RESP reply values.
//!
//! The parser never blocks: [`ReplyParser::feed`] appends bytes it owns, and
//! [`ReplyParser::next_reply`] returns `Ok(None)` whenever the buffered bytes
//! do not yet contain a complete reply. A malformed reply is fatal to the
//! connection (the caller is expected to destroy the client on `Err`).

use std::fmt;

/// A single parsed RESP reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Status(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
    Array(Option<Vec<Reply>>),
}

impl Reply {
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

#[derive(Debug)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RESP parse error: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

/// Owns a growable byte buffer and yields one reply at a time from its front.
#[derive(Default)]
pub struct ReplyParser {
    buf: Vec<u8>,
    cursor: usize,
}

impl ReplyParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends freshly-read bytes to the parser's buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Attempts to parse and remove exactly one reply from the front of the
    /// buffer. Returns `Ok(None)` if the buffer does not yet hold a complete
    /// reply.
    pub fn next_reply(&mut self) -> Result<Option<Reply>, ParseError> {
        self.cursor = 0;
        match self.parse_value()? {
            Some(reply) => {
                self.buf.drain(0..self.cursor);
                Ok(Some(reply))
            }
            None => Ok(None),
        }
    }

    fn find_crlf(&self, from: usize) -> Option<usize> {
        self.buf[from..]
            .windows(2)
            .position(|w| w == b"\r\n")
            .map(|p| from + p)
    }

    fn read_line(&mut self) -> Result<Option<(usize, usize)>, ParseError> {
        match self.find_crlf(self.cursor) {
            Some(end) => {
                let start = self.cursor;
                self.cursor = end + 2;
                Ok(Some((start, end)))
            }
            None => Ok(None),
        }
    }

    fn parse_value(&mut self) -> Result<Option<Reply>, ParseError> {
        if self.cursor >= self.buf.len() {
            return Ok(None);
        }
        let kind = self.buf[self.cursor];
        let save = self.cursor;
        self.cursor += 1;

        let result = match kind {
            b'+' => self.parse_line_string().map(|o| o.map(Reply::Status)),
            b'-' => self.parse_line_string().map(|o| o.map(Reply::Error)),
            b':' => self.parse_integer().map(|o| o.map(Reply::Integer)),
            b'$' => self.parse_bulk(),
            b'*' => self.parse_array(),
            other => Err(ParseError(format!("unknown reply type byte {:?}", other as char))),
        };

        if matches!(result, Ok(None)) {
            self.cursor = save;
        }
        result
    }

    fn parse_line_string(&mut self) -> Result<Option<String>, ParseError> {
        match self.read_line()? {
            Some((start, end)) => String::from_utf8(self.buf[start..end].to_vec())
                .map(Some)
                .map_err(|e| ParseError(e.to_string())),
            None => Ok(None),
        }
    }

    fn parse_integer(&mut self) -> Result<Option<i64>, ParseError> {
        match self.read_line()? {
            Some((start, end)) => std::str::from_utf8(&self.buf[start..end])
                .map_err(|e| ParseError(e.to_string()))?
                .parse::<i64>()
                .map(Some)
                .map_err(|e| ParseError(e.to_string())),
            None => Ok(None),
        }
    }

    fn parse_bulk(&mut self) -> Result<Option<Reply>, ParseError> {
        let len = match self.parse_integer()? {
            Some(n) => n,
            None => return Ok(None),
        };
        if len < 0 {
            return Ok(Some(Reply::Bulk(None)));
        }
        let len = len as usize;
        let start = self.cursor;
        if self.buf.len() < start + len + 2 {
            return Ok(None);
        }
        let data = self.buf[start..start + len].to_vec();
        self.cursor = start + len + 2;
        Ok(Some(Reply::Bulk(Some(data))))
    }

    fn parse_array(&mut self) -> Result<Option<Reply>, ParseError> {
        let count = match self.parse_integer()? {
            Some(n) => n,
            None => return Ok(None),
        };
        if count < 0 {
            return Ok(Some(Reply::Array(None)));
        }
        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            match self.parse_value()? {
                Some(v) => items.push(v),
                None => return Ok(None),
            }
        }
        Ok(Some(Reply::Array(Some(items))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_status_reply() {
        let mut p = ReplyParser::new();
        p.feed(b"+OK\r\n");
        assert_eq!(p.next_reply().unwrap(), Some(Reply::Status("OK".into())));
    }

    #[test]
    fn parses_error_reply() {
        let mut p = ReplyParser::new();
        p.feed(b"-ERR wrong type\r\n");
        assert_eq!(
            p.next_reply().unwrap(),
            Some(Reply::Error("ERR wrong type".into()))
        );
    }

    #[test]
    fn parses_integer_reply() {
        let mut p = ReplyParser::new();
        p.feed(b":1000\r\n");
        assert_eq!(p.next_reply().unwrap(), Some(Reply::Integer(1000)));
    }

    #[test]
    fn parses_bulk_and_nil_bulk() {
        let mut p = ReplyParser::new();
        p.feed(b"$3\r\nfoo\r\n$-1\r\n");
        assert_eq!(
            p.next_reply().unwrap(),
            Some(Reply::Bulk(Some(b"foo".to_vec())))
        );
        assert_eq!(p.next_reply().unwrap(), Some(Reply::Bulk(None)));
    }

    #[test]
    fn parses_nested_array() {
        let mut p = ReplyParser::new();
        p.feed(b"*2\r\n$3\r\nfoo\r\n:1\r\n");
        assert_eq!(
            p.next_reply().unwrap(),
            Some(Reply::Array(Some(vec![
                Reply::Bulk(Some(b"foo".to_vec())),
                Reply::Integer(1),
            ])))
        );
    }

    #[test]
    fn incomplete_reply_yields_none_without_consuming() {
        let mut p = ReplyParser::new();
        p.feed(b"$5\r\nfo");
        assert_eq!(p.next_reply().unwrap(), None);
        p.feed(b"o\r\n");
        assert_eq!(
            p.next_reply().unwrap(),
            Some(Reply::Bulk(Some(b"foo".to_vec())))
        );
    }

    #[test]
    fn drains_multiple_replies_sequentially() {
        let mut p = ReplyParser::new();
        p.feed(b"+OK\r\n+OK\r\n+OK\r\n");
        for _ in 0..3 {
            assert_eq!(p.next_reply().unwrap(), Some(Reply::Status("OK".into())));
        }
        assert_eq!(p.next_reply().unwrap(), None);
    }

    #[test]
    fn unknown_type_byte_is_a_parse_error() {
        let mut p = ReplyParser::new();
        p.feed(b"!nope\r\n");
        assert!(p.next_reply().is_err());
    }

    #[test]
    fn wire_frame_round_trips_through_the_parser() {
        use crate::resp::frame::format_argv;
        // Not a real reply, but confirms that multi-bulk framing and the
        // array branch of the parser agree on structure.
        let frame = format_argv(&[b"SET", b"foo", b"bar"]);
        let mut p = ReplyParser::new();
        p.feed(&frame);
        let reply = p.next_reply().unwrap().unwrap();
        match reply {
            Reply::Array(Some(items)) => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[0], Reply::Bulk(Some(b"SET".to_vec())));
                assert_eq!(items[2], Reply::Bulk(Some(b"bar".to_vec())));
            }
            other => panic!("expected array, got {:?}", other),
        }
    }
}
