// Text collaborators: whitespace-separated integers in, space-joined out.
//
// Tokens that do not parse as a `u64` are skipped and counted; they never
// reach the codec.

use std::io::{self, BufRead, Write};

/// Longest token kept for parsing. Anything longer is skipped whole.
pub const MAX_TOKEN_LEN: usize = 64;

/// Parse one token as a non-negative decimal integer.
///
/// Accepts an optional leading `+`, and a negative zero (`-0`, `-00`) as 0.
/// Other negative numbers, non-numeric tokens and values above `u64::MAX`
/// are rejected.
#[inline]
pub fn parse_token(token: &str) -> Option<u64> {
    match token.strip_prefix('-') {
        Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b == b'0') => Some(0),
        Some(_) => None,
        None => token.parse::<u64>().ok(),
    }
}

// ---------------------------------------------------------------------------
// Token reader
// ---------------------------------------------------------------------------

/// Iterator over the integers of a text stream.
///
/// Tokens are split on ASCII whitespace straight out of the reader's buffer,
/// so memory stays bounded by the buffer plus one token no matter how long a
/// line is. A read failure ends the iteration and is returned by
/// `take_error()`.
pub struct Tokens<R: BufRead> {
    reader: R,
    token: Vec<u8>,
    overlong: bool,
    skipped: u64,
    bytes_read: u64,
    error: Option<io::Error>,
}

impl<R: BufRead> Tokens<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            token: Vec::with_capacity(MAX_TOKEN_LEN),
            overlong: false,
            skipped: 0,
            bytes_read: 0,
            error: None,
        }
    }

    /// Tokens discarded because they did not parse.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Bytes consumed from the reader so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Take the read error that stopped the iteration, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    /// Collect the next token into `self.token`, carrying partial tokens
    /// across buffer refills. Returns false at end of input or on error.
    fn read_token(&mut self) -> bool {
        self.token.clear();
        self.overlong = false;
        loop {
            let buf = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.error = Some(e);
                    return false;
                }
            };
            if buf.is_empty() {
                return !self.token.is_empty() || self.overlong;
            }

            let mut used = 0;
            let mut complete = false;
            for &b in buf {
                used += 1;
                if b.is_ascii_whitespace() {
                    if !self.token.is_empty() || self.overlong {
                        complete = true;
                        break;
                    }
                } else if self.token.len() < MAX_TOKEN_LEN {
                    self.token.push(b);
                } else {
                    self.overlong = true;
                }
            }
            self.reader.consume(used);
            self.bytes_read += used as u64;
            if complete {
                return true;
            }
        }
    }
}

impl<R: BufRead> Iterator for Tokens<R> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        while self.error.is_none() && self.read_token() {
            let parsed = if self.overlong {
                None
            } else {
                std::str::from_utf8(&self.token).ok().and_then(parse_token)
            };
            match parsed {
                Some(n) => return Some(n),
                None => {
                    log::trace!(
                        "skipping token {:?}",
                        String::from_utf8_lossy(&self.token)
                    );
                    self.skipped += 1;
                }
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Joined writer
// ---------------------------------------------------------------------------

/// Writes integers separated by a single space, with no trailing separator.
pub struct JoinWriter<W: Write> {
    writer: W,
    count: u64,
    bytes_written: u64,
}

impl<W: Write> JoinWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            count: 0,
            bytes_written: 0,
        }
    }

    pub fn write_value(&mut self, n: u64) -> io::Result<()> {
        let text = if self.count == 0 {
            n.to_string()
        } else {
            format!(" {n}")
        };
        self.writer.write_all(text.as_bytes())?;
        self.count += 1;
        self.bytes_written += text.len() as u64;
        Ok(())
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush and return the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Join integers with single spaces.
pub fn join(values: &[u64]) -> String {
    values
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    #[test]
    fn parse_accepts_plain_and_plus() {
        assert_eq!(parse_token("0"), Some(0));
        assert_eq!(parse_token("+42"), Some(42));
        assert_eq!(parse_token("18446744073709551615"), Some(u64::MAX));
    }

    #[test]
    fn parse_accepts_negative_zero() {
        assert_eq!(parse_token("-0"), Some(0));
        assert_eq!(parse_token("-00"), Some(0));
        assert_eq!(parse_token("-"), None);
        assert_eq!(parse_token("-01"), None);
        assert_eq!(parse_token("-+0"), None);
    }

    #[test]
    fn parse_rejects_junk() {
        assert_eq!(parse_token("-3"), None);
        assert_eq!(parse_token("abc"), None);
        assert_eq!(parse_token("1.5"), None);
        assert_eq!(parse_token("18446744073709551616"), None);
        assert_eq!(parse_token(""), None);
    }

    #[test]
    fn tokens_split_on_whitespace() {
        let input = "1 2\t3\n\n  4   x 5\r\n-6 7";
        let mut tokens = Tokens::new(input.as_bytes());
        let values: Vec<u64> = tokens.by_ref().collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5, 7]);
        assert_eq!(tokens.skipped(), 2);
        assert_eq!(tokens.bytes_read(), input.len() as u64);
        assert!(tokens.take_error().is_none());
    }

    #[test]
    fn tokens_empty_input() {
        let mut tokens = Tokens::new("".as_bytes());
        assert_eq!(tokens.next(), None);
        assert_eq!(tokens.skipped(), 0);
    }

    #[test]
    fn tokens_invalid_utf8_is_skipped() {
        let input: &[u8] = b"1 2\n\xff\xfe 3\n";
        let mut tokens = Tokens::new(input);
        let values: Vec<u64> = tokens.by_ref().collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(tokens.skipped(), 1);
        assert!(tokens.take_error().is_none());
    }

    #[test]
    fn tokens_span_buffer_refills() {
        let input = "123456789 18446744073709551615 42";
        let reader = BufReader::with_capacity(4, input.as_bytes());
        let values: Vec<u64> = Tokens::new(reader).collect();
        assert_eq!(values, vec![123456789, u64::MAX, 42]);
    }

    #[test]
    fn single_line_input_is_read_incrementally() {
        let line = vec!["12345"; 200_000].join(" ");
        let reader = BufReader::with_capacity(64, line.as_bytes());
        let mut tokens = Tokens::new(reader);

        assert_eq!(tokens.next(), Some(12345));
        assert!(tokens.bytes_read() <= 64, "read {}", tokens.bytes_read());
        assert_eq!(tokens.next(), Some(12345));
        assert!(tokens.bytes_read() <= 128, "read {}", tokens.bytes_read());

        assert_eq!(tokens.count(), 199_998);
    }

    #[test]
    fn overlong_tokens_are_skipped() {
        let long = "7".repeat(MAX_TOKEN_LEN + 10);
        let input = format!("1 {long} 2");
        let mut tokens = Tokens::new(input.as_bytes());
        let values: Vec<u64> = tokens.by_ref().collect();
        assert_eq!(values, vec![1, 2]);
        assert_eq!(tokens.skipped(), 1);
        assert_eq!(tokens.bytes_read(), input.len() as u64);
    }

    #[test]
    fn tokens_report_read_errors() {
        struct Failing;
        impl io::Read for Failing {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("disk gone"))
            }
        }
        let mut tokens = Tokens::new(BufReader::new(Failing));
        assert_eq!(tokens.next(), None);
        assert!(tokens.take_error().is_some());
    }

    #[test]
    fn join_writer_spacing() {
        let mut w = JoinWriter::new(Vec::new());
        for n in [0, 1, 2, 4, 100] {
            w.write_value(n).unwrap();
        }
        assert_eq!(w.count(), 5);
        assert_eq!(w.bytes_written(), 11);
        let out = w.finish().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0 1 2 4 100");
    }

    #[test]
    fn join_helper() {
        assert_eq!(join(&[]), "");
        assert_eq!(join(&[7]), "7");
        assert_eq!(join(&[7, 8]), "7 8");
    }
}
