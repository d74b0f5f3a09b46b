//! Newline-delimited reads with an upper bound on line length.

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Default longest line accepted from a client, terminator included.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Result of reading one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRead {
    /// A complete line, terminator included, is in the buffer.
    Line,
    /// The peer closed the stream between lines.
    Eof,
    /// The peer closed the stream after `n` bytes of an unterminated line.
    Partial(usize),
    /// `max` bytes arrived without a terminator.
    TooLong,
}

/// Read one `\n`-terminated line into `buf`, which is cleared first.
///
/// At most `max` bytes are consumed from `reader`.
pub async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>, max: usize) -> io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();

    let n = (&mut *reader).take(max as u64).read_until(b'\n', buf).await?;
    Ok(match n {
        0 => LineRead::Eof,
        _ if buf.last() == Some(&b'\n') => LineRead::Line,
        _ if n >= max => LineRead::TooLong,
        _ => LineRead::Partial(n),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_lines_then_eof() {
        let mut reader = BufReader::new(&b"one\ntwo\n"[..]);
        let mut buf = Vec::new();

        assert_eq!(read_line(&mut reader, &mut buf, 16).await.unwrap(), LineRead::Line);
        assert_eq!(buf, b"one\n");
        assert_eq!(read_line(&mut reader, &mut buf, 16).await.unwrap(), LineRead::Line);
        assert_eq!(buf, b"two\n");
        assert_eq!(read_line(&mut reader, &mut buf, 16).await.unwrap(), LineRead::Eof);
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_partial_line() {
        let mut reader = BufReader::new(&b"done\nhalf"[..]);
        let mut buf = Vec::new();

        read_line(&mut reader, &mut buf, 16).await.unwrap();
        assert_eq!(
            read_line(&mut reader, &mut buf, 16).await.unwrap(),
            LineRead::Partial(4)
        );
    }

    #[tokio::test]
    async fn test_line_at_limit_accepted() {
        let mut reader = BufReader::new(&b"abc\n"[..]);
        let mut buf = Vec::new();

        assert_eq!(read_line(&mut reader, &mut buf, 4).await.unwrap(), LineRead::Line);
    }

    #[tokio::test]
    async fn test_line_over_limit() {
        let mut reader = BufReader::new(&b"abcdefgh\n"[..]);
        let mut buf = Vec::new();

        assert_eq!(read_line(&mut reader, &mut buf, 4).await.unwrap(), LineRead::TooLong);
        assert_eq!(buf, b"abcd");
    }
}
