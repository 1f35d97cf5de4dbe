// framing.rs
//
// Delimiter-terminated framing shared by the TCP client and server (spec
// §4.4). A frame is whatever bytes precede the delimiter; the delimiter
// itself is never handed to the dispatcher or decoder.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::Result;

pub const DEFAULT_DELIMITER: &str = "\r\n";
pub const DEFAULT_MAX_FRAME_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FramingOptions {
    pub delimiter: Vec<u8>,
    pub max_read_bytes: usize,
}

impl Default for FramingOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.as_bytes().to_vec(),
            max_read_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// Write `body` followed by the delimiter.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    options: &FramingOptions,
    body: &[u8],
) -> Result<()> {
    writer.write_all(body).await?;
    writer.write_all(&options.delimiter).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one delimiter-terminated frame, returning the body without the
/// delimiter. Each underlying `read` call is capped at `max_read_bytes`;
/// the accumulated frame itself has no cap beyond available memory, per
/// spec §4.4. Returns `Ok(None)` on a clean EOF with nothing read yet.
pub async fn read_frame<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    options: &FramingOptions,
) -> Result<Option<Vec<u8>>> {
    let mut accumulated = Vec::new();
    let mut chunk = vec![0u8; options.max_read_bytes];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            if accumulated.is_empty() {
                return Ok(None);
            }
            break;
        }
        accumulated.extend_from_slice(&chunk[..n]);
        if accumulated.ends_with(&options.delimiter) {
            break;
        }
    }
    let body_len = accumulated.len().saturating_sub(options.delimiter.len());
    accumulated.truncate(body_len);
    Ok(Some(accumulated))
}

#[cfg(test)]
mod framing_tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn writes_and_reads_one_frame() {
        let options = FramingOptions::default();
        let (mut client, mut server) = duplex(4096);
        write_frame(&mut client, &options, b"hello").await.unwrap();
        let body = read_frame(&mut server, &options).await.unwrap().unwrap();
        assert_eq!(body, b"hello");
    }

    #[tokio::test]
    async fn custom_delimiter_round_trips() {
        let options = FramingOptions {
            delimiter: b"||".to_vec(),
            ..Default::default()
        };
        let (mut client, mut server) = duplex(4096);
        write_frame(&mut client, &options, b"payload").await.unwrap();
        let body = read_frame(&mut server, &options).await.unwrap().unwrap();
        assert_eq!(body, b"payload");
    }

    #[tokio::test]
    async fn clean_eof_with_nothing_read_is_none() {
        let options = FramingOptions::default();
        let (client, mut server) = duplex(4096);
        drop(client);
        let body = read_frame(&mut server, &options).await.unwrap();
        assert!(body.is_none());
    }
}
