//! Prompt-delimited line codec shared by the TCP and serial transports

use crate::error::TransportError;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// ELM327 prompt; marks the end of every response
pub const PROMPT: u8 = b'>';

/// Quiet period that ends an input drain
const DRAIN_WINDOW: Duration = Duration::from_millis(50);

const READ_CHUNK: usize = 256;

/// One open adapter stream with its unread input
pub struct ElmLink<S> {
    stream: S,
    pending: Vec<u8>,
}

impl<S> ElmLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            pending: Vec::with_capacity(READ_CHUNK),
        }
    }

    /// Write `command` followed by a carriage return
    pub async fn write_command(&mut self, command: &str) -> Result<(), TransportError> {
        trace!("-> {}", command);
        self.stream.write_all(command.as_bytes()).await?;
        self.stream.write_all(b"\r").await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read until the prompt and split what came before it into lines
    pub async fn read_response(&mut self) -> Result<Vec<String>, TransportError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(pos) = self.pending.iter().position(|b| *b == PROMPT) {
                let frame: Vec<u8> = self.pending.drain(..=pos).collect();
                let lines = split_lines(&frame[..pos]);
                trace!("<- {:?}", lines);
                return Ok(lines);
            }
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(TransportError::Closed);
            }
            self.pending.extend_from_slice(&chunk[..n]);
        }
    }

    /// Discard buffered input and whatever arrives until the line goes quiet
    pub async fn drain(&mut self) -> Result<(), TransportError> {
        self.pending.clear();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match tokio::time::timeout(DRAIN_WINDOW, self.stream.read(&mut chunk)).await {
                Ok(Ok(0)) => return Err(TransportError::Closed),
                Ok(Ok(n)) => trace!("Drained {} stale bytes", n),
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Ok(()),
            }
        }
    }

    pub async fn shutdown(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}

/// Split raw response text on CR/LF, trimming padding and dropping blank lines
pub(crate) fn split_lines(raw: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(raw)
        .split(['\r', '\n'])
        .map(|line| line.trim_matches(|c: char| c.is_whitespace() || c == '\0'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines() {
        let lines = split_lines(b"\r\n7E8 06 41 00 BE 3F A8 13 \r\r\n\0SEARCHING...\r");
        assert_eq!(lines, vec!["7E8 06 41 00 BE 3F A8 13", "SEARCHING..."]);
        assert!(split_lines(b"\r\r").is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_over_duplex() {
        let (client, mut adapter) = tokio::io::duplex(256);
        let mut link = ElmLink::new(client);

        link.write_command("010C").await.unwrap();
        let mut seen = [0u8; 5];
        adapter.read_exact(&mut seen).await.unwrap();
        assert_eq!(&seen, b"010C\r");

        // response split across writes, followed by the start of the next one
        adapter.write_all(b"41 0C 1A").await.unwrap();
        adapter.write_all(b" F8\r\r>NO").await.unwrap();
        assert_eq!(link.read_response().await.unwrap(), vec!["41 0C 1A F8"]);

        adapter.write_all(b" DATA\r\r>").await.unwrap();
        assert_eq!(link.read_response().await.unwrap(), vec!["NO DATA"]);
    }

    #[tokio::test]
    async fn test_eof_is_closed() {
        let (client, adapter) = tokio::io::duplex(64);
        let mut link = ElmLink::new(client);
        drop(adapter);
        assert!(matches!(link.read_response().await, Err(TransportError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_discards_stale_input() {
        let (client, mut adapter) = tokio::io::duplex(256);
        let mut link = ElmLink::new(client);
        adapter.write_all(b"41 0D 32\r\r>").await.unwrap();
        link.drain().await.unwrap();

        adapter.write_all(b"OK\r>").await.unwrap();
        assert_eq!(link.read_response().await.unwrap(), vec!["OK"]);
    }
}
