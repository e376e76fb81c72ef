//! Quiz wire protocol.
//!
//! Newline-delimited text over a single TCP stream. The server sends:
//! - `QUESTION: <text>` - next prompt, the client must answer with one line
//! - `CORRECT` / `INCORRECT` - grading of the previous answer
//! - `SCORE: <n>/<max>` - final message, the connection closes afterwards
//!
//! The client sends exactly one free-text line per question.

use crate::quiz::Score;
use bytes::BytesMut;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const QUESTION_PREFIX: &str = "QUESTION:";
pub const SCORE_PREFIX: &str = "SCORE:";
pub const CORRECT: &str = "CORRECT";
pub const INCORRECT: &str = "INCORRECT";

/// A line sent from server to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Next quiz prompt
    Question(String),
    /// Previous answer matched
    Correct,
    /// Previous answer did not match
    Incorrect,
    /// Final score, terminal
    Score(Score),
    /// Any other line
    Other(String),
}

/// Protocol parsing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A `SCORE:` line whose body is not `<n>/<max>`
    InvalidScore(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::InvalidScore(body) => write!(f, "Invalid score: {}", body),
        }
    }
}

impl std::error::Error for ParseError {}

impl ServerMessage {
    /// Append the wire form of this message, including the line terminator.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            ServerMessage::Question(text) => {
                buf.extend_from_slice(QUESTION_PREFIX.as_bytes());
                buf.extend_from_slice(b" ");
                buf.extend_from_slice(text.as_bytes());
            }
            ServerMessage::Correct => buf.extend_from_slice(CORRECT.as_bytes()),
            ServerMessage::Incorrect => buf.extend_from_slice(INCORRECT.as_bytes()),
            ServerMessage::Score(score) => {
                buf.extend_from_slice(format!("{SCORE_PREFIX} {score}").as_bytes());
            }
            ServerMessage::Other(text) => buf.extend_from_slice(text.as_bytes()),
        }
        buf.extend_from_slice(b"\n");
    }

    /// Classify a received line (without its terminator).
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        if let Some(rest) = line.strip_prefix(QUESTION_PREFIX) {
            let text = rest.strip_prefix(' ').unwrap_or(rest);
            return Ok(ServerMessage::Question(text.to_string()));
        }

        if let Some(rest) = line.strip_prefix(SCORE_PREFIX) {
            return parse_score(rest.trim()).map(ServerMessage::Score);
        }

        Ok(match line {
            CORRECT => ServerMessage::Correct,
            INCORRECT => ServerMessage::Incorrect,
            other => ServerMessage::Other(other.to_string()),
        })
    }
}

fn parse_score(body: &str) -> Result<Score, ParseError> {
    let invalid = || ParseError::InvalidScore(body.to_string());

    let (earned, max) = body.split_once('/').ok_or_else(invalid)?;
    let earned = earned.trim().parse().map_err(|_| invalid())?;
    let max = max.trim().parse().map_err(|_| invalid())?;

    Ok(Score { earned, max })
}

/// Read one line into `buf`, stripping `\n` or `\r\n`.
///
/// Bytes that are not valid UTF-8 are replaced with U+FFFD rather than
/// failing the read. Returns `Ok(None)` at end of stream.
pub async fn read_line<'a, R>(
    reader: &mut R,
    buf: &'a mut String,
) -> std::io::Result<Option<&'a str>>
where
    R: AsyncBufRead + Unpin,
{
    let mut bytes = std::mem::take(buf).into_bytes();
    bytes.clear();

    let n = reader.read_until(b'\n', &mut bytes).await?;
    *buf = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    };
    if n == 0 {
        return Ok(None);
    }

    let line: &'a str = buf.as_str();
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    Ok(Some(line))
}
