//! Per-connection quiz session.
//!
//! A session walks one client through the whole question sequence:
//! send `QUESTION:`, wait for exactly one answer line, reply `CORRECT` or
//! `INCORRECT`, and finally send `SCORE:` and close the write side.
//! There is no timeout; a silent client stalls only its own session.

use crate::protocol::{self, ServerMessage};
use crate::quiz::{Question, Score};
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, trace};

/// Size hint for the outgoing message buffer
const WRITE_BUFFER_SIZE: usize = 256;

/// Reasons a session ends before sending its score
#[derive(Debug)]
pub enum SessionError {
    /// Client closed the stream while an answer was pending
    Disconnected { answered: usize },
    /// Read or write failure on the stream
    Io(std::io::Error),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Disconnected { answered } => {
                write!(f, "Client disconnected after {} answers", answered)
            }
            SessionError::Io(e) => write!(f, "Session I/O error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Io(e) => Some(e),
            SessionError::Disconnected { .. } => None,
        }
    }
}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        SessionError::Io(e)
    }
}

/// Run the full quiz over `stream` and return the final score.
pub async fn run<S>(stream: S, questions: &[Question]) -> Result<Score, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut line = String::with_capacity(64);
    let mut buffer = BytesMut::with_capacity(WRITE_BUFFER_SIZE);
    let mut score = Score::new(questions.len());

    for (index, question) in questions.iter().enumerate() {
        let prompt = ServerMessage::Question(question.prompt.clone());
        send(&mut writer, &mut buffer, &prompt).await?;

        let answer = match protocol::read_line(&mut reader, &mut line).await? {
            Some(answer) => answer,
            None => return Err(SessionError::Disconnected { answered: index }),
        };
        trace!(question = index + 1, answer, "Received answer");

        let correct = question.is_correct(answer);
        score.record(correct);
        debug!(question = index + 1, correct, "Graded answer");

        let verdict = if correct {
            ServerMessage::Correct
        } else {
            ServerMessage::Incorrect
        };
        send(&mut writer, &mut buffer, &verdict).await?;
    }

    send(&mut writer, &mut buffer, &ServerMessage::Score(score)).await?;
    writer.shutdown().await?;

    Ok(score)
}

async fn send<W>(
    writer: &mut W,
    buffer: &mut BytesMut,
    message: &ServerMessage,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    buffer.clear();
    message.encode(buffer);
    writer.write_all(buffer).await?;
    writer.flush().await
}
