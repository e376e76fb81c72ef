//! Console quiz client.
//!
//! Relays each `QUESTION:` line to the operator and sends back the typed
//! answer unchanged. Grading, trimming and case folding happen on the
//! server. The loop ends at the `SCORE:` line.

use crate::address::ServerInfo;
use crate::protocol::{self, ParseError, ServerMessage};
use crate::quiz::Score;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info};

const ANSWER_PROMPT: &str = "Answer: ";

/// Client failures; none are retried
#[derive(Debug)]
pub enum ClientError {
    /// Could not reach the server
    Connect(ServerInfo, std::io::Error),
    /// Read or write failure mid-session
    Io(std::io::Error),
    /// Server closed the connection before sending a score
    ServerClosed,
    /// Console input ended while a question was pending
    InputClosed,
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Connect(info, e) => write!(f, "Failed to connect to {}: {}", info, e),
            ClientError::Io(e) => write!(f, "Client I/O error: {}", e),
            ClientError::ServerClosed => write!(f, "Server closed the connection before the score"),
            ClientError::InputClosed => write!(f, "Console input closed before answering"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Connect(_, e) | ClientError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Io(e)
    }
}

/// Open the connection to the quiz server.
pub async fn connect(info: &ServerInfo) -> Result<TcpStream, ClientError> {
    let stream = TcpStream::connect((info.host.as_str(), info.port))
        .await
        .map_err(|e| ClientError::Connect(info.clone(), e))?;

    info!(server = %info, "Connected");
    Ok(stream)
}

/// Play one quiz over `stream`, using `console_in` and `console_out` for
/// the operator.
///
/// Returns the final score, or `None` if the server's `SCORE:` line could
/// not be parsed. Either way the session is over.
pub async fn run<S, I, O>(
    stream: S,
    console_in: I,
    mut console_out: O,
) -> Result<Option<Score>, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut console_in = BufReader::new(console_in);
    let mut line = String::with_capacity(128);
    let mut input = String::with_capacity(64);

    loop {
        let text = protocol::read_line(&mut reader, &mut line)
            .await?
            .ok_or(ClientError::ServerClosed)?;

        match ServerMessage::parse(text) {
            Ok(ServerMessage::Question(_)) => {
                display(&mut console_out, &format!("{text}\n{ANSWER_PROMPT}")).await?;

                let answer = protocol::read_line(&mut console_in, &mut input)
                    .await?
                    .ok_or(ClientError::InputClosed)?;
                debug!(answer, "Sending answer");

                writer.write_all(format!("{answer}\n").as_bytes()).await?;
                writer.flush().await?;
            }
            Ok(ServerMessage::Score(score)) => {
                display(&mut console_out, &format!("Quiz finished. {text}\n")).await?;
                return Ok(Some(score));
            }
            Err(ParseError::InvalidScore(_)) => {
                display(&mut console_out, &format!("Quiz finished. {text}\n")).await?;
                return Ok(None);
            }
            Ok(_) => {
                display(&mut console_out, &format!("Server: {text}\n")).await?;
            }
        }
    }
}

async fn display<O>(console_out: &mut O, text: &str) -> std::io::Result<()>
where
    O: AsyncWrite + Unpin,
{
    console_out.write_all(text.as_bytes()).await?;
    console_out.flush().await
}
