//! TCP server for quiz sessions.
//!
//! Accepts connections forever and runs one independent session task per
//! connection. Sessions share nothing but the read-only question bank.

use crate::quiz::QuestionBank;
use crate::session::{self, SessionError};
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Listen backlog for the quiz socket
const LISTEN_BACKLOG: i32 = 1024;

/// Server instance
pub struct Server {
    listener: TcpListener,
    questions: QuestionBank,
}

impl Server {
    /// Bind the listening socket.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(addr: SocketAddr, questions: QuestionBank) -> io::Result<Self> {
        let listener = TcpListener::from_std(create_listener(addr)?)?;

        Ok(Server {
            listener,
            questions,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the process exits.
    pub async fn run(self) -> io::Result<()> {
        info!(
            address = %self.local_addr()?,
            questions = self.questions.len(),
            "Server listening"
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    info!(%peer, "Client connected");

                    let questions = QuestionBank::clone(&self.questions);
                    tokio::spawn(async move {
                        match session::run(stream, &questions).await {
                            Ok(score) => info!(%peer, %score, "Session finished"),
                            Err(e @ SessionError::Disconnected { .. }) => {
                                debug!(%peer, error = %e, "Session aborted")
                            }
                            Err(e) => warn!(%peer, error = %e, "Session aborted"),
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

/// Create a non-blocking TCP listener with SO_REUSEADDR.
fn create_listener(addr: SocketAddr) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{self, ServerMessage};
    use crate::quiz::{default_questions, Score};
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, BufReader};
    use tokio::net::TcpStream;

    async fn start_server() -> SocketAddr {
        let questions: QuestionBank = default_questions().into();
        let server = Server::bind("127.0.0.1:0".parse().unwrap(), questions).unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        addr
    }

    /// Answer every question from `answers`, optionally pausing before each
    /// answer, and collect every line the server sends.
    async fn play(addr: SocketAddr, answers: &[&str], delay: Duration) -> Vec<ServerMessage> {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        let mut answers = answers.iter();
        let mut received = Vec::new();

        while let Some(text) = protocol::read_line(&mut reader, &mut line).await.unwrap() {
            let message = ServerMessage::parse(text).unwrap();
            if matches!(message, ServerMessage::Question(_)) {
                tokio::time::sleep(delay).await;
                let answer = answers.next().unwrap();
                writer.write_all(format!("{answer}\n").as_bytes()).await.unwrap();
            }
            received.push(message);
        }

        received
    }

    fn verdicts(messages: &[ServerMessage]) -> Vec<&ServerMessage> {
        messages
            .iter()
            .filter(|m| matches!(m, ServerMessage::Correct | ServerMessage::Incorrect))
            .collect()
    }

    #[tokio::test]
    async fn test_full_quiz_over_tcp() {
        let addr = start_server().await;
        let received = play(
            addr,
            &["Seoul", "Canberra", "819", " -1 ", "BLUE"],
            Duration::ZERO,
        )
        .await;

        assert_eq!(received.len(), 11);
        assert_eq!(
            received.last(),
            Some(&ServerMessage::Score(Score { earned: 100, max: 100 }))
        );
        assert!(verdicts(&received).iter().all(|m| **m == ServerMessage::Correct));
    }

    #[tokio::test]
    async fn test_wrong_answer_feedback_sequence() {
        let addr = start_server().await;
        let received = play(
            addr,
            &["Paris", "Canberra", "819", "-1", "Blue"],
            Duration::ZERO,
        )
        .await;

        assert_eq!(
            verdicts(&received),
            [
                &ServerMessage::Incorrect,
                &ServerMessage::Correct,
                &ServerMessage::Correct,
                &ServerMessage::Correct,
                &ServerMessage::Correct,
            ]
        );
        assert_eq!(
            received.last(),
            Some(&ServerMessage::Score(Score { earned: 80, max: 100 }))
        );
    }

    #[tokio::test]
    async fn test_concurrent_sessions_are_independent() {
        let addr = start_server().await;

        let slow = tokio::spawn(async move {
            play(
                addr,
                &["wrong", "wrong", "819", "-1", "Blue"],
                Duration::from_millis(50),
            )
            .await
        });
        let fast = tokio::spawn(async move {
            play(
                addr,
                &["Seoul", "Canberra", "819", "-1", "Blue"],
                Duration::ZERO,
            )
            .await
        });

        let fast = fast.await.unwrap();
        let slow = slow.await.unwrap();

        assert_eq!(
            fast.last(),
            Some(&ServerMessage::Score(Score { earned: 100, max: 100 }))
        );
        assert_eq!(
            slow.last(),
            Some(&ServerMessage::Score(Score { earned: 60, max: 100 }))
        );
    }

    #[tokio::test]
    async fn test_disconnect_does_not_affect_other_sessions() {
        let addr = start_server().await;

        {
            let stream = TcpStream::connect(addr).await.unwrap();
            let (reader, mut writer) = stream.into_split();
            let mut reader = BufReader::new(reader);
            let mut line = String::new();

            protocol::read_line(&mut reader, &mut line).await.unwrap();
            writer.write_all(b"Seoul\n").await.unwrap();
            protocol::read_line(&mut reader, &mut line).await.unwrap();
            // Both halves dropped here, mid-quiz.
        }

        let received = play(
            addr,
            &["Seoul", "Canberra", "819", "-1", "Blue"],
            Duration::ZERO,
        )
        .await;
        assert_eq!(
            received.last(),
            Some(&ServerMessage::Score(Score { earned: 100, max: 100 }))
        );
    }

    #[tokio::test]
    async fn test_bind_conflict_is_an_error() {
        let addr = start_server().await;

        let result = Server::bind(addr, default_questions().into());
        assert!(result.is_err());
    }
}
