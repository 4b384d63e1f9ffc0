use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Maximum bytes per input line. Longer lines without a newline are a
/// transport-level error and close the connection.
const MAX_LINE_LENGTH: usize = 4096;

use crate::engine::chat_engine::{ChatEngine, JoinOutcome};
use crate::engine::events::{ChatEvent, SessionId};

use super::formatter;

/// Read a line from the connection into `buf`, capped at MAX_LINE_LENGTH
/// bytes. Returns Ok(0) on EOF, Ok(buf.len()) once the newline arrives, Err
/// on I/O error or line too long. A line may arrive split across any number
/// of reads.
///
/// Cancel-safe under select!: `buf` is the caller-owned accumulator, bytes
/// consumed so far are already in it, and the only await point sits before
/// anything is consumed. Callers must clear `buf` only after a completed
/// line. A partial line with no terminator is dropped at EOF.
async fn read_bounded_line<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
    buf: &mut Vec<u8>,
) -> std::io::Result<usize> {
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(0); // EOF
        }

        if let Some(pos) = available.iter().position(|&b| b == b'\n') {
            buf.extend_from_slice(&available[..=pos]);
            reader.consume(pos + 1);
            return Ok(buf.len());
        }

        if buf.len() + available.len() > MAX_LINE_LENGTH {
            let discard_len = available.len();
            reader.consume(discard_len);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "input line exceeds maximum length",
            ));
        }

        // No newline yet; keep what arrived and wait for more
        let chunk_len = available.len();
        buf.extend_from_slice(available);
        reader.consume(chunk_len);
    }
}

/// Protocol state machine for one connection.
/// Clients must send a name line and then a room line before they are
/// registered with the engine; membership only exists once Active.
enum SessionState {
    /// Waiting for the first line: the display name.
    AwaitingName,
    /// Name received, waiting for the room name.
    AwaitingRoom { nickname: String },
    /// Fully registered with the chat engine.
    Active {
        session_id: SessionId,
        nickname: String,
    },
}

/// What to do with the connection after one Active-state input line.
enum LineDisposition {
    Continue,
    Exit,
}

/// Handle a single client connection from accept to close.
/// Accepts any stream implementing AsyncRead + AsyncWrite, so tests can
/// drive it over in-memory duplex pipes.
pub async fn handle_connection<S>(stream: S, peer: String, engine: Arc<ChatEngine>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    info!(%peer, "client connected");

    let (reader, writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut writer = writer;

    // Channel for outbound lines (from the input handler and the event loop)
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    // Spawn writer task; every line is newline-terminated on the wire,
    // prompts included.
    let write_handle = tokio::spawn(async move {
        while let Some(line) = out_rx.recv().await {
            let data = format!("{}\n", line);
            if writer.write_all(data.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let mut state = SessionState::AwaitingName;
    send_line(&out_tx, formatter::NAME_PROMPT);

    let mut line_buf: Vec<u8> = Vec::new();
    let mut event_rx: Option<mpsc::Receiver<ChatEvent>> = None;

    loop {
        // Once registered, also select on engine events
        if let Some(ref mut rx) = event_rx {
            tokio::select! {
                result = read_bounded_line(&mut reader, &mut line_buf) => {
                    match result {
                        Ok(0) => break, // EOF
                        Err(e) => {
                            warn!(%peer, error = %e, "connection read error");
                            break;
                        }
                        Ok(_) => {}
                    }

                    let line = String::from_utf8_lossy(&line_buf).trim().to_string();
                    line_buf.clear();

                    if let SessionState::Active { session_id, .. } = state {
                        match handle_active_line(&engine, session_id, &line) {
                            Ok(LineDisposition::Continue) => {}
                            Ok(LineDisposition::Exit) => {
                                send_line(&out_tx, formatter::FAREWELL);
                                break;
                            }
                            Err(e) => {
                                // Per-line boundary: report to this session
                                // only, state unchanged.
                                warn!(%peer, error = %e, "error processing input line");
                                send_line(&out_tx, formatter::PROCESSING_WARNING);
                            }
                        }
                    }
                }
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    send_line(&out_tx, &event_to_line(&event));
                }
            }
        } else {
            // Handshake: just read lines
            match read_bounded_line(&mut reader, &mut line_buf).await {
                Ok(0) => break,
                Err(e) => {
                    warn!(%peer, error = %e, "connection read error");
                    break;
                }
                Ok(_) => {}
            }

            let line = String::from_utf8_lossy(&line_buf).trim().to_string();
            line_buf.clear();

            state = match state {
                SessionState::AwaitingName => {
                    send_line(&out_tx, formatter::ROOM_PROMPT);
                    SessionState::AwaitingRoom { nickname: line }
                }
                SessionState::AwaitingRoom { nickname } => {
                    let JoinOutcome {
                        session_id,
                        history,
                        events,
                    } = engine.join(&nickname, &line);

                    // Replay persisted history before anything else
                    if !history.is_empty() {
                        send_line(&out_tx, formatter::HISTORY_START);
                        for entry in &history {
                            send_line(&out_tx, entry);
                        }
                        send_line(&out_tx, formatter::HISTORY_END);
                    }
                    send_line(&out_tx, &formatter::join_confirmation(&line));

                    event_rx = Some(events);
                    SessionState::Active {
                        session_id,
                        nickname,
                    }
                }
                active => active,
            };
        }
    }

    // Departure cleanup; identical for /exit, EOF, and stream errors
    if let SessionState::Active {
        session_id,
        ref nickname,
    } = state
    {
        engine.disconnect(session_id);
        info!(%peer, %nickname, "client disconnected");
    } else {
        info!(%peer, "client disconnected (unregistered)");
    }

    // Let the writer drain queued lines (the /exit farewell included)
    // before the socket drops.
    drop(out_tx);
    let _ = write_handle.await;
}

/// Dispatch one trimmed input line for a registered session.
fn handle_active_line(
    engine: &ChatEngine,
    session_id: SessionId,
    line: &str,
) -> Result<LineDisposition, String> {
    if line == "/exit" {
        return Ok(LineDisposition::Exit);
    }

    if line == "/users" {
        engine.send_active_users(session_id)?;
        return Ok(LineDisposition::Continue);
    }

    if let Some(rest) = line.strip_prefix('@') {
        // First space-delimited token is the recipient, remainder the body
        let (recipient, content) = match rest.split_once(' ') {
            Some((recipient, content)) => (recipient, content),
            None => (rest, ""),
        };
        engine.send_private(session_id, recipient, content)?;
        return Ok(LineDisposition::Continue);
    }

    engine.send_chat(session_id, line)?;
    Ok(LineDisposition::Continue)
}

/// Render an engine event to its wire line for this session.
fn event_to_line(event: &ChatEvent) -> String {
    match event {
        ChatEvent::Message { line } => line.clone(),
        ChatEvent::Joined { nickname } => formatter::joined(nickname),
        ChatEvent::Left { nickname } => formatter::left(nickname),
        ChatEvent::ActiveUsers { nicknames } => formatter::active_users(nicknames),
        ChatEvent::PrivateFrom { from, content } => formatter::private_from(from, content),
        ChatEvent::PrivateTo { to, content } => formatter::private_to(to, content),
        ChatEvent::Notice { message } => message.clone(),
    }
}

fn send_line(tx: &mpsc::UnboundedSender<String>, line: &str) {
    let _ = tx.send(line.to_string());
}
