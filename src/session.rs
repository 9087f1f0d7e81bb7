use std::io;
use std::time::Instant;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::command::{self, Command, Response};
use crate::engine::Engine;
use crate::limits::MAX_LINE_LEN;
use crate::model::*;
use crate::submission;

/// Counts for a finished session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub commands: usize,
    pub failed: usize,
}

pub async fn execute(engine: &Engine, cmd: Command) -> Response {
    match cmd {
        Command::CreateAsset { id, name } => match engine.create_asset(id, name) {
            Ok(()) => Response::with_id(id),
            Err(e) => Response::failed(e),
        },
        Command::DeleteAsset { id } => match engine.delete_asset(id).await {
            Ok(()) => Response::with_id(id),
            Err(e) => Response::failed(e),
        },
        Command::Validate(sub) => match submission::validate(engine, &sub).await {
            Ok(candidate) => Response {
                id: candidate.reservation_id,
                ..Response::ok()
            },
            Err(errors) => Response::invalid(errors.0),
        },
        Command::Submit(sub) => match submission::submit(engine, &sub).await {
            Ok(id) => Response::with_id(id),
            Err(errors) => Response::invalid(errors.0),
        },
        Command::Check {
            asset_id,
            start,
            end,
            exclude,
        } => {
            let span = match (start.to_secs(), end.to_secs()) {
                (Some(s), Some(e)) => Span::try_new(s, e),
                _ => None,
            };
            let Some(span) = span else {
                return Response::failed("invalid time range");
            };
            let conflicts = engine.find_conflicts(span, asset_id, exclude).await;
            Response {
                overlap: Some(!conflicts.is_empty()),
                conflicts: Some(conflicts),
                ..Response::ok()
            }
        }
        Command::Publish { id } => status_change(engine, id, ReservationStatus::Published).await,
        Command::Unpublish { id } => {
            status_change(engine, id, ReservationStatus::Unpublished).await
        }
        Command::Delete { id } => match engine.delete_reservation(id).await {
            Ok(_) => Response::with_id(id),
            Err(e) => Response::failed(e),
        },
        Command::List { asset_id } => match engine.list_reservations(asset_id).await {
            Ok(reservations) => Response {
                reservations: Some(reservations),
                ..Response::ok()
            },
            Err(e) => Response::failed(e),
        },
        Command::ListAssets => Response {
            assets: Some(engine.list_assets().await),
            ..Response::ok()
        },
    }
}

async fn status_change(engine: &Engine, id: ulid::Ulid, status: ReservationStatus) -> Response {
    match engine.set_status(id, status).await {
        Ok(_) => Response::with_id(id),
        Err(crate::engine::EngineError::Overlap { span, .. }) => {
            Response::failed(format!(
                "asset already reserved from {} to {}",
                submission::format_secs(span.start),
                submission::format_secs(span.end)
            ))
        }
        Err(e) => Response::failed(e),
    }
}

enum LineRead {
    Eof,
    Line,
    TooLong,
}

/// Read one `\n`-terminated line into `buf` as raw bytes, buffering at most
/// `MAX_LINE_LEN` of them. A longer line is consumed through its newline and
/// reported as `TooLong` with `buf` left empty.
async fn read_bounded_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let mut read_any = false;
    let mut too_long = false;

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            break;
        }
        read_any = true;
        let (used, done) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (i + 1, true),
            None => (available.len(), false),
        };
        if !too_long {
            let content = &available[..used - usize::from(done)];
            if buf.len() + content.len() > MAX_LINE_LEN {
                too_long = true;
                buf.clear();
            } else {
                buf.extend_from_slice(content);
            }
        }
        reader.consume(used);
        if done {
            break;
        }
    }

    Ok(match (read_any, too_long) {
        (false, _) => LineRead::Eof,
        (true, true) => LineRead::TooLong,
        (true, false) => LineRead::Line,
    })
}

/// Serve newline-delimited JSON commands until EOF, writing one response
/// line per non-blank request line. Malformed lines get an error response
/// and the session continues, including lines that are not UTF-8 or are
/// longer than `MAX_LINE_LEN`.
pub async fn process_stream<R, W>(engine: &Engine, mut reader: R, mut writer: W) -> io::Result<SessionStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stats = SessionStats::default();
    let mut buf = Vec::new();

    loop {
        let parsed = match read_bounded_line(&mut reader, &mut buf).await? {
            LineRead::Eof => break,
            LineRead::TooLong => Err(format!("command exceeds {MAX_LINE_LEN} bytes")),
            LineRead::Line => match std::str::from_utf8(&buf) {
                Ok(text) => {
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    command::parse(trimmed)
                }
                Err(_) => Err("command is not valid UTF-8".to_string()),
            },
        };

        let started = Instant::now();
        let (label, response) = match parsed {
            Ok(cmd) => {
                let label = crate::observability::command_label(&cmd);
                (label, execute(engine, cmd).await)
            }
            Err(e) => {
                warn!("rejected command: {e}");
                ("invalid", Response::failed(e))
            }
        };
        let status = if response.ok { "ok" } else { "error" };
        metrics::counter!(crate::observability::COMMANDS_TOTAL, "op" => label, "status" => status)
            .increment(1);
        metrics::histogram!(crate::observability::COMMAND_DURATION_SECONDS, "op" => label)
            .record(started.elapsed().as_secs_f64());

        stats.commands += 1;
        if !response.ok {
            stats.failed += 1;
            debug!("{label} failed: {response:?}");
        }

        let mut out = serde_json::to_vec(&response).map_err(io::Error::other)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
    }

    Ok(stats)
}
