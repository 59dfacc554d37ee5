//! Background line reader for agent output.
//!
//! One task per process drains stdout (and stderr, when merged) into an
//! unbounded channel so the child never blocks on a full pipe while the
//! consumer is busy elsewhere.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long the reader keeps draining after the process has exited.
///
/// Grandchildren may inherit the pipe and keep it open; once the process
/// itself is gone, an idle pipe is treated as closed.
pub const DRAIN_IDLE: Duration = Duration::from_millis(200);

/// Result of a bounded wait on the line queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A line arrived, terminator stripped.
    Line(String),
    /// Nothing arrived within the wait.
    Idle,
    /// The reader finished and the queue is drained.
    Closed,
}

#[derive(Debug, Clone, Copy)]
enum StreamKind {
    Stdout,
    Stderr,
}

struct Source {
    reader: BufReader<Box<dyn AsyncRead + Unpin + Send>>,
    buf: Vec<u8>,
}

impl Source {
    fn new<R>(inner: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self {
            reader: BufReader::new(Box::new(inner)),
            buf: Vec::new(),
        }
    }

    /// Next line with its terminator stripped; `None` at EOF.
    ///
    /// Partial reads stay in `buf`, so dropping this future mid-line loses
    /// nothing.
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.reader.read_until(b'\n', &mut self.buf).await?;
        if self.buf.is_empty() {
            return Ok(None);
        }
        let line = decode_line(&self.buf);
        self.buf.clear();
        Ok(Some(line))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let lossy = String::from_utf8_lossy(bytes);
    let mut text: &str = &lossy;
    text = text.strip_suffix('\n').unwrap_or(text);
    text = text.strip_suffix('\r').unwrap_or(text);
    text.to_string()
}

async fn next_from(source: &mut Option<Source>) -> std::io::Result<Option<String>> {
    match source {
        Some(source) => source.next_line().await,
        None => std::future::pending().await,
    }
}

/// Consumer side of a process's output stream.
#[derive(Debug)]
pub struct LineStreamReader {
    rx: UnboundedReceiver<String>,
    task: JoinHandle<()>,
}

impl LineStreamReader {
    /// Spawn the reader task over `stdout` and, if given, `stderr`.
    ///
    /// The task ends at EOF on every source, when the consumer is dropped,
    /// or shortly after `exited` fires and the pipes go idle.
    pub fn spawn<O, E>(stdout: O, stderr: Option<E>, exited: CancellationToken) -> Self
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(pump(
            Some(Source::new(stdout)),
            stderr.map(Source::new),
            tx,
            exited,
        ));
        Self { rx, task }
    }

    /// Wait for the next line; `None` once the reader is done and drained.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Wait at most `wait` for the next line.
    pub async fn recv_timeout(&mut self, wait: Duration) -> Received {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(Some(line)) => Received::Line(line),
            Ok(None) => Received::Closed,
            Err(_) => Received::Idle,
        }
    }
}

impl Drop for LineStreamReader {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn pump(
    mut stdout: Option<Source>,
    mut stderr: Option<Source>,
    tx: UnboundedSender<String>,
    exited: CancellationToken,
) {
    let mut draining = false;

    while stdout.is_some() || stderr.is_some() {
        let next = async {
            tokio::select! {
                res = next_from(&mut stdout) => (StreamKind::Stdout, res),
                res = next_from(&mut stderr) => (StreamKind::Stderr, res),
            }
        };

        let (kind, result) = if draining {
            if let Ok(step) = tokio::time::timeout(DRAIN_IDLE, next).await {
                step
            } else {
                tracing::debug!("Output idle after process exit, closing reader");
                break;
            }
        } else {
            tokio::select! {
                biased;
                step = next => step,
                () = exited.cancelled() => {
                    draining = true;
                    continue;
                }
            }
        };

        match result {
            Ok(Some(line)) => {
                if tx.send(line).is_err() {
                    tracing::trace!("Line consumer dropped, stopping reader");
                    break;
                }
            }
            Ok(None) => {
                tracing::trace!(stream = ?kind, "Output stream reached EOF");
                close(&mut stdout, &mut stderr, kind);
            }
            Err(err) => {
                tracing::warn!(stream = ?kind, error = %err, "Failed to read agent output");
                close(&mut stdout, &mut stderr, kind);
            }
        }
    }
}

fn close(stdout: &mut Option<Source>, stderr: &mut Option<Source>, kind: StreamKind) {
    match kind {
        StreamKind::Stdout => *stdout = None,
        StreamKind::Stderr => *stderr = None,
    }
}
