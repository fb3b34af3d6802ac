//! Read timeouts.
//!
//! Every server read is bounded so a silent peer fails its one handler
//! instead of stalling it forever. Control frames are small and get a
//! single [`timed`] wrapper; payload transfers can legitimately take
//! arbitrarily long, so they go through [`TimedReader`], which only
//! fires when the peer stops making progress. Nothing on the success
//! path changes: a slow but steadily flowing transfer never times out.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::{sleep, Sleep};

/// Convert a config timeout value (seconds, 0 = disabled) into a duration.
pub fn read_timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Run a single control-frame read under the configured timeout, if any.
pub(crate) async fn timed<T, E, F>(limit: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: Into<anyhow::Error>,
{
    match limit {
        Some(d) => tokio::time::timeout(d, fut)
            .await
            .map_err(|_| anyhow!("peer read timed out after {d:?}"))?
            .map_err(Into::into),
        None => fut.await.map_err(Into::into),
    }
}

/// An `AsyncRead` that fails when the inner reader makes no progress for
/// the given duration. The clock resets on every completed read, so the
/// bound is on stalls, not on total transfer time.
pub struct TimedReader<R> {
    inner: R,
    limit: Option<Duration>,
    deadline: Option<Pin<Box<Sleep>>>,
}

impl<R: AsyncRead + Unpin> TimedReader<R> {
    pub fn new(inner: R, limit: Option<Duration>) -> Self {
        Self {
            inner,
            limit,
            deadline: None,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for TimedReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(result) => {
                // Progress (or a real error) resets the stall clock.
                this.deadline = None;
                Poll::Ready(result)
            }
            Poll::Pending => {
                if let Some(limit) = this.limit {
                    let deadline = this
                        .deadline
                        .get_or_insert_with(|| Box::pin(sleep(limit)));
                    if deadline.as_mut().poll(cx).is_ready() {
                        this.deadline = None;
                        return Poll::Ready(Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("peer made no progress for {limit:?}"),
                        )));
                    }
                }
                Poll::Pending
            }
        }
    }
}
