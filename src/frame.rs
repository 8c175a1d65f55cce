//! Two-phase frame reads
//!
//! Every variable-length message is read in two steps: a fixed prefix that
//! is long enough to compute the full frame length, then exactly the
//! missing remainder. Nothing past the frame boundary is ever consumed, so
//! the next message on a shared stream stays intact.

use crate::error::Result;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

/// Read exactly `len` bytes from the stream
pub(crate) async fn read_prefix<R>(stream: &mut R, len: usize) -> Result<BytesMut>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::zeroed(len);
    stream.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Grow `buf` to `total` bytes by reading exactly the missing remainder
///
/// Does nothing when `buf` already holds `total` bytes or more.
pub(crate) async fn read_remainder<R>(
    stream: &mut R,
    buf: &mut BytesMut,
    total: usize,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let have = buf.len();
    if have >= total {
        return Ok(());
    }

    trace!("Reading {} more bytes of a {} byte frame", total - have, total);
    buf.resize(total, 0);
    stream.read_exact(&mut buf[have..]).await?;
    Ok(())
}
