//! Framed transport: each message is preceded by its length as a 4-byte
//! big-endian integer.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::rpc::error::{ProtocolError, RpcError};

/// Default upper bound on a single frame.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len()).map_err(|_| ProtocolError::SizeLimit {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame, refusing frames larger than `max_bytes` before allocating.
pub async fn read_frame<R>(reader: &mut R, max_bytes: usize) -> Result<Vec<u8>, RpcError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 4];
    reader.read_exact(&mut prefix).await?;
    let len = u32::from_be_bytes(prefix) as usize;
    if len > max_bytes {
        return Err(ProtocolError::SizeLimit {
            size: len,
            max: max_bytes,
        }
        .into());
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frame_carries_length_prefix() {
        let mut out = Vec::new();
        write_frame(&mut out, b"abc").await.unwrap();
        assert_eq!(out, vec![0, 0, 0, 3, b'a', b'b', b'c']);

        let mut input = out.as_slice();
        assert_eq!(read_frame(&mut input, 16).await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn oversized_frame_is_refused() {
        let mut input: &[u8] = &[0, 0, 1, 0];
        let err = read_frame(&mut input, 255).await.unwrap_err();
        assert!(matches!(
            err,
            RpcError::Protocol(ProtocolError::SizeLimit { size: 256, max: 255 })
        ));
    }

    #[tokio::test]
    async fn short_frame_is_transport_error() {
        let mut input: &[u8] = &[0, 0, 0, 5, 1, 2];
        assert!(matches!(
            read_frame(&mut input, 16).await,
            Err(RpcError::Transport(_))
        ));
    }
}
