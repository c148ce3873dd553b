//! Length-prefixed frame codec.
//!
//! Every payload on an established channel is framed as a 4-byte
//! big-endian length followed by exactly that many payload bytes. No
//! checksums, no compression. Zero-length frames are valid payloads:
//! shutdown is signalled out of band, so the empty frame carries no
//! special meaning on the wire.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum payload size accepted on both encode and decode.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024; // 16 MiB

/// Write one frame: the big-endian length prefix, then the payload.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("payload too large: {} > {MAX_MESSAGE_SIZE}", payload.len()),
        ));
    }
    let len_bytes = (payload.len() as u32).to_be_bytes();
    writer.write_all(&len_bytes).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame, returning its payload.
///
/// Both the prefix and the payload are read to completion; a peer that
/// closes the connection mid-frame yields `UnexpectedEof`.
pub async fn read_frame<R>(reader: &mut R) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame too large: {len} > {MAX_MESSAGE_SIZE}"),
        ));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn frames_arrive_in_order() {
        let (mut tx, mut rx) = tokio::io::duplex(1024);

        write_frame(&mut tx, b"first").await.unwrap();
        write_frame(&mut tx, b"second").await.unwrap();

        assert_eq!(read_frame(&mut rx).await.unwrap(), b"first");
        assert_eq!(read_frame(&mut rx).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn zero_length_frame_is_valid() {
        let (mut tx, mut rx) = tokio::io::duplex(64);

        write_frame(&mut tx, b"").await.unwrap();
        assert_eq!(read_frame(&mut rx).await.unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn oversized_payload_rejected_on_write() {
        let (mut tx, _rx) = tokio::io::duplex(64);

        let payload = vec![0u8; MAX_MESSAGE_SIZE + 1];
        let err = write_frame(&mut tx, &payload).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn oversized_length_prefix_rejected_on_read() {
        let (mut tx, mut rx) = tokio::io::duplex(64);

        let bogus = ((MAX_MESSAGE_SIZE + 1) as u32).to_be_bytes();
        tx.write_all(&bogus).await.unwrap();

        let err = read_frame(&mut rx).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn truncated_frame_reports_eof() {
        let (mut tx, mut rx) = tokio::io::duplex(64);

        tx.write_all(&8u32.to_be_bytes()).await.unwrap();
        tx.write_all(b"half").await.unwrap();
        drop(tx);

        let err = read_frame(&mut rx).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
