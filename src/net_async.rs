//! Async (Tokio) transport for sendtree.
//!
//! Every file gets its own TCP connection: connect, write the frame header,
//! stream the body, half-close. Nothing is retried.

pub mod client {
    use crate::config::NameMode;
    use crate::error::{UploadError, UploadResult};
    use crate::fs_enum::TransferTarget;
    use crate::protocol_core::{wire_name, FrameCodec};
    use std::io;
    use std::path::PathBuf;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    pub async fn connect(addr: &str) -> UploadResult<TcpStream> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| UploadError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        let _ = stream.set_nodelay(true);
        Ok(stream)
    }

    /// What one completed transfer put on the wire
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentFile {
        pub path: PathBuf,
        pub name: String,
        pub bytes: u64,
    }

    /// Send one file over a fresh connection.
    ///
    /// The connection and the file handle are dropped on every return path;
    /// a clean return means the body was fully written and the write side
    /// was shut down.
    pub async fn send_file(
        target: &TransferTarget,
        addr: &str,
        codec: &dyn FrameCodec,
        mode: NameMode,
    ) -> UploadResult<SentFile> {
        let mut stream = connect(addr).await?;

        let path = target.local_path();
        let open_err = |source: io::Error| UploadError::Open {
            path: path.clone(),
            source,
        };
        let mut file = tokio::fs::File::open(&path).await.map_err(open_err)?;
        let body_len = file.metadata().await.map_err(open_err)?.len();

        let name = wire_name(&target.relative, mode);
        let header = codec
            .encode_header(&name, body_len)
            .map_err(|source| UploadError::Protocol {
                path: path.clone(),
                source,
            })?;

        let write_err = |source: io::Error| UploadError::Write {
            path: path.clone(),
            addr: addr.to_string(),
            source,
        };
        stream.write_all(&header).await.map_err(write_err)?;

        let bytes = if codec.bounds_body() {
            // Declared length is binding; a file that shrank mid-copy is an error
            let mut body = (&mut file).take(body_len);
            let n = tokio::io::copy(&mut body, &mut stream)
                .await
                .map_err(write_err)?;
            if n != body_len {
                return Err(write_err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("file shrank while sending: {} of {} bytes", n, body_len),
                )));
            }
            n
        } else {
            tokio::io::copy(&mut file, &mut stream)
                .await
                .map_err(write_err)?
        };

        // Half-close marks end of body for the stream-delimited format
        stream.shutdown().await.map_err(write_err)?;

        Ok(SentFile { path, name, bytes })
    }
}
