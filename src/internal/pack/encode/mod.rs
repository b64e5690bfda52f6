//! Streaming pack encoder: writes the pack header, one compressed object record per received
//! entry, and the trailing checksum, forwarding each chunk down a channel as it's produced.

use flate2::{Compression, write::ZlibEncoder};
use std::io::Write as _;
use tokio::sync::mpsc;

use crate::{
    errors::GitError,
    internal::{
        metadata::{EntryMeta, MetaAttached},
        pack::{
            entry::Entry,
            utils::{encode_object_header, write_pack_header},
        },
    },
    utils::HashAlgorithm,
};

/// Encodes a stream of `Entry` values into Git pack-format bytes.
///
/// Objects are currently written as full base records; `window_size` is accepted for API
/// compatibility with future delta-compression support but has no effect yet.
pub struct PackEncoder {
    object_count: usize,
    window_size: usize,
    tx: mpsc::Sender<Vec<u8>>,
    hash: HashAlgorithm,
}

impl PackEncoder {
    pub fn new(object_count: usize, window_size: usize, tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            object_count,
            window_size,
            tx,
            hash: HashAlgorithm::new(),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    async fn send_hashed(&mut self, chunk: Vec<u8>) -> Result<(), GitError> {
        self.hash.update(&chunk);
        self.tx.send(chunk).await.map_err(channel_closed)
    }

    fn encode_record(entry: &Entry) -> Result<Vec<u8>, GitError> {
        let type_code = entry.obj_type.to_pack_type_u8()?;
        let mut record = encode_object_header(type_code, entry.data.len());

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&entry.data).map_err(GitError::IOError)?;
        record.extend(encoder.finish().map_err(GitError::IOError)?);
        Ok(record)
    }

    /// Drain `entries`, writing each as a pack object record, then the trailing checksum.
    pub async fn encode(
        &mut self,
        mut entries: mpsc::Receiver<MetaAttached<Entry, EntryMeta>>,
    ) -> Result<(), GitError> {
        let header = write_pack_header(self.object_count as u32);
        self.send_hashed(header).await?;

        let mut written = 0usize;
        while let Some(attached) = entries.recv().await {
            let record = Self::encode_record(&attached.inner)?;
            self.send_hashed(record).await?;
            written += 1;
        }

        if written != self.object_count {
            return Err(GitError::PackEncodeError(format!(
                "declared {} objects in the pack header but encoded {}",
                self.object_count, written
            )));
        }

        let trailer = self.hash.clone().finalize();
        self.tx.send(trailer).await.map_err(channel_closed)?;
        Ok(())
    }
}

fn channel_closed(e: mpsc::error::SendError<Vec<u8>>) -> GitError {
    GitError::IOError(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        format!("pack encoder output channel closed: {e}"),
    ))
}
