use super::error::UploadError;

/// In-memory accumulator for an incoming upload with a hard size ceiling.
///
/// Bodies are collected here before anything touches the disk, so an
/// oversized upload is rejected without leaving partial files behind.
#[derive(Debug)]
pub struct UploadBuffer {
    data: Vec<u8>,
    limit: u64,
}

impl UploadBuffer {
    pub fn new(limit: u64) -> Self {
        Self {
            data: Vec::new(),
            limit,
        }
    }

    /// Append a chunk, failing once the running total exceeds the limit.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), UploadError> {
        let total = self.data.len() as u64 + chunk.len() as u64;
        if total > self.limit {
            return Err(UploadError::FileTooLarge { limit: self.limit });
        }
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}
