#[derive(Debug, Clone, Default)]
pub struct EntryMeta {
    /// Source file path, relative to the repository root.
    pub file_path: Option<String>,

    /// ID or index of the pack file this entry belongs to.
    pub pack_id: Option<String>,

    /// Byte offset of this entry within the pack file.
    pub pack_offset: Option<usize>,

    /// CRC32 of the entry's compressed bytes, as stored in the pack index.
    pub crc32: Option<u32>,

    pub is_delta: Option<bool>,
}

impl EntryMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pack_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.pack_id = Some(id.into());
        self
    }

    pub fn set_crc32(&mut self, crc32: u32) -> &mut Self {
        self.crc32 = Some(crc32);
        self
    }
}
