//! Pack decoding: walks a pack byte stream header-to-trailer, resolving `OFS_DELTA`/`REF_DELTA`
//! records against already-seen base objects (or parking them in the `Waitlist` until their base
//! shows up), and invoking a callback with every resolved object in the order it becomes ready.

use std::io::{BufRead, Read};
use std::path::PathBuf;
use std::sync::{Arc, atomic::AtomicUsize};

use threadpool::ThreadPool;

use crate::{
    delta::decode::delta_decode,
    errors::GitError,
    hash::ObjectHash,
    internal::{
        object::types::ObjectType,
        pack::{
            Pack,
            cache::Caches,
            cache_object::{CacheObject, CacheObjectInfo},
            entry::Entry,
            utils::{PACK_VERSION, decode_object_header, decode_offset, read_pack_header},
            waitlist::Waitlist,
        },
        zlib::stream::inflate::ReadBoxed,
    },
};

/// Reject packs declaring more objects than this; guards against a hostile/corrupt header
/// driving an unbounded decode loop.
const MAX_OBJECT_COUNT: u32 = 100_000;
/// Reject packs whose total decompressed payload exceeds this many bytes.
const MAX_TOTAL_UNCOMPRESSED_SIZE: u64 = 1 << 30;
/// Reject any single object declaring a decompressed size above this.
const MAX_SINGLE_OBJECT_SIZE: usize = 100 << 20;

fn inflate_base<R: BufRead>(
    reader: &mut R,
    obj_type: ObjectType,
    size: usize,
) -> Result<Vec<u8>, GitError> {
    let mut boxed = ReadBoxed::new(reader, obj_type, size);
    let mut data = Vec::with_capacity(size);
    boxed.read_to_end(&mut data).map_err(GitError::IOError)?;
    Ok(data)
}

fn inflate_delta<R: BufRead>(reader: &mut R) -> Result<Vec<u8>, GitError> {
    let mut boxed = ReadBoxed::new_for_delta(reader);
    let mut data = Vec::new();
    boxed.read_to_end(&mut data).map_err(GitError::IOError)?;
    Ok(data)
}

impl Pack {
    pub fn new(
        mem_limit: Option<usize>,
        thread_num: Option<usize>,
        _temp_path: Option<PathBuf>,
        clean_tmp: bool,
    ) -> Self {
        Pack {
            number: 0,
            signature: ObjectHash::default(),
            objects: Vec::new(),
            pool: Arc::new(ThreadPool::new(thread_num.unwrap_or_else(num_cpus::get))),
            waitlist: Arc::new(Waitlist::new()),
            caches: Arc::new(Caches::new()),
            mem_limit,
            cache_objs_mem: Arc::new(AtomicUsize::new(0)),
            clean_tmp,
        }
    }

    fn check_total(&self, total: u64) -> Result<(), GitError> {
        if total > MAX_TOTAL_UNCOMPRESSED_SIZE {
            return Err(GitError::PackLimitExceeded(format!(
                "pack uncompressed payload of {total} bytes exceeds the {MAX_TOTAL_UNCOMPRESSED_SIZE} byte limit"
            )));
        }
        if let Some(limit) = self.mem_limit {
            if total > limit as u64 {
                return Err(GitError::PackLimitExceeded(format!(
                    "pack uncompressed payload of {total} bytes exceeds the configured {limit} byte limit"
                )));
            }
        }
        Ok(())
    }

    fn store_base(
        &self,
        offset: usize,
        obj_type: ObjectType,
        hash: ObjectHash,
        data: Vec<u8>,
        chain_len: usize,
        callback: &mut impl FnMut(Entry, usize),
    ) -> Result<(), GitError> {
        let cache_obj = Arc::new(CacheObject {
            info: CacheObjectInfo::BaseObject(obj_type, hash),
            offset,
            crc32: 0,
            data_decompressed: data.clone(),
            mem_recorder: Some(self.cache_objs_mem.clone()),
            is_delta_in_pack: chain_len > 0,
        });
        self.cache_objs_mem
            .fetch_add(cache_obj.mem_size(), std::sync::atomic::Ordering::Relaxed);
        self.caches.insert(cache_obj);

        callback(
            Entry {
                obj_type,
                data: data.clone(),
                hash,
                chain_len,
            },
            offset,
        );

        for waiter in self.waitlist.take(offset, hash) {
            self.resolve_delta(waiter.offset, obj_type, hash, &data, chain_len, waiter.data_decompressed.clone(), callback)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_delta(
        &self,
        offset: usize,
        base_type: ObjectType,
        _base_hash: ObjectHash,
        base_data: &[u8],
        base_chain_len: usize,
        delta_data: Vec<u8>,
        callback: &mut impl FnMut(Entry, usize),
    ) -> Result<(), GitError> {
        let mut cursor = std::io::Cursor::new(delta_data);
        let resolved = delta_decode(&mut cursor, base_data)
            .map_err(|e| GitError::DeltaObjectError(e.to_string()))?;
        let hash = ObjectHash::from_type_and_data(base_type, &resolved);
        self.store_base(offset, base_type, hash, resolved, base_chain_len + 1, callback)
    }

    /// Decode a full pack stream, calling `callback(entry, offset)` for every resolved object
    /// (base or reconstructed delta target) as soon as its final bytes are available.
    pub fn decode<R: BufRead>(
        &mut self,
        reader: &mut R,
        mut callback: impl FnMut(Entry, usize),
    ) -> Result<(), GitError> {
        use crate::internal::pack::wrapper::Wrapper;

        let mut wrapper = Wrapper::new(reader);
        let (version, count) = read_pack_header(&mut wrapper).map_err(GitError::IOError)?;
        if version != PACK_VERSION {
            return Err(GitError::UnsupportedVersion(format!(
                "unsupported pack version {version}, expected {PACK_VERSION}"
            )));
        }
        if count > MAX_OBJECT_COUNT {
            return Err(GitError::PackLimitExceeded(format!(
                "pack declares {count} objects, exceeds the {MAX_OBJECT_COUNT} object limit"
            )));
        }
        self.number = count as usize;

        let mut total_uncompressed: u64 = 0;

        for _ in 0..count {
            let offset = wrapper.bytes_read();
            let (type_code, size) =
                decode_object_header(&mut wrapper).map_err(GitError::IOError)?;
            if size > MAX_SINGLE_OBJECT_SIZE {
                return Err(GitError::PackLimitExceeded(format!(
                    "object at offset {offset} declares size {size}, exceeds the single-object limit"
                )));
            }

            if let Ok(obj_type) = ObjectType::from_pack_type_u8(type_code) {
                if obj_type.is_base() {
                    let data = inflate_base(&mut wrapper, obj_type, size)?;
                    total_uncompressed += data.len() as u64;
                    self.check_total(total_uncompressed)?;
                    let hash = ObjectHash::from_type_and_data(obj_type, &data);
                    self.store_base(offset, obj_type, hash, data, 0, &mut callback)?;
                    continue;
                }
            }

            match type_code {
                6 => {
                    let back = decode_offset(&mut wrapper).map_err(GitError::IOError)?;
                    let base_offset = offset.checked_sub(back).ok_or_else(|| {
                        GitError::CorruptPack(format!(
                            "OFS_DELTA at offset {offset} points {back} bytes before the start of the pack"
                        ))
                    })?;
                    let delta_data = inflate_delta(&mut wrapper)?;
                    total_uncompressed += delta_data.len() as u64;
                    self.check_total(total_uncompressed)?;

                    if let Some(base) = self.caches.get_by_offset(base_offset) {
                        let (base_type, base_hash, base_chain_len) = match &base.info {
                            CacheObjectInfo::BaseObject(t, h) => (*t, *h, 0),
                            _ => {
                                return Err(GitError::CorruptPack(
                                    "OFS_DELTA base resolved to a non-base cache entry".into(),
                                ));
                            }
                        };
                        self.resolve_delta(
                            offset,
                            base_type,
                            base_hash,
                            &base.data_decompressed,
                            base_chain_len,
                            delta_data,
                            &mut callback,
                        )?;
                    } else {
                        self.waitlist.insert_offset(
                            base_offset,
                            CacheObject {
                                info: CacheObjectInfo::OffsetDelta { base_offset },
                                offset,
                                crc32: 0,
                                data_decompressed: delta_data,
                                mem_recorder: None,
                                is_delta_in_pack: true,
                            },
                        );
                    }
                }
                7 => {
                    let base_hash = ObjectHash::from_stream(&mut wrapper).map_err(GitError::IOError)?;
                    let delta_data = inflate_delta(&mut wrapper)?;
                    total_uncompressed += delta_data.len() as u64;
                    self.check_total(total_uncompressed)?;

                    if let Some(base) = self.caches.get_by_hash(&base_hash) {
                        let (base_type, base_chain_len) = match &base.info {
                            CacheObjectInfo::BaseObject(t, _) => (*t, 0),
                            _ => {
                                return Err(GitError::CorruptPack(
                                    "REF_DELTA base resolved to a non-base cache entry".into(),
                                ));
                            }
                        };
                        self.resolve_delta(
                            offset,
                            base_type,
                            base_hash,
                            &base.data_decompressed,
                            base_chain_len,
                            delta_data,
                            &mut callback,
                        )?;
                    } else {
                        self.waitlist.insert_ref(
                            base_hash,
                            CacheObject {
                                info: CacheObjectInfo::RefDelta { base_hash },
                                offset,
                                crc32: 0,
                                data_decompressed: delta_data,
                                mem_recorder: None,
                                is_delta_in_pack: true,
                            },
                        );
                    }
                }
                other => {
                    return Err(GitError::InvalidObjectType(format!(
                        "unsupported pack object type code {other}"
                    )));
                }
            }
        }

        let computed_hash = wrapper.final_hash();
        let mut trailer = vec![0u8; computed_hash.size()];
        wrapper.read_exact(&mut trailer).map_err(GitError::IOError)?;
        let declared_hash =
            ObjectHash::from_bytes(&trailer).map_err(|e| GitError::CorruptPack(e.to_string()))?;
        if declared_hash != computed_hash {
            return Err(GitError::CorruptPack(format!(
                "pack trailer checksum mismatch: declared {declared_hash}, computed {computed_hash}"
            )));
        }
        self.signature = computed_hash;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::{
        hash::{HashKind, set_hash_kind_for_test},
        internal::pack::{encode::PackEncoder, entry::Entry},
    };

    #[tokio::test]
    async fn decode_round_trips_an_encoded_pack_of_base_objects() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);

        let blob_data = b"hello pack decode".to_vec();
        let hash = ObjectHash::from_type_and_data(ObjectType::Blob, &blob_data);
        let entry = Entry {
            obj_type: ObjectType::Blob,
            data: blob_data.clone(),
            hash,
            chain_len: 0,
        };

        let (pack_tx, mut pack_rx) = tokio::sync::mpsc::channel::<Vec<u8>>(16);
        let (entry_tx, entry_rx) = tokio::sync::mpsc::channel(4);
        let mut encoder = PackEncoder::new(1, 10, pack_tx);

        let encode_task = tokio::spawn(async move { encoder.encode(entry_rx).await });
        entry_tx
            .send(crate::internal::metadata::MetaAttached {
                inner: entry,
                meta: crate::internal::metadata::EntryMeta::new(),
            })
            .await
            .unwrap();
        drop(entry_tx);
        encode_task.await.unwrap().unwrap();

        let mut pack_bytes = Vec::new();
        while let Some(chunk) = pack_rx.recv().await {
            pack_bytes.extend(chunk);
        }

        let mut pack = Pack::new(None, None, None, true);
        let mut seen = Vec::new();
        pack.decode(&mut Cursor::new(pack_bytes), |entry, offset| {
            seen.push((entry, offset));
        })
        .unwrap();

        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.data, blob_data);
        assert_eq!(seen[0].0.hash, hash);
    }
}
