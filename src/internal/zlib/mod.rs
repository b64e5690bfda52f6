//! zlib/DEFLATE stream helpers used to decode Git's compressed object storage.

pub mod stream;
