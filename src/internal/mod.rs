//! Internal building blocks (index, metadata, object model, pack/zlib) that power the public APIs.

pub mod index;
pub mod metadata;
pub mod object;
pub mod pack;
pub mod protection;
pub mod refs;
pub mod storage;
pub mod zlib;
