//! Types and utilities for handling file metadata in StorageHub.
//!
//! A file is identified on-chain by its *file key*, the hash of its [`FileMetadata`]. The
//! metadata itself carries the file's *fingerprint*: the root of a Merkle trie over the
//! file's fixed-size chunks (see [`chunks_count`](FileMetadata::chunks_count)). Both the
//! chunk size and the hash length are const generics so that runtime code (which must keep
//! these values fixed and `no_std`-friendly) and off-chain client code share one definition,
//! parameterised from [`shp_constants`].
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec::Vec;
use codec::{Decode, Encode, MaxEncodedLen};
use core::fmt;
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};
use sp_core::Hasher;

/// Root hash of a file's chunk trie, i.e. the file's content fingerprint.
///
/// Generic over the hash length so it can be reused for hash functions other than the
/// network's default 32-byte one in tests.
#[derive(Clone, Copy, Encode, Decode, MaxEncodedLen, TypeInfo, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fingerprint<const H_LENGTH: usize>([u8; H_LENGTH]);

/// Hex-encodes the fingerprint for human-readable serialisation (RPC responses, logs), the
/// same way hashes are rendered elsewhere in the off-chain client.
impl<const H_LENGTH: usize> Serialize for Fingerprint<H_LENGTH> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de, const H_LENGTH: usize> Deserialize<'de> for Fingerprint<H_LENGTH> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = alloc::string::String::deserialize(deserializer)?;
        let decoded = hex::decode(encoded.trim_start_matches("0x"))
            .map_err(serde::de::Error::custom)?;
        if decoded.len() != H_LENGTH {
            return Err(serde::de::Error::custom("fingerprint has unexpected length"));
        }
        Ok(Fingerprint::from(decoded.as_slice()))
    }
}

impl<const H_LENGTH: usize> Default for Fingerprint<H_LENGTH> {
    fn default() -> Self {
        Self([0u8; H_LENGTH])
    }
}

impl<const H_LENGTH: usize> AsRef<[u8]> for Fingerprint<H_LENGTH> {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<const H_LENGTH: usize> From<[u8; H_LENGTH]> for Fingerprint<H_LENGTH> {
    fn from(bytes: [u8; H_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl<const H_LENGTH: usize> From<&[u8]> for Fingerprint<H_LENGTH> {
    fn from(bytes: &[u8]) -> Self {
        let mut buf = [0u8; H_LENGTH];
        let len = core::cmp::min(bytes.len(), H_LENGTH);
        buf[..len].copy_from_slice(&bytes[..len]);
        Self(buf)
    }
}

impl<const H_LENGTH: usize> fmt::Debug for Fingerprint<H_LENGTH> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint(0x{})", hex::encode(self.0))
    }
}

/// Index of a fixed-size chunk within a file, counting from zero.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Encode,
    Decode,
    TypeInfo,
    Serialize,
    Deserialize,
)]
pub struct ChunkId(u64);

impl ChunkId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ChunkId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Errors raised when constructing [`FileMetadata`] from raw parts.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// Files of zero length are rejected; a trie with no leaves has no meaningful
    /// fingerprint.
    FileSizeCannotBeZero,
    /// The storage location exceeds the protocol's maximum path length (512 bytes).
    LocationTooLarge,
}

/// Maximum length, in bytes, of a file's location (path) within its bucket.
pub const MAX_LOCATION_LEN: usize = 512;

/// Describes a file stored in StorageHub: who owns it, where it lives, how large it is, and
/// the Merkle root of its chunk trie.
///
/// `H_LENGTH` is the hash length used both for the fingerprint and for hashing the metadata
/// itself into a file key; `CHUNK_SIZE` is the fixed chunk size in bytes; `SIZE_TO_CHALLENGES`
/// scales how many chunk indices a single challenge against this file covers.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct FileMetadata<const H_LENGTH: usize, const CHUNK_SIZE: u64, const SIZE_TO_CHALLENGES: u64>
{
    pub owner: Vec<u8>,
    pub bucket_id: Vec<u8>,
    pub location: Vec<u8>,
    pub file_size: u64,
    pub fingerprint: Fingerprint<H_LENGTH>,
}

impl<const H_LENGTH: usize, const CHUNK_SIZE: u64, const SIZE_TO_CHALLENGES: u64>
    FileMetadata<H_LENGTH, CHUNK_SIZE, SIZE_TO_CHALLENGES>
{
    /// Build a new [`FileMetadata`], validating the invariants from the file admission
    /// boundary: non-zero size and a location within the protocol's length limit.
    pub fn new(
        owner: Vec<u8>,
        bucket_id: Vec<u8>,
        location: Vec<u8>,
        file_size: u64,
        fingerprint: Fingerprint<H_LENGTH>,
    ) -> Result<Self, Error> {
        if file_size == 0 {
            return Err(Error::FileSizeCannotBeZero);
        }
        if location.len() > MAX_LOCATION_LEN {
            return Err(Error::LocationTooLarge);
        }
        Ok(Self {
            owner,
            bucket_id,
            location,
            file_size,
            fingerprint,
        })
    }

    pub fn fingerprint(&self) -> &Fingerprint<H_LENGTH> {
        &self.fingerprint
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn owner(&self) -> &[u8] {
        &self.owner
    }

    pub fn location(&self) -> &[u8] {
        &self.location
    }

    pub fn bucket_id(&self) -> &[u8] {
        &self.bucket_id
    }

    /// Number of fixed-size chunks that make up this file, rounding up: the final chunk may
    /// be shorter than `CHUNK_SIZE` but is still counted.
    pub fn chunks_count(&self) -> u64 {
        self.file_size.div_ceil(CHUNK_SIZE)
    }

    /// Iterate over every chunk index of this file, in order.
    pub fn chunks(&self) -> impl Iterator<Item = ChunkId> {
        (0..self.chunks_count()).map(ChunkId::from)
    }

    /// Index of the last chunk of this file.
    pub fn last_chunk_id(&self) -> ChunkId {
        ChunkId::from(self.chunks_count() - 1)
    }

    /// Number of distinct chunk indices a single challenge against this file should cover,
    /// scaling with file size so that large files require proportionally larger proofs.
    pub fn chunks_to_check(&self) -> u64 {
        core::cmp::max(1, self.file_size.div_ceil(SIZE_TO_CHALLENGES))
    }

    /// Hash the SCALE-encoded metadata to derive this file's file key.
    pub fn file_key<H: Hasher>(&self) -> H::Out {
        H::hash(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp_core::Blake2Hasher;

    fn sample() -> FileMetadata<32, 1024, { 4 * 1024 * 1024 }> {
        FileMetadata::new(
            b"alice".to_vec(),
            b"bucket".to_vec(),
            b"path/to/file".to_vec(),
            2048,
            Fingerprint::default(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_empty_file() {
        let err = FileMetadata::<32, 1024, { 4 * 1024 * 1024 }>::new(
            b"alice".to_vec(),
            b"bucket".to_vec(),
            b"path".to_vec(),
            0,
            Fingerprint::default(),
        )
        .unwrap_err();
        assert_eq!(err, Error::FileSizeCannotBeZero);
    }

    #[test]
    fn rejects_oversized_location() {
        let err = FileMetadata::<32, 1024, { 4 * 1024 * 1024 }>::new(
            b"alice".to_vec(),
            b"bucket".to_vec(),
            alloc::vec![0u8; MAX_LOCATION_LEN + 1],
            1,
            Fingerprint::default(),
        )
        .unwrap_err();
        assert_eq!(err, Error::LocationTooLarge);
    }

    #[test]
    fn chunks_count_rounds_up() {
        let metadata = sample();
        assert_eq!(metadata.chunks_count(), 2);
    }

    #[test]
    fn file_key_is_deterministic() {
        let metadata = sample();
        let key_a = metadata.file_key::<Blake2Hasher>();
        let key_b = metadata.file_key::<Blake2Hasher>();
        assert_eq!(key_a, key_b);
    }
}
