//! Constants shared by the runtime pallets and the off-chain provider client.
//!
//! These are compiled into both `no_std` runtime code (as const generics for
//! [`shp_file_metadata`] and [`shp_file_key_verifier`] types) and the client crates, so a
//! single definition keeps the two sides from drifting apart.
#![cfg_attr(not(feature = "std"), no_std)]

/// Length, in bytes, of the hash used throughout the Merkle Patricia Forest and file chunk
/// tries (Blake2b-256).
pub const H_LENGTH: usize = 32;

/// Fixed size, in bytes, of a file chunk. The last chunk of a file may be shorter, but never
/// empty.
pub const FILE_CHUNK_SIZE: u64 = 1024;

/// Number of bytes of file size that correspond to a single additional challengeable chunk
/// index, beyond the base challenge. Used to scale the number of chunks a challenge covers
/// with the size of the file being challenged, so that proving possession of a large file
/// requires a commensurately larger proof.
pub const FILE_SIZE_TO_CHALLENGES: u64 = 4 * 1024 * 1024;

/// One gigabyte, expressed in bytes. Storage prices are quoted per giga-unit per tick; this
/// is the divisor used to scale a `price_per_giga_unit_per_tick` down to a per-byte rate.
pub const GIGAUNIT: u64 = 1024 * 1024 * 1024;
