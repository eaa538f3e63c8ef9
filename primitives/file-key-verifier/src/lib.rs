//! [`CommitmentVerifier`] implementation for individual files' chunk tries.
//!
//! A file's chunks are stored in their own small Merkle trie, keyed by chunk index and
//! rooted at the file's [`Fingerprint`](shp_file_metadata::Fingerprint). Challenges against
//! a file are arbitrary hashes; each one is folded down to a chunk index by taking it modulo
//! the file's chunk count, the same way the original prover selects which chunks to read
//! when answering a challenge (see [`FileMetadata::chunks_to_check`]).
//!
//! The commitment proved here is the file key (the hash of the file's metadata), not the
//! fingerprint directly: the proof carries the metadata itself so the verifier can recompute
//! the file key, check it against the commitment, and then use the metadata's fingerprint as
//! the chunk trie's expected root.
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::{collections::BTreeSet, vec::Vec};
use codec::{Decode, Encode, MaxEncodedLen};
use core::marker::PhantomData;
use num_bigint::BigUint;
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};
use shp_file_metadata::FileMetadata;
use shp_traits::{CommitmentVerifier, MaybeDebug};
use sp_runtime::DispatchError;
use sp_trie::{CompactProof, TrieDBBuilder};
use trie_db::{Trie, TrieLayout};

type HasherOutT<T> = <<T as TrieLayout>::Hash as sp_core::Hasher>::Out;

/// Proof that a file's chunk trie answers a set of challenges, bundled with the file's
/// metadata so the verifier can derive both the file key and the chunk trie's root without
/// any other context.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct FileKeyProof<
    const H_LENGTH: usize,
    const CHUNK_SIZE: u64,
    const SIZE_TO_CHALLENGES: u64,
> {
    pub file_metadata: FileMetadata<H_LENGTH, CHUNK_SIZE, SIZE_TO_CHALLENGES>,
    pub proof: CompactProof,
}

/// Verifies that a [`FileKeyProof`] answers a set of challenges against a given file key.
pub struct FileKeyVerifier<
    T: TrieLayout,
    const H_LENGTH: usize,
    const CHUNK_SIZE: u64,
    const SIZE_TO_CHALLENGES: u64,
> {
    _phantom: PhantomData<T>,
}

impl<T, const H_LENGTH: usize, const CHUNK_SIZE: u64, const SIZE_TO_CHALLENGES: u64>
    CommitmentVerifier for FileKeyVerifier<T, H_LENGTH, CHUNK_SIZE, SIZE_TO_CHALLENGES>
where
    T: TrieLayout + Send + Sync + 'static,
    HasherOutT<T>: MaybeDebug
        + Ord
        + Default
        + Copy
        + codec::FullCodec
        + scale_info::TypeInfo
        + codec::MaxEncodedLen
        + AsRef<[u8]>
        + AsMut<[u8]>,
{
    type Commitment = HasherOutT<T>;
    type Challenge = HasherOutT<T>;
    type Proof = FileKeyProof<H_LENGTH, CHUNK_SIZE, SIZE_TO_CHALLENGES>;

    fn verify_proof(
        commitment: &Self::Commitment,
        challenges: &[Self::Challenge],
        proof: &Self::Proof,
    ) -> Result<BTreeSet<Self::Challenge>, DispatchError> {
        let file_key = proof.file_metadata.file_key::<T::Hash>();
        if file_key.as_ref() != commitment.as_ref() {
            return Err("Proof's file metadata does not hash to the challenged file key".into());
        }

        let chunk_count = proof.file_metadata.chunks_count();
        if chunk_count == 0 {
            return Err("File has no chunks to prove".into());
        }

        let mut expected_root = HasherOutT::<T>::default();
        expected_root
            .as_mut()
            .copy_from_slice(proof.file_metadata.fingerprint().as_ref());

        let (memdb, root) = proof
            .proof
            .to_memory_db::<T::Hash>(Some(&expected_root))
            .map_err(|_| DispatchError::from("Failed to decompress file key proof"))?;
        let trie = TrieDBBuilder::<T>::new(&memdb, &root).build();

        let mut proven = BTreeSet::new();
        for challenge in challenges {
            let chunk_id = challenge_to_chunk_id(challenge.as_ref(), chunk_count);
            let key = chunk_id.to_be_bytes();
            let exists = trie
                .contains(&key)
                .map_err(|_| DispatchError::from("Failed to look up chunk in proof trie"))?;
            if !exists {
                return Err("File key proof is missing the chunk for a challenge".into());
            }
            proven.insert(*challenge);
        }

        Ok(proven)
    }
}

/// Fold an arbitrary challenge hash down to a chunk index by taking it modulo the file's
/// chunk count, treating the hash as a big-endian unsigned integer.
fn challenge_to_chunk_id(challenge: &[u8], chunk_count: u64) -> u64 {
    let challenge_int = BigUint::from_bytes_be(challenge);
    let modulus = BigUint::from(chunk_count);
    let remainder = challenge_int % modulus;
    let digits = remainder.to_bytes_be();
    let mut buf = [0u8; 8];
    let len = digits.len().min(8);
    buf[8 - len..].copy_from_slice(&digits[digits.len() - len..]);
    u64::from_be_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reference_trie::RefHasher;
    use shp_file_metadata::Fingerprint;
    use sp_trie::LayoutV1;

    type Layout = LayoutV1<RefHasher>;
    type Meta = FileMetadata<32, 8, 64>;

    #[test]
    fn rejects_mismatched_file_key() {
        let metadata = Meta::new(
            b"alice".to_vec(),
            b"bucket".to_vec(),
            b"path".to_vec(),
            16,
            Fingerprint::default(),
        )
        .unwrap();
        let wrong_key = <RefHasher as sp_core::Hasher>::Out::default();
        let proof = FileKeyProof {
            file_metadata: metadata,
            proof: CompactProof { encoded_nodes: Vec::new() },
        };
        let err = FileKeyVerifier::<Layout, 32, 8, 64>::verify_proof(&wrong_key, &[], &proof)
            .unwrap_err();
        assert!(format!("{:?}", err).contains("file metadata"));
    }

    #[test]
    fn chunk_id_is_within_bounds() {
        for chunk_count in 1..10u64 {
            let challenge = [0xffu8; 32];
            let id = challenge_to_chunk_id(&challenge, chunk_count);
            assert!(id < chunk_count);
        }
    }
}
