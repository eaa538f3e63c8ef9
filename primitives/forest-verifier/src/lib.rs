//! [`CommitmentVerifier`] implementation for Merkle Patricia Forests.
//!
//! A Forest is keyed by 32-byte file keys. A challenge against it is answered either with
//! the exact key (the Provider stores it) or with its two trie neighbours (the Provider
//! does not store it, but proves it by bracketing the challenged key between two keys it
//! does store). This mirrors the compact-proof generation side in
//! `shc-forest-manager::prove`: the prover records the nodes visited while walking to
//! each challenged key, and the verifier here reconstructs a partial trie from just those
//! nodes and re-runs the same walk.
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::{collections::BTreeSet, vec::Vec};
use core::marker::PhantomData;
use shp_traits::{CommitmentVerifier, MaybeDebug, TrieMutation, TrieProofDeltaApplier};
use sp_runtime::DispatchError;
use sp_trie::{CompactProof, MemoryDB, TrieDBBuilder, TrieDBMutBuilder};
use trie_db::{Trie, TrieDBIterator, TrieLayout, TrieMut};

/// The hasher output type of a [`TrieLayout`], re-exported here for brevity.
type HasherOutT<T> = <<T as TrieLayout>::Hash as sp_core::Hasher>::Out;

/// Verifies forest proofs: a [`CompactProof`] against a forest root, proving either the
/// presence of each challenged key or its bracketing neighbours.
pub struct ForestVerifier<T: TrieLayout, const H_LENGTH: usize> {
    _phantom: PhantomData<T>,
}

impl<T, const H_LENGTH: usize> CommitmentVerifier for ForestVerifier<T, H_LENGTH>
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
    type Proof = CompactProof;

    fn verify_proof(
        commitment: &Self::Commitment,
        challenges: &[Self::Challenge],
        proof: &Self::Proof,
    ) -> Result<BTreeSet<Self::Challenge>, DispatchError> {
        let (memdb, root) = decompress_proof::<T>(proof, commitment)?;
        let trie = TrieDBBuilder::<T>::new(&memdb, &root).build();

        let mut proven = BTreeSet::new();
        for challenge in challenges {
            match nearest_neighbours::<T>(&trie, challenge.as_ref())? {
                Neighbours::Exact(key) => {
                    proven.insert(key_from_bytes::<Self::Challenge>(&key)?);
                }
                Neighbours::Bracket(None, None) => {
                    return Err("Forest proof proves neither presence nor absence".into());
                }
                Neighbours::Bracket(left, right) => {
                    if let Some(left) = left {
                        proven.insert(key_from_bytes::<Self::Challenge>(&left)?);
                    }
                    if let Some(right) = right {
                        proven.insert(key_from_bytes::<Self::Challenge>(&right)?);
                    }
                }
            }
        }

        Ok(proven)
    }
}

impl<T, const H_LENGTH: usize> TrieProofDeltaApplier<T::Hash> for ForestVerifier<T, H_LENGTH>
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
    type Key = HasherOutT<T>;
    type Proof = CompactProof;

    fn apply_delta(
        root: &Self::Key,
        mutations: &[(Self::Key, TrieMutation)],
        proof: &Self::Proof,
    ) -> Result<(MemoryDB<T::Hash>, Self::Key, Vec<(Self::Key, Option<Vec<u8>>)>), DispatchError>
    {
        let (mut memdb, mut new_root) = decompress_proof::<T>(proof, root)?;
        if &new_root != root {
            return Err("Compact proof root does not match commitment".into());
        }

        let mut mutated = Vec::with_capacity(mutations.len());
        {
            let mut trie =
                TrieDBMutBuilder::<T>::from_existing(&mut memdb, &mut new_root).build();

            for (key, mutation) in mutations {
                match mutation {
                    TrieMutation::Add(add) => {
                        trie.insert(key.as_ref(), &add.value)
                            .map_err(|_| DispatchError::from("Failed to insert mutated key"))?;
                        mutated.push((*key, Some(add.value.clone())));
                    }
                    TrieMutation::Remove(_) => {
                        trie.remove(key.as_ref())
                            .map_err(|_| DispatchError::from("Failed to remove mutated key"))?;
                        mutated.push((*key, None));
                    }
                }
            }
        }

        Ok((memdb, new_root, mutated))
    }
}

enum Neighbours {
    Exact(Vec<u8>),
    Bracket(Option<Vec<u8>>, Option<Vec<u8>>),
}

/// Walk the (partial) trie recovered from a compact proof to find the challenged key's
/// exact match or its two bracketing neighbours, mirroring
/// `shc-forest-manager::prove::prove` on the prover's side.
fn nearest_neighbours<T: TrieLayout>(
    trie: &trie_db::TrieDB<'_, '_, T>,
    challenged_key: &[u8],
) -> Result<Neighbours, DispatchError> {
    let mut iter: TrieDBIterator<'_, '_, T> =
        TrieDBIterator::new(trie).map_err(|_| DispatchError::from("Failed to create trie iterator"))?;

    // The partial trie recovered from a compact proof only ever contains the handful of
    // leaves the prover recorded while answering this challenge, so a linear scan is cheap.
    let mut prev: Option<Vec<u8>> = None;
    let mut next: Option<Vec<u8>> = None;

    while let Some(entry) = iter.next() {
        let (key, _) = entry.map_err(|_| DispatchError::from("Failed to read trie leaf"))?;
        if key.as_slice() == challenged_key {
            return Ok(Neighbours::Exact(key));
        } else if key.as_slice() < challenged_key {
            prev = Some(key);
        } else {
            next = Some(key);
            break;
        }
    }

    if prev.is_none() && next.is_none() {
        return Err("Forest proof did not include any leaves near the challenge".into());
    }

    Ok(Neighbours::Bracket(prev, next))
}

/// Decompress a [`CompactProof`] into an in-memory trie database, checking that its nodes
/// authenticate to `expected_root`.
fn decompress_proof<T: TrieLayout>(
    proof: &CompactProof,
    expected_root: &impl AsRef<[u8]>,
) -> Result<(MemoryDB<T::Hash>, HasherOutT<T>), DispatchError>
where
    HasherOutT<T>: Default + AsMut<[u8]> + PartialEq,
{
    let mut expected = HasherOutT::<T>::default();
    expected.as_mut().copy_from_slice(expected_root.as_ref());

    let (memdb, root) = proof
        .to_memory_db::<T::Hash>(Some(&expected))
        .map_err(|_| DispatchError::from("Failed to decompress forest proof"))?;

    Ok((memdb, root))
}

fn key_from_bytes<K: AsMut<[u8]> + Default>(bytes: &[u8]) -> Result<K, DispatchError> {
    let mut out = K::default();
    if out.as_mut().len() != bytes.len() {
        return Err("Unexpected key length recovered from forest proof".into());
    }
    out.as_mut().copy_from_slice(bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    //! These tests exercise the neighbour-finding walk in isolation (it is pure and does
    //! not depend on SCALE-encoded commitment types), leaving end-to-end compact proof
    //! round-trips to `shc-forest-manager`, which owns proof generation.
    use super::*;
    use reference_trie::RefHasher;
    use sp_trie::LayoutV1;
    use trie_db::{TrieDBBuilder, TrieDBMutBuilder, TrieMut};

    fn build() -> (
        MemoryDB<RefHasher>,
        <RefHasher as sp_core::Hasher>::Out,
        Vec<[u8; 32]>,
    ) {
        let mut memdb = MemoryDB::<RefHasher>::default();
        let mut root = Default::default();
        let mut keys = Vec::new();
        {
            let mut trie =
                TrieDBMutBuilder::<LayoutV1<RefHasher>>::new(&mut memdb, &mut root).build();
            for i in 0u8..5 {
                let mut key = [0u8; 32];
                key[31] = i * 10;
                trie.insert(&key, b"v").unwrap();
                keys.push(key);
            }
        }
        (memdb, root, keys)
    }

    #[test]
    fn finds_exact_match() {
        let (memdb, root, keys) = build();
        let trie = TrieDBBuilder::<LayoutV1<RefHasher>>::new(&memdb, &root).build();
        let result = nearest_neighbours::<LayoutV1<RefHasher>>(&trie, &keys[2]).unwrap();
        assert!(matches!(result, Neighbours::Exact(k) if k == keys[2]));
    }

    #[test]
    fn brackets_missing_key() {
        let (memdb, root, keys) = build();
        let trie = TrieDBBuilder::<LayoutV1<RefHasher>>::new(&memdb, &root).build();
        let mut challenge = keys[1];
        challenge[31] += 1;
        let result = nearest_neighbours::<LayoutV1<RefHasher>>(&trie, &challenge).unwrap();
        match result {
            Neighbours::Bracket(Some(left), Some(right)) => {
                assert_eq!(left, keys[1]);
                assert_eq!(right, keys[2]);
            }
            _ => panic!("expected a bracketing pair of neighbours"),
        }
    }
}
