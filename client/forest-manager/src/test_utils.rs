use codec::Encode;
use shc_common::types::{FileMetadata, Fingerprint, HashT};

use sp_trie::MemoryDB;
use trie_db::{Hasher, TrieDBMutBuilder, TrieLayout, TrieMut};

/// Build a Merkle Patricia Forest Trie.
///
/// The trie is built from the ground up, by hashing a handful of synthetic file metadata
/// entries and inserting them as leaves keyed by their file key. Used by the `prove` tests
/// to exercise the exact-match and neighbour-key proving paths against a populated trie.
pub fn build_merkle_patricia_forest<T: TrieLayout>() -> (
    MemoryDB<T::Hash>,
    HashT<T>,
    Vec<<<T as TrieLayout>::Hash as Hasher>::Out>,
) {
    let user_ids = vec![
        b"01", b"02", b"03", b"04", b"05", b"06", b"07", b"08", b"09", b"10", b"11", b"12", b"13",
        b"12", b"13", b"14", b"15", b"16", b"17", b"18", b"19", b"20", b"21", b"22", b"23", b"24",
        b"25", b"26", b"27", b"28", b"29", b"30", b"31", b"32",
    ];
    let bucket = b"bucket".to_vec();
    let file_name = b"sample64b";

    let mut file_leaves = Vec::new();

    for user_id in user_ids {
        let mut location = Vec::new();
        location.extend_from_slice(*user_id);
        location.extend_from_slice(file_name);

        let metadata = FileMetadata::new(
            user_id.to_vec(),
            bucket.clone(),
            location,
            64,
            Fingerprint::default(),
        )
        .expect("synthetic metadata is well-formed");

        let encoded = metadata.encode();
        let file_key = T::Hash::hash(&encoded);

        file_leaves.push((file_key, encoded));
    }

    // Construct the Merkle Patricia Forest.
    let mut memdb = MemoryDB::<T::Hash>::default();
    let mut root: HashT<T> = Default::default();

    let mut file_keys = Vec::new();
    {
        let mut merkle_forest_trie = TrieDBMutBuilder::<T>::new(&mut memdb, &mut root).build();

        for (key, value) in &file_leaves {
            merkle_forest_trie
                .insert(key.as_ref(), value.as_ref())
                .unwrap();

            file_keys.push(*key);
        }
    }
    (memdb, root, file_keys)
}
