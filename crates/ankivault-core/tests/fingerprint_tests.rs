// Property tests for fingerprint determinism and order sensitivity

use ankivault_core::{fingerprint, AssetEntry, AssetManifest};
use proptest::prelude::*;

proptest! {
    #[test]
    fn fingerprint_is_deterministic(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        prop_assert_eq!(fingerprint(&bytes, None), fingerprint(&bytes, None));
    }

    #[test]
    fn distinct_content_yields_distinct_fingerprints(
        a in proptest::collection::vec(any::<u8>(), 0..256),
        b in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(fingerprint(&a, None), fingerprint(&b, None));
    }

    #[test]
    fn manifest_entries_are_order_sensitive(
        name_a in "[a-z]{1,16}",
        name_b in "[a-z]{1,16}",
        size_a in 0u64..1_000_000,
        size_b in 0u64..1_000_000,
    ) {
        let a = AssetEntry { name: name_a, size_bytes: size_a };
        let b = AssetEntry { name: name_b, size_bytes: size_b };
        prop_assume!(a != b);

        let forward = AssetManifest { entries: vec![a.clone(), b.clone()] };
        let reverse = AssetManifest { entries: vec![b, a] };
        prop_assert_ne!(
            fingerprint(b"col", Some(&forward)),
            fingerprint(b"col", Some(&reverse))
        );
    }

    #[test]
    fn manifest_framing_does_not_alias_collection_bytes(
        bytes in proptest::collection::vec(any::<u8>(), 1..64),
    ) {
        // Moving trailing collection bytes into a manifest entry name must
        // change the digest: the length prefixes keep the domains apart.
        let manifest = AssetManifest {
            entries: vec![AssetEntry {
                name: String::from_utf8_lossy(&bytes).into_owned(),
                size_bytes: 0,
            }],
        };
        prop_assert_ne!(
            fingerprint(&bytes, None),
            fingerprint(&bytes, Some(&manifest))
        );
    }
}
