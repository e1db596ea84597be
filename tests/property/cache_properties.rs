//! Image cache store/load fidelity and capacity decisions

use foodsnap::cache::{CachePolicy, ImageCache};
use foodsnap::clock::ManualClock;
use foodsnap::storage::Storage;
use foodsnap::ImageFile;
use proptest::prelude::*;

/// Whatever is stored comes back byte-for-byte with the same metadata
#[test]
fn test_store_load_fidelity_property() {
    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig::with_cases(48));

    runner
        .run(
            &(
                proptest::collection::vec(any::<u8>(), 0..20_000),
                "[a-z]{1,12}\\.(jpg|png|webp)",
                prop_oneof![Just("image/jpeg"), Just("image/png"), Just("image/webp")],
                any::<bool>(),
            ),
            |(bytes, name, mime, compressed)| {
                let cache = ImageCache::new(
                    Storage::temporary().unwrap(),
                    ManualClock::shared(0),
                    CachePolicy::default(),
                );
                let mut file = ImageFile::new(name, mime, bytes);
                file.compressed = compressed;

                prop_assert!(cache.store(&file));
                let loaded = cache.load().unwrap();
                prop_assert_eq!(&loaded.file, &file);
                prop_assert_eq!(cache.cache_size(), file.size());
                Ok(())
            },
        )
        .unwrap();
}

/// A rejected store never disturbs the current entry
#[test]
fn test_rejected_store_keeps_prior_entry_property() {
    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig::with_cases(48));

    runner
        .run(&(1usize..2_000, 1usize..20_000), |(first_len, second_len)| {
            let storage = Storage::temporary().unwrap();
            let policy = CachePolicy {
                capacity_bytes: 8_192,
                ..CachePolicy::default()
            };
            let cache = ImageCache::new(storage.clone(), ManualClock::shared(0), policy);

            let first = ImageFile::new("first.jpg", "image/jpeg", vec![1; first_len]);
            prop_assume!(cache.store(&first));
            let before = storage.get_raw("foodsnap_cached_image").unwrap();

            let second = ImageFile::new("second.jpg", "image/jpeg", vec![2; second_len]);
            let used = before.as_ref().map(|b| b.len()).unwrap_or(0) as f64;
            let fits = second_len as f64 * 1.4 <= 8_192.0 - used;

            let stored = cache.store(&second);
            if !fits {
                prop_assert!(!stored);
            }
            if !stored {
                prop_assert_eq!(storage.get_raw("foodsnap_cached_image").unwrap(), before);
            }
            Ok(())
        })
        .unwrap();
}
