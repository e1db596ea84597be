//! Step parsing and toggle properties

use foodsnap::clock::ManualClock;
use foodsnap::steps::{parse_steps, RecipeRef, StepProgressStore};
use foodsnap::storage::Storage;
use proptest::prelude::*;

/// Parsed ids are 1..=n in order and every step text is trimmed and non-empty
#[test]
fn test_parse_ids_are_positional_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&"[ a-z\\t\\n]{0,200}", |text| {
            let steps = parse_steps(&text);
            for (index, step) in steps.iter().enumerate() {
                prop_assert_eq!(step.id as usize, index + 1);
                prop_assert!(!step.text.is_empty());
                prop_assert_eq!(step.text.trim(), step.text.as_str());
            }
            let expected = text.split('\n').filter(|l| !l.trim().is_empty()).count();
            prop_assert_eq!(steps.len(), expected);
            Ok(())
        })
        .unwrap();
}

/// Toggling the same step twice leaves the persisted set unchanged
#[test]
fn test_double_toggle_is_identity_property() {
    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig::with_cases(64));

    runner
        .run(
            &(proptest::collection::btree_set(1u32..20, 0..10), 1u32..20),
            |(initial, step)| {
                let store =
                    StepProgressStore::new(Storage::temporary().unwrap(), ManualClock::shared(0));
                let recipe = RecipeRef::new(1, "r");
                store.save(&recipe, &initial, None).unwrap();

                store.toggle(&recipe, step).unwrap();
                prop_assert_eq!(store.load(1).contains(&step), !initial.contains(&step));
                store.toggle(&recipe, step).unwrap();
                prop_assert_eq!(store.load(1), initial);
                Ok(())
            },
        )
        .unwrap();
}
