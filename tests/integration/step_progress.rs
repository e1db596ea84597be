//! Step progress persistence across restarts

use foodsnap::clock::ManualClock;
use foodsnap::steps::{RecipeRef, RecipeSteps, StepProgressRecord, StepProgressStore};
use foodsnap::storage::Storage;
use tempfile::TempDir;

const CURRY: &str = "Toast spices\n\nAdd onions\n  Simmer 20 minutes  \n";

#[test]
fn test_progress_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    {
        let storage = Storage::open(temp_dir.path()).unwrap();
        let store = StepProgressStore::new(storage.clone(), ManualClock::shared(0));
        let mut steps = RecipeSteps::open(&store, RecipeRef::new(12, "Curry"), CURRY);
        assert!(steps.toggle(3));
        storage.flush().unwrap();
    }

    let storage = Storage::open(temp_dir.path()).unwrap();
    let store = StepProgressStore::new(storage, ManualClock::shared(0));
    let steps = RecipeSteps::open(&store, RecipeRef::new(12, "Curry"), CURRY);

    let texts: Vec<_> = steps.steps().iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["Toast spices", "Add onions", "Simmer 20 minutes"]);
    let done: Vec<_> = steps.completed_ids().iter().copied().collect();
    assert_eq!(done, vec![3]);
    assert_eq!(steps.summary().percent, 33);
}

#[test]
fn test_record_written_by_older_client_is_read() {
    let storage = Storage::temporary().unwrap();
    storage
        .set_raw(
            "recipe-progress-5",
            br#"{"recipeId":5,"recipeName":"Tea","completedSteps":[1,2],"lastUpdated":"2024-01-01T00:00:00.000Z"}"#,
        )
        .unwrap();
    let store = StepProgressStore::new(storage, ManualClock::shared(0));

    let steps = RecipeSteps::open(&store, RecipeRef::new(5, "Tea"), "Boil\nSteep\nPour");
    assert!(!steps.is_stale());
    assert_eq!(steps.summary().completed, 2);

    let record: StepProgressRecord = store.record(5).unwrap();
    assert_eq!(record.text_fingerprint, None);
}

#[test]
fn test_toggle_refreshes_last_updated() {
    let storage = Storage::temporary().unwrap();
    let clock = ManualClock::shared(0);
    let store = StepProgressStore::new(storage, clock.clone());
    let recipe = RecipeRef::new(1, "Soup");

    store.toggle(&recipe, 1).unwrap();
    let first = store.record(1).unwrap().last_updated;
    clock.set(60_000);
    store.toggle(&recipe, 2).unwrap();
    let second = store.record(1).unwrap().last_updated;

    assert_eq!(first, "1970-01-01T00:00:00.000Z");
    assert_eq!(second, "1970-01-01T00:01:00.000Z");
}

#[test]
fn test_recipes_are_independent() {
    let store = StepProgressStore::new(Storage::temporary().unwrap(), ManualClock::shared(0));
    let mut a = RecipeSteps::open(&store, RecipeRef::new(1, "A"), "x\ny");
    let b = RecipeSteps::open(&store, RecipeRef::new(2, "B"), "x\ny");
    a.toggle(1);
    a.reset();

    assert!(store.load(1).is_empty());
    assert!(b.completed_ids().is_empty());
    assert_eq!(store.tracked_recipes().unwrap(), Vec::<u64>::new());
}
