//! Property tests for the reconciliation planner.

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::time::SystemTime;
use tidepool_store::{
    AuthorId, ContentHash, DocPath, DocumentEntry, LogicalTimestamp, WorkspaceId,
};
use tidepool_sync::{plan, ActionKind, FileEntry, FileIndex, StoreSnapshot, SyncManifest};

const PATHS: [&str; 5] = ["a.txt", "b.txt", "c/d.txt", "c/e.txt", "z"];

/// Per-path world state: optional disk content, optional store version
/// (empty content = tombstone), optional manifest record.
type PathState = (
    Option<Vec<u8>>,
    Option<(Vec<u8>, u64)>,
    Option<(Vec<u8>, u64)>,
);

fn path_state() -> impl Strategy<Value = PathState> {
    let content = prop::collection::vec(any::<u8>(), 0..8);
    (
        prop::option::of(content.clone()),
        prop::option::of((content.clone(), 1u64..20)),
        prop::option::of((content, 1u64..20)),
    )
}

fn build_world(states: &[PathState]) -> (FileIndex, StoreSnapshot, SyncManifest) {
    let workspace = WorkspaceId::new("+props.test").unwrap();
    let author = AuthorId::new("gen").unwrap();

    let mut index = FileIndex::default();
    let mut snapshot = StoreSnapshot::default();
    let mut manifest = SyncManifest::new();

    for (i, (disk, store, recorded)) in states.iter().enumerate() {
        let path = DocPath::new(PATHS[i]).unwrap();
        if let Some(content) = disk {
            index.entries.insert(
                path.clone(),
                FileEntry {
                    path: path.clone(),
                    size: content.len() as u64,
                    modified: SystemTime::UNIX_EPOCH,
                    content_hash: ContentHash::of(content),
                },
            );
        }
        if let Some((content, ts)) = store {
            let entry = DocumentEntry::new(
                &workspace,
                path.clone(),
                content.clone(),
                author.clone(),
                LogicalTimestamp::new(*ts),
            );
            if entry.is_tombstone() {
                snapshot.tombstones.insert(path.clone(), entry);
            } else {
                snapshot.live.insert(path.clone(), entry);
            }
        }
        if let Some((content, ts)) = recorded {
            manifest.record(path, ContentHash::of(content), LogicalTimestamp::new(*ts));
        }
    }
    (index, snapshot, manifest)
}

proptest! {
    #[test]
    fn plan_is_sorted_with_one_action_per_path(
        states in prop::collection::vec(path_state(), PATHS.len())
    ) {
        let (index, snapshot, manifest) = build_world(&states);
        let actions = plan(&index, &snapshot, &manifest);

        let paths: Vec<_> = actions.iter().map(|a| a.path().clone()).collect();
        let unique: BTreeSet<_> = paths.iter().cloned().collect();
        prop_assert_eq!(unique.len(), paths.len(), "duplicate path in plan");

        let mut sorted = paths.clone();
        sorted.sort();
        prop_assert_eq!(&paths, &sorted, "plan not ordered by path");
    }

    #[test]
    fn planning_is_deterministic(
        states in prop::collection::vec(path_state(), PATHS.len())
    ) {
        let (index, snapshot, manifest) = build_world(&states);
        let first = plan(&index, &snapshot, &manifest);
        let second = plan(&index, &snapshot, &manifest);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn every_planned_path_comes_from_an_input(
        states in prop::collection::vec(path_state(), PATHS.len())
    ) {
        let (index, snapshot, manifest) = build_world(&states);
        let actions = plan(&index, &snapshot, &manifest);

        for action in &actions {
            let path = action.path();
            let known = index.entries.contains_key(path)
                || snapshot.latest(path).is_some()
                || manifest.get(path).is_some();
            prop_assert!(known, "planned path {} from nowhere", path);
        }
    }

    #[test]
    fn agreement_with_manifest_plans_noop(
        content in prop::collection::vec(any::<u8>(), 1..8),
        ts in 1u64..20
    ) {
        let state = (
            Some(content.clone()),
            Some((content.clone(), ts)),
            Some((content, ts)),
        );
        let (index, snapshot, manifest) = build_world(&[state]);
        let actions = plan(&index, &snapshot, &manifest);

        prop_assert_eq!(actions.len(), 1);
        prop_assert_eq!(actions[0].kind(), ActionKind::NoOp);
    }

    #[test]
    fn one_sided_change_never_plans_conflict(
        content in prop::collection::vec(any::<u8>(), 1..8),
        edit in prop::collection::vec(any::<u8>(), 1..8),
        ts in 1u64..20
    ) {
        // Disk edited, store untouched since the manifest: rule 5 must
        // not fire (scenario C generalized).
        let state = (
            Some(edit),
            Some((content.clone(), ts)),
            Some((content, ts)),
        );
        let (index, snapshot, manifest) = build_world(&[state]);
        let actions = plan(&index, &snapshot, &manifest);

        prop_assert_eq!(actions.len(), 1);
        prop_assert_ne!(actions[0].kind(), ActionKind::Conflict);
    }
}
