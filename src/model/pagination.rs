//! Entry pagination - folding overflow into virtual folders
//!
//! A lane can only show `max_visible` entries. When a sibling list is longer
//! than that, trailing entries are folded into one synthetic "virtual folder"
//! that takes the last visible slot, one position left of the true end so it
//! never collides with a fixed bottom anchor. Folding never reorders: the
//! visible prefix plus the virtual folder's contents reconstruct the stored
//! order exactly.

use crate::config::ConfigError;
use crate::model::{Entry, EntryId, EntryKind};

/// Hard cap on folder nesting. The store cannot express cycles (child lists
/// are owned), but a corrupted file could nest far beyond anything a lane can
/// present; recursion past this depth is a configuration error, not a crash.
pub const MAX_FOLDER_DEPTH: usize = 16;

/// Display name of synthesized overflow folders
const VIRTUAL_FOLDER_NAME: &str = "More";

/// Icon used for synthesized overflow folders
const VIRTUAL_FOLDER_ICON: &str = "folder";

/// Paginate a whole entry tree.
///
/// Every sibling list longer than `max_visible` is folded, and folding
/// recurses into all folder children - including the virtual folders it just
/// created, so arbitrarily long lists end up as a chain of "More" folders.
pub fn paginate(entries: Vec<Entry>, max_visible: usize) -> Result<Vec<Entry>, ConfigError> {
    if max_visible == 0 {
        return Err(ConfigError::ZeroPaginationCapacity);
    }
    let mut next_virtual_id = -1;
    paginate_level(entries, max_visible, 0, &mut next_virtual_id)
}

fn paginate_level(
    mut entries: Vec<Entry>,
    max_visible: usize,
    depth: usize,
    next_virtual_id: &mut i64,
) -> Result<Vec<Entry>, ConfigError> {
    if depth >= MAX_FOLDER_DEPTH {
        return Err(ConfigError::TreeTooDeep {
            limit: MAX_FOLDER_DEPTH,
        });
    }

    if entries.len() > max_visible {
        // Pull entries out at the slot just before the last visible row until
        // the virtual folder fits there; removal order is preserved.
        let mut overflow = Vec::new();
        while entries.len() >= max_visible {
            overflow.push(entries.remove(max_visible - 1));
        }
        let id = EntryId(*next_virtual_id);
        *next_virtual_id -= 1;
        entries.push(Entry {
            id,
            name: VIRTUAL_FOLDER_NAME.to_string(),
            icon: Some(VIRTUAL_FOLDER_ICON.to_string()),
            use_icon_color: false,
            kind: EntryKind::VirtualFolder { children: overflow },
        });
    }

    for entry in &mut entries {
        if let EntryKind::Folder { children } | EntryKind::VirtualFolder { children } =
            &mut entry.kind
        {
            let taken = std::mem::take(children);
            *children = paginate_level(taken, max_visible, depth + 1, next_virtual_id)?;
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{folder, leaf};

    fn ids(entries: &[Entry]) -> Vec<i64> {
        entries.iter().map(|e| e.id.0).collect()
    }

    #[test]
    fn test_short_list_unchanged() {
        let entries = vec![leaf(0, "e0"), leaf(1, "e1")];
        let result = paginate(entries, 4).unwrap();
        assert_eq!(ids(&result), vec![0, 1]);
    }

    #[test]
    fn test_exact_fit_unchanged() {
        let entries: Vec<Entry> = (0..4).map(|i| leaf(i, "e")).collect();
        let result = paginate(entries, 4).unwrap();
        assert_eq!(ids(&result), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_seven_entries_max_four() {
        // [e0,e1,e2,VF[e3,e4,e5,e6]]
        let entries: Vec<Entry> = (0..7).map(|i| leaf(i, "e")).collect();
        let result = paginate(entries, 4).unwrap();

        assert_eq!(result.len(), 4);
        assert_eq!(ids(&result[..3]), vec![0, 1, 2]);

        let vf = &result[3];
        assert!(matches!(vf.kind, EntryKind::VirtualFolder { .. }));
        assert_eq!(ids(vf.children().unwrap()), vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_round_trip_reconstructs_original_order() {
        let entries: Vec<Entry> = (0..23).map(|i| leaf(i, "e")).collect();
        let result = paginate(entries, 5).unwrap();
        assert_eq!(result.len(), 5);

        // Flatten the chain of virtual folders back into one list
        fn flatten(entries: &[Entry], out: &mut Vec<i64>) {
            for e in entries {
                match &e.kind {
                    EntryKind::VirtualFolder { children } => flatten(children, out),
                    _ => out.push(e.id.0),
                }
            }
        }
        let mut flat = Vec::new();
        flatten(&result, &mut flat);
        assert_eq!(flat, (0..23).collect::<Vec<i64>>());
    }

    #[test]
    fn test_idempotent_on_paginated_output() {
        let entries: Vec<Entry> = (0..7).map(|i| leaf(i, "e")).collect();
        let once = paginate(entries, 4).unwrap();
        let once_ids = ids(&once);
        // The output already fits, so paginating again leaves the top level
        // untouched (virtual ids restart but no new folding happens).
        let twice = paginate(once.clone(), 4).unwrap();
        assert_eq!(ids(&twice), once_ids);
        assert_eq!(
            ids(twice[3].children().unwrap()),
            ids(once[3].children().unwrap())
        );
    }

    #[test]
    fn test_recursion_into_user_folders() {
        let sub: Vec<Entry> = (10..20).map(|i| leaf(i, "s")).collect();
        let entries = vec![leaf(0, "e0"), folder(1, "f", sub)];
        let result = paginate(entries, 4).unwrap();

        let f = &result[1];
        let sub_result = f.children().unwrap();
        assert_eq!(sub_result.len(), 4);
        assert_eq!(ids(&sub_result[..3]), vec![10, 11, 12]);
        assert!(matches!(sub_result[3].kind, EntryKind::VirtualFolder { .. }));
    }

    #[test]
    fn test_nested_virtual_folders_for_long_lists() {
        // 10 entries at capacity 3: the overflow folder itself overflows
        let entries: Vec<Entry> = (0..10).map(|i| leaf(i, "e")).collect();
        let result = paginate(entries, 3).unwrap();
        assert_eq!(result.len(), 3);
        let vf = &result[2];
        let inner = vf.children().unwrap();
        assert_eq!(inner.len(), 3);
        assert!(matches!(inner[2].kind, EntryKind::VirtualFolder { .. }));
    }

    #[test]
    fn test_virtual_folder_ids_are_negative_and_unique() {
        let entries: Vec<Entry> = (0..10).map(|i| leaf(i, "e")).collect();
        let result = paginate(entries, 3).unwrap();

        fn collect_vf_ids(entries: &[Entry], out: &mut Vec<i64>) {
            for e in entries {
                if let EntryKind::VirtualFolder { children } = &e.kind {
                    out.push(e.id.0);
                    collect_vf_ids(children, out);
                }
            }
        }
        let mut vf_ids = Vec::new();
        collect_vf_ids(&result, &mut vf_ids);
        assert!(vf_ids.len() >= 2);
        assert!(vf_ids.iter().all(|&id| id < 0));
        let mut deduped = vf_ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), vf_ids.len());
    }

    #[test]
    fn test_zero_capacity_is_an_error() {
        let entries = vec![leaf(0, "e0")];
        let err = paginate(entries, 0).unwrap_err();
        assert_eq!(err, ConfigError::ZeroPaginationCapacity);
    }

    #[test]
    fn test_capacity_one_folds_everything() {
        let entries = vec![leaf(0, "e0"), leaf(1, "e1")];
        let result = paginate(entries, 1).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(ids(result[0].children().unwrap()), vec![0, 1]);
    }

    #[test]
    fn test_depth_guard_trips_on_runaway_nesting() {
        let mut entry = leaf(100, "deep");
        for i in 0..(MAX_FOLDER_DEPTH as i64 + 2) {
            entry = folder(i, "f", vec![entry]);
        }
        let err = paginate(vec![entry], 4).unwrap_err();
        assert!(matches!(err, ConfigError::TreeTooDeep { .. }));
    }
}
