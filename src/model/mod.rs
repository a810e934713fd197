//! Launchable entry tree
//!
//! Entries are either launchable leaves or folders owning an ordered list of
//! children. The tree is built once per data reload (storage order applied,
//! then pagination folding on top) and treated as immutable afterwards;
//! overlay sessions hold a shared snapshot for their whole lifetime.

pub mod pagination;

/// Stable entry identifier. Persisted entries carry positive ids; virtual
/// folders synthesized by pagination use negative ids so they can never
/// collide with stored ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub i64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum EntryKind {
    /// Launchable leaf; `target` is the command resolved at store time
    Launch { target: String },
    /// User-created folder
    Folder { children: Vec<Entry> },
    /// Folder synthesized by pagination to hold overflow entries
    VirtualFolder { children: Vec<Entry> },
}

/// One node of the launcher content tree
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: EntryId,
    pub name: String,
    /// Icon name or path, resolved lazily through the icon cache
    pub icon: Option<String>,
    /// Tint the selection indicator from the icon's dominant color
    pub use_icon_color: bool,
    pub kind: EntryKind,
}

impl Entry {
    pub fn is_folder(&self) -> bool {
        matches!(
            self.kind,
            EntryKind::Folder { .. } | EntryKind::VirtualFolder { .. }
        )
    }

    /// Children of a folder entry, None for leaves
    pub fn children(&self) -> Option<&[Entry]> {
        match &self.kind {
            EntryKind::Folder { children } | EntryKind::VirtualFolder { children } => {
                Some(children)
            }
            EntryKind::Launch { .. } => None,
        }
    }

    /// Launch command of a leaf entry, None for folders
    pub fn launch_target(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Launch { target } => Some(target),
            _ => None,
        }
    }
}

/// The paginated entry tree an overlay session works against
#[derive(Debug, Clone, Default)]
pub struct EntryTree {
    pub root: Vec<Entry>,
}

impl EntryTree {
    pub fn new(root: Vec<Entry>) -> Self {
        Self { root }
    }

    /// Depth-first lookup by id
    pub fn find(&self, id: EntryId) -> Option<&Entry> {
        fn find_in<'a>(entries: &'a [Entry], id: EntryId) -> Option<&'a Entry> {
            for entry in entries {
                if entry.id == id {
                    return Some(entry);
                }
                if let Some(children) = entry.children() {
                    if let Some(found) = find_in(children, id) {
                        return Some(found);
                    }
                }
            }
            None
        }
        find_in(&self.root, id)
    }
}

#[cfg(test)]
pub(crate) fn leaf(id: i64, name: &str) -> Entry {
    Entry {
        id: EntryId(id),
        name: name.to_string(),
        icon: None,
        use_icon_color: false,
        kind: EntryKind::Launch {
            target: format!("{}-cmd", name),
        },
    }
}

#[cfg(test)]
pub(crate) fn folder(id: i64, name: &str, children: Vec<Entry>) -> Entry {
    Entry {
        id: EntryId(id),
        name: name.to_string(),
        icon: None,
        use_icon_color: false,
        kind: EntryKind::Folder { children },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_descends_into_folders() {
        let tree = EntryTree::new(vec![
            leaf(1, "a"),
            folder(2, "f", vec![leaf(3, "b"), folder(4, "g", vec![leaf(5, "c")])]),
        ]);
        assert_eq!(tree.find(EntryId(5)).unwrap().name, "c");
        assert!(tree.find(EntryId(6)).is_none());
    }

    #[test]
    fn test_children_only_for_folders() {
        let e = leaf(1, "a");
        assert!(e.children().is_none());
        assert_eq!(e.launch_target(), Some("a-cmd"));

        let f = folder(2, "f", vec![leaf(3, "b")]);
        assert_eq!(f.children().unwrap().len(), 1);
        assert!(f.launch_target().is_none());
    }
}
