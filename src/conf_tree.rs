//! ConfTree: arena-backed configuration tree and its query API.
//!
//! Entries and sibling lists live in two `SlotMap`s and refer to each other
//! by id: an entry names the list it sits in (`parent`), a section names its
//! `children` list, and a list names the section that owns it (`None` for
//! the root). Ids are generational, so a lookup through an id whose entry
//! was destroyed yields `None` rather than a different entry.
//!
//! Searches walk the tree in document pre-order: an entry, then (when the
//! query recurses) its subtree, then its next sibling.

use crate::error::ConfError;
use core::fmt;
use core::ops::Index;
use core::str::FromStr;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Stable handle to one `ConfEntry`.
    pub struct EntryId;
    /// Stable handle to one `ConfList`.
    pub struct ListId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Section,
    Leaf,
}

#[derive(Debug, Clone)]
pub struct ConfEntry {
    name: String,
    value: Option<String>,
    children: Option<ListId>,
    parent: ListId,
    // Position within `parent`. Lists only grow or empty wholesale, so this
    // never goes stale.
    index: usize,
}

impl ConfEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Leaf payload, or the trailing token of a section header.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn kind(&self) -> EntryKind {
        if self.children.is_some() {
            EntryKind::Section
        } else {
            EntryKind::Leaf
        }
    }

    pub fn is_section(&self) -> bool {
        self.children.is_some()
    }

    pub fn children(&self) -> Option<ListId> {
        self.children
    }

    /// The list this entry is linked into.
    pub fn parent(&self) -> ListId {
        self.parent
    }
}

/// Ordered siblings. Order is document order and drives search order.
#[derive(Debug, Clone, Default)]
pub struct ConfList {
    entries: Vec<EntryId>,
    owner: Option<EntryId>,
}

impl ConfList {
    pub fn entries(&self) -> &[EntryId] {
        &self.entries
    }

    /// The section whose children this is; `None` for the root list.
    pub fn owner(&self) -> Option<EntryId> {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Search criteria shared by every `find*` call.
///
/// Names (and values, when filtered) compare ASCII-case-insensitively
/// unless `case_sensitive` is set. Only direct children of the searched
/// list are eligible unless `recursive` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query<'q> {
    name: &'q str,
    value: Option<&'q str>,
    case_sensitive: bool,
    recurse: bool,
    kind: Option<EntryKind>,
}

impl<'q> Query<'q> {
    pub fn new(name: &'q str) -> Self {
        Self {
            name,
            value: None,
            case_sensitive: false,
            recurse: false,
            kind: None,
        }
    }

    /// Also require the entry's value to equal `value`.
    pub fn value(mut self, value: &'q str) -> Self {
        self.value = Some(value);
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    pub fn recursive(mut self) -> Self {
        self.recurse = true;
        self
    }

    pub fn is_recursive(&self) -> bool {
        self.recurse
    }

    fn of_kind(mut self, kind: EntryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    fn same(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }

    pub fn matches(&self, entry: &ConfEntry) -> bool {
        if !self.same(&entry.name, self.name) {
            return false;
        }
        if self.kind.is_some_and(|k| k != entry.kind()) {
            return false;
        }
        match self.value {
            None => true,
            Some(want) => entry.value().is_some_and(|v| self.same(v, want)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfTree {
    lists: SlotMap<ListId, ConfList>,
    entries: SlotMap<EntryId, ConfEntry>,
    root: ListId,
}

impl Default for ConfTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfTree {
    /// An empty tree: a root list with no entries.
    pub fn new() -> Self {
        let mut lists = SlotMap::with_key();
        let root = lists.insert(ConfList::default());
        Self {
            lists,
            entries: SlotMap::with_key(),
            root,
        }
    }

    pub fn root(&self) -> ListId {
        self.root
    }

    /// Total number of live entries at every depth.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, id: EntryId) -> Option<&ConfEntry> {
        self.entries.get(id)
    }

    pub fn list(&self, id: ListId) -> Option<&ConfList> {
        self.lists.get(id)
    }

    /// Append a leaf to `list`.
    pub fn push_leaf(&mut self, list: ListId, name: impl Into<String>, value: impl Into<String>) -> EntryId {
        self.push(list, name.into(), Some(value.into()))
    }

    /// Append a section to `list`; returns the section and its (empty)
    /// children list.
    pub fn push_section(
        &mut self,
        list: ListId,
        name: impl Into<String>,
        value: Option<String>,
    ) -> (EntryId, ListId) {
        let id = self.push(list, name.into(), value);
        let children = self.lists.insert(ConfList {
            entries: Vec::new(),
            owner: Some(id),
        });
        self.entries[id].children = Some(children);
        (id, children)
    }

    fn push(&mut self, list: ListId, name: String, value: Option<String>) -> EntryId {
        let index = self.lists[list].entries.len();
        let id = self.entries.insert(ConfEntry {
            name,
            value,
            children: None,
            parent: list,
            index,
        });
        self.lists[list].entries.push(id);
        id
    }

    /// Free every entry under `list`, children before their section, each
    /// exactly once. `list` itself stays valid and empty. Returns the number
    /// of entries freed.
    pub fn destroy_branch(&mut self, list: ListId) -> usize {
        let Some(l) = self.lists.get_mut(list) else {
            return 0;
        };
        let ids = std::mem::take(&mut l.entries);
        ids.into_iter().map(|id| self.destroy_entry(id)).sum()
    }

    fn destroy_entry(&mut self, id: EntryId) -> usize {
        let Some(children) = self.entries.get(id).map(|e| e.children) else {
            return 0;
        };
        let mut freed = 0;
        if let Some(c) = children {
            freed += self.destroy_branch(c);
            self.lists.remove(c);
        }
        if self.entries.remove(id).is_some() {
            freed += 1;
        }
        freed
    }

    fn next_sibling(&self, id: EntryId) -> Option<EntryId> {
        let e = self.entries.get(id)?;
        self.lists.get(e.parent)?.entries.get(e.index + 1).copied()
    }

    /// Whether `id` sits somewhere below `scope` (directly when `deep` is
    /// false).
    fn is_within(&self, scope: ListId, id: EntryId, deep: bool) -> bool {
        let mut cur = id;
        loop {
            let Some(parent) = self.entries.get(cur).map(|e| e.parent) else {
                return false;
            };
            if parent == scope {
                return true;
            }
            if !deep {
                return false;
            }
            match self.lists.get(parent).and_then(|l| l.owner) {
                Some(owner) => cur = owner,
                None => return false,
            }
        }
    }

    /// Pre-order successor of `id`, never leaving `scope`.
    fn successor(&self, scope: ListId, id: EntryId, recurse: bool) -> Option<EntryId> {
        if recurse {
            let children = self.entries.get(id)?.children;
            if let Some(first) = children.and_then(|c| self.lists.get(c)?.entries.first().copied()) {
                return Some(first);
            }
        }
        let mut cur = id;
        loop {
            if let Some(next) = self.next_sibling(cur) {
                return Some(next);
            }
            let parent = self.entries.get(cur)?.parent;
            if parent == scope || !recurse {
                return None;
            }
            cur = self.lists.get(parent)?.owner?;
        }
    }

    /// First entry under `list` matching `query`, in document pre-order.
    pub fn find(&self, list: ListId, query: &Query<'_>) -> Option<EntryId> {
        self.find_next(list, query, None)
    }

    /// Next match strictly after `previous` in the same traversal order;
    /// `None` starts from the beginning.
    pub fn find_next(
        &self,
        list: ListId,
        query: &Query<'_>,
        previous: Option<EntryId>,
    ) -> Option<EntryId> {
        let mut cur = match previous {
            None => self.lists.get(list)?.entries.first().copied(),
            Some(p) => {
                if !self.is_within(list, p, query.recurse) {
                    return None;
                }
                self.successor(list, p, query.recurse)
            }
        };
        while let Some(id) = cur {
            if query.matches(&self.entries[id]) {
                return Some(id);
            }
            cur = self.successor(list, id, query.recurse);
        }
        None
    }

    /// Iterator over every match, equivalent to repeated `find_next`.
    pub fn matches<'t, 'q>(&'t self, list: ListId, query: Query<'q>) -> Matches<'t, 'q> {
        Matches {
            tree: self,
            list,
            query,
            prev: None,
            done: false,
        }
    }

    /// Children of the first section matching `query`.
    pub fn find_list(&self, list: ListId, query: &Query<'_>) -> Option<ListId> {
        self.find_list_next(list, query, None)
    }

    /// Children of the next matching section after the one owning
    /// `previous`.
    pub fn find_list_next(
        &self,
        list: ListId,
        query: &Query<'_>,
        previous: Option<ListId>,
    ) -> Option<ListId> {
        let after = match previous {
            None => None,
            Some(p) => Some(self.lists.get(p)?.owner?),
        };
        let q = query.of_kind(EntryKind::Section);
        let id = self.find_next(list, &q, after)?;
        self.entries[id].children
    }

    /// Value of the first leaf matching `query`. A name that only matches
    /// sections yields `None`.
    pub fn find_entry(&self, list: ListId, query: &Query<'_>) -> Option<&str> {
        self.find_entry_next(list, query, None).map(|(_, v)| v)
    }

    /// Next matching leaf after `previous`, with its id so enumeration can
    /// continue.
    pub fn find_entry_next(
        &self,
        list: ListId,
        query: &Query<'_>,
        previous: Option<EntryId>,
    ) -> Option<(EntryId, &str)> {
        let q = query.of_kind(EntryKind::Leaf);
        let id = self.find_next(list, &q, previous)?;
        Some((id, self.entries[id].value()?))
    }

    /// Parse the first matching leaf's value as `T`.
    pub fn find_parsed<T: FromStr>(
        &self,
        list: ListId,
        query: &Query<'_>,
    ) -> Result<Option<T>, ConfError> {
        match self.find_entry(list, query) {
            None => Ok(None),
            Some(v) => v.parse().map(Some).map_err(|_| ConfError::InvalidValue {
                name: query.name.to_string(),
                value: v.to_string(),
            }),
        }
    }

    /// yes/no, on/off, true/false, 1/0.
    pub fn find_bool(&self, list: ListId, query: &Query<'_>) -> Result<Option<bool>, ConfError> {
        let Some(v) = self.find_entry(list, query) else {
            return Ok(None);
        };
        const TRUE: [&str; 4] = ["yes", "on", "true", "1"];
        const FALSE: [&str; 4] = ["no", "off", "false", "0"];
        if TRUE.iter().any(|t| t.eq_ignore_ascii_case(v)) {
            Ok(Some(true))
        } else if FALSE.iter().any(|f| f.eq_ignore_ascii_case(v)) {
            Ok(Some(false))
        } else {
            Err(ConfError::InvalidValue {
                name: query.name.to_string(),
                value: v.to_string(),
            })
        }
    }

    /// Tree-shaped dump of `list` for diagnostics.
    pub fn display(&self, list: ListId) -> TreeDisplay<'_> {
        TreeDisplay { tree: self, list }
    }
}

impl Index<EntryId> for ConfTree {
    type Output = ConfEntry;

    fn index(&self, id: EntryId) -> &ConfEntry {
        &self.entries[id]
    }
}

impl Index<ListId> for ConfTree {
    type Output = ConfList;

    fn index(&self, id: ListId) -> &ConfList {
        &self.lists[id]
    }
}

pub struct Matches<'t, 'q> {
    tree: &'t ConfTree,
    list: ListId,
    query: Query<'q>,
    prev: Option<EntryId>,
    done: bool,
}

impl Iterator for Matches<'_, '_> {
    type Item = EntryId;

    fn next(&mut self) -> Option<EntryId> {
        if self.done {
            return None;
        }
        let found = self.tree.find_next(self.list, &self.query, self.prev);
        self.done = found.is_none();
        self.prev = found;
        found
    }
}

pub struct TreeDisplay<'t> {
    tree: &'t ConfTree,
    list: ListId,
}

impl TreeDisplay<'_> {
    fn write_list(&self, f: &mut fmt::Formatter<'_>, list: ListId, depth: usize) -> fmt::Result {
        let Some(l) = self.tree.lists.get(list) else {
            return Ok(());
        };
        for &id in &l.entries {
            let e = &self.tree.entries[id];
            for _ in 0..depth {
                f.write_str("| ")?;
            }
            match (e.children, e.value()) {
                (None, v) => writeln!(f, "-> {} = '{}'", e.name, v.unwrap_or_default())?,
                (Some(c), None) => {
                    writeln!(f, "->[{}]", e.name)?;
                    self.write_list(f, c, depth + 1)?;
                }
                (Some(c), Some(v)) => {
                    writeln!(f, "->[{} {}]", e.name, v)?;
                    self.write_list(f, c, depth + 1)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for TreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_list(f, self.list, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// server { name hub; port 6667; class { name users; }; };
    /// server leaf { name leaf; };
    /// name top;
    fn sample() -> ConfTree {
        let mut t = ConfTree::new();
        let root = t.root();
        let (_, s1) = t.push_section(root, "server", None);
        t.push_leaf(s1, "name", "hub");
        t.push_leaf(s1, "port", "6667");
        let (_, class) = t.push_section(s1, "class", None);
        t.push_leaf(class, "name", "users");
        let (_, s2) = t.push_section(root, "server", Some("leaf".into()));
        t.push_leaf(s2, "name", "leaf");
        t.push_leaf(root, "name", "top");
        t
    }

    fn values(t: &ConfTree, ids: impl Iterator<Item = EntryId>) -> Vec<String> {
        ids.map(|id| t[id].value().unwrap_or("-").to_string()).collect()
    }

    /// Invariant: non-recursive search only sees direct children.
    #[test]
    fn non_recursive_sees_direct_children() {
        let t = sample();
        let q = Query::new("name");
        let id = t.find(t.root(), &q).unwrap();
        assert_eq!(t[id].value(), Some("top"));
        assert!(t.find(t.root(), &Query::new("port")).is_none());
    }

    /// Invariant: recursive enumeration is document pre-order, each match once.
    #[test]
    fn recursive_enumeration_is_preorder() {
        let t = sample();
        let got = values(&t, t.matches(t.root(), Query::new("name").recursive()));
        assert_eq!(got, ["hub", "users", "leaf", "top"]);
    }

    #[test]
    fn find_next_walks_and_terminates() {
        let t = sample();
        let q = Query::new("NAME").recursive();
        let mut prev = None;
        let mut seen = Vec::new();
        while let Some(id) = t.find_next(t.root(), &q, prev) {
            seen.push(t[id].value().unwrap().to_string());
            prev = Some(id);
        }
        assert_eq!(seen, ["hub", "users", "leaf", "top"]);
        assert!(t.find_next(t.root(), &q, prev).is_none());
    }

    /// Invariant: a matching section is itself a match and its subtree
    /// follows it in the traversal.
    #[test]
    fn nested_same_name_sections() {
        let mut t = ConfTree::new();
        let root = t.root();
        let (outer, inner_list) = t.push_section(root, "block", Some("outer".into()));
        let (inner, _) = t.push_section(inner_list, "block", Some("inner".into()));
        let (last, _) = t.push_section(root, "block", Some("last".into()));

        let q = Query::new("block").recursive();
        let all: Vec<_> = t.matches(root, q).collect();
        assert_eq!(all, vec![outer, inner, last]);

        let shallow: Vec<_> = t.matches(root, Query::new("block")).collect();
        assert_eq!(shallow, vec![outer, last]);
    }

    #[test]
    fn case_sensitivity_is_per_query() {
        let t = sample();
        assert!(t.find(t.root(), &Query::new("SERVER")).is_some());
        assert!(t.find(t.root(), &Query::new("SERVER").case_sensitive()).is_none());
        assert!(t.find(t.root(), &Query::new("server").case_sensitive()).is_some());
    }

    #[test]
    fn value_filter() {
        let t = sample();
        let id = t.find(t.root(), &Query::new("server").value("LEAF")).unwrap();
        assert_eq!(t[id].value(), Some("leaf"));
        assert!(t
            .find(t.root(), &Query::new("server").value("LEAF").case_sensitive())
            .is_none());
        // The valueless first section never matches a value filter.
        let ids: Vec<_> = t.matches(t.root(), Query::new("server").value("leaf")).collect();
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn find_list_and_next() {
        let t = sample();
        let q = Query::new("server");
        let first = t.find_list(t.root(), &q).unwrap();
        assert_eq!(t.find_entry(first, &Query::new("port")), Some("6667"));
        let second = t.find_list_next(t.root(), &q, Some(first)).unwrap();
        assert_eq!(t.find_entry(second, &Query::new("name")), Some("leaf"));
        assert!(t.find_list_next(t.root(), &q, Some(second)).is_none());
    }

    /// Invariant: leaves with the name of a section are skipped by
    /// `find_list`, and sections are skipped by `find_entry`.
    #[test]
    fn kind_restricted_searches() {
        let mut t = ConfTree::new();
        let root = t.root();
        t.push_leaf(root, "options", "inline");
        let (_, opts) = t.push_section(root, "options", None);
        t.push_leaf(opts, "debug", "yes");

        let list = t.find_list(root, &Query::new("options")).unwrap();
        assert_eq!(list, opts);
        assert_eq!(t.find_entry(root, &Query::new("options")), Some("inline"));

        let mut only_section = ConfTree::new();
        let r = only_section.root();
        only_section.push_section(r, "modules", None);
        assert!(only_section.find(r, &Query::new("modules")).is_some());
        assert_eq!(only_section.find_entry(r, &Query::new("modules")), None);
    }

    #[test]
    fn find_entry_next_enumerates_leaves() {
        let t = sample();
        let q = Query::new("name").recursive();
        let mut prev = None;
        let mut got = Vec::new();
        while let Some((id, v)) = t.find_entry_next(t.root(), &q, prev) {
            got.push(v.to_string());
            prev = Some(id);
        }
        assert_eq!(got, ["hub", "users", "leaf", "top"]);
    }

    /// Invariant: a `previous` outside the searched list yields not-found.
    #[test]
    fn previous_outside_scope() {
        let t = sample();
        let top = t.find(t.root(), &Query::new("name")).unwrap();
        let s1 = t.find_list(t.root(), &Query::new("server")).unwrap();
        assert!(t.find_next(s1, &Query::new("name"), Some(top)).is_none());
    }

    #[test]
    fn typed_lookups() {
        let mut t = ConfTree::new();
        let root = t.root();
        t.push_leaf(root, "port", "6667");
        t.push_leaf(root, "debug", "On");
        t.push_leaf(root, "flood", "maybe");
        assert_eq!(t.find_parsed::<u16>(root, &Query::new("port")).unwrap(), Some(6667));
        assert_eq!(t.find_parsed::<u16>(root, &Query::new("missing")).unwrap(), None);
        assert_eq!(t.find_bool(root, &Query::new("debug")).unwrap(), Some(true));
        assert!(matches!(
            t.find_bool(root, &Query::new("flood")),
            Err(ConfError::InvalidValue { .. })
        ));
        assert!(t.find_parsed::<u8>(root, &Query::new("port")).is_err());
    }

    /// Invariant: destroy frees each entry once and empties the list.
    #[test]
    fn destroy_branch_counts_entries() {
        let mut t = sample();
        assert_eq!(t.len(), 8);
        let s1 = t.find_list(t.root(), &Query::new("server")).unwrap();
        let class = t.find(s1, &Query::new("class")).unwrap();
        let class_list = t[class].children().unwrap();

        assert_eq!(t.destroy_branch(s1), 4);
        assert!(t.list(s1).unwrap().is_empty());
        assert!(t.entry(class).is_none());
        assert!(t.list(class_list).is_none());
        assert_eq!(t.len(), 4);

        let root = t.root();
        assert_eq!(t.destroy_branch(root), 4);
        assert!(t.is_empty());
        assert_eq!(t.destroy_branch(root), 0);
        assert_eq!(t.destroy_branch(class_list), 0);
    }

    #[test]
    fn parents_resolve() {
        let t = sample();
        let root = t.root();
        assert_eq!(t[root].owner(), None);
        for id in t.matches(root, Query::new("name").recursive()) {
            let parent = t[id].parent();
            assert!(t[parent].entries().contains(&id));
            if parent != root {
                let owner = t[parent].owner().unwrap();
                assert_eq!(t[owner].children(), Some(parent));
            }
        }
    }

    /// Invariant: stepping to the next sibling is constant time, so a full
    /// scan of a wide list stays linear.
    #[test]
    fn wide_flat_list_scans_linearly() {
        const N: usize = 50_000;
        let mut t = ConfTree::new();
        let root = t.root();
        for i in 0..N {
            t.push_leaf(root, "port", i.to_string());
        }
        t.push_leaf(root, "last", "yes");

        assert!(t.find(root, &Query::new("missing")).is_none());
        assert_eq!(t.find_entry(root, &Query::new("last")), Some("yes"));
        assert_eq!(t.matches(root, Query::new("port")).count(), N);
        assert_eq!(t.matches(root, Query::new("port").recursive()).count(), N);

        let ids = t[root].entries();
        for (i, &id) in ids.iter().enumerate().step_by(997) {
            assert_eq!(t[id].index, i);
            assert_eq!(t.next_sibling(id), ids.get(i + 1).copied());
        }
    }

    #[test]
    fn display_tree() {
        let t = sample();
        let out = t.display(t.root()).to_string();
        let expected = "\
->[server]
| -> name = 'hub'
| -> port = '6667'
| ->[class]
| | -> name = 'users'
->[server leaf]
| -> name = 'leaf'
-> name = 'top'
";
        assert_eq!(out, expected);
    }
}
