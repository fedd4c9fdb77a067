//! Client-held, identifier-keyed collections and their filtered views.

use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;

/// An entity with a stable upstream identifier (`_id`).
pub trait Identified {
    fn id(&self) -> &str;
}

/// An entity the view layer can search. `term` is already lower-cased and non-empty.
pub trait Searchable {
    fn matches(&self, term: &str) -> bool;
}

/// Ordered sequence of entities with unique identifiers.
///
/// Insertion order is the implicit recency order. Filtered views are always
/// derived from the collection, never stored.
#[derive(Debug, Clone)]
pub struct DomainCollection<T> {
    items: Vec<T>,
    ids: HashSet<String>,
}

impl<T> Default for DomainCollection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            ids: HashSet::new(),
        }
    }
}

impl<T: Identified> DomainCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection, keeping the first occurrence of any repeated id.
    pub fn from_items(items: Vec<T>) -> Self {
        let mut collection = Self::new();
        collection.replace_all(items);
        collection
    }

    /// Appends at the end unless the id is already present.
    /// Returns whether the entity was inserted.
    pub fn append_if_absent(&mut self, item: T) -> bool {
        if self.ids.contains(item.id()) {
            return false;
        }
        self.ids.insert(item.id().to_string());
        self.items.push(item);
        true
    }

    /// Replaces the whole collection with an authoritative result.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items.clear();
        self.ids.clear();
        for item in items {
            self.append_if_absent(item);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Identified + Searchable> DomainCollection<T> {
    /// Entities matching `search_term` (case-insensitive), in collection order.
    /// A blank term matches everything.
    pub fn filtered(&self, search_term: &str) -> Vec<&T> {
        let term = search_term.trim().to_lowercase();
        if term.is_empty() {
            return self.items.iter().collect();
        }
        self.items.iter().filter(|item| item.matches(&term)).collect()
    }
}

/// A collection shared between the live channel's handlers and the view that
/// renders it. Every mutation bumps a revision the view can wait on.
#[derive(Debug)]
pub struct SharedCollection<T> {
    inner: Arc<RwLock<DomainCollection<T>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl<T> Clone for SharedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            revision: Arc::clone(&self.revision),
        }
    }
}

impl<T: Identified> Default for SharedCollection<T> {
    fn default() -> Self {
        Self::new(DomainCollection::new())
    }
}

impl<T: Identified> SharedCollection<T> {
    pub fn new(collection: DomainCollection<T>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(collection)),
            revision: Arc::new(revision),
        }
    }

    pub fn append_if_absent(&self, item: T) -> bool {
        let inserted = self.inner.write().append_if_absent(item);
        if inserted {
            self.bump();
        }
        inserted
    }

    pub fn replace_all(&self, items: Vec<T>) {
        self.inner.write().replace_all(items);
        self.bump();
    }

    /// Runs `f` against the current contents under a read lock.
    pub fn read<R>(&self, f: impl FnOnce(&DomainCollection<T>) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().contains(id)
    }

    /// Number of mutations applied so far.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// A receiver that wakes whenever the collection changes.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

impl<T: Identified + Clone> SharedCollection<T> {
    pub fn snapshot(&self) -> DomainCollection<T> {
        self.inner.read().clone()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct Item {
        pub id: String,
        pub label: String,
    }

    impl Item {
        pub fn new(id: &str, label: &str) -> Self {
            Self {
                id: id.to_string(),
                label: label.to_string(),
            }
        }
    }

    impl Identified for Item {
        fn id(&self) -> &str {
            &self.id
        }
    }

    impl Searchable for Item {
        fn matches(&self, term: &str) -> bool {
            self.label.to_lowercase().contains(term)
        }
    }

    #[test]
    fn append_if_absent_is_idempotent() {
        let mut collection = DomainCollection::new();
        assert!(collection.append_if_absent(Item::new("u42", "Ada")));
        assert!(!collection.append_if_absent(Item::new("u42", "Ada again")));

        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get("u42").unwrap().label, "Ada");
    }

    #[test]
    fn append_goes_to_the_end() {
        let mut collection =
            DomainCollection::from_items(vec![Item::new("a", "A"), Item::new("b", "B")]);
        collection.append_if_absent(Item::new("c", "C"));

        let ids: Vec<_> = collection.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn from_items_keeps_first_occurrence_of_repeated_ids() {
        let collection = DomainCollection::from_items(vec![
            Item::new("a", "first"),
            Item::new("a", "second"),
        ]);
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.items()[0].label, "first");
    }

    #[test]
    fn filtered_is_case_insensitive_and_blank_matches_all() {
        let collection = DomainCollection::from_items(vec![
            Item::new("a", "Welcome Week"),
            Item::new("b", "Maintenance"),
        ]);

        assert_eq!(collection.filtered("").len(), 2);
        assert_eq!(collection.filtered("   ").len(), 2);
        let hits = collection.filtered("WELCOME");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }

    #[test]
    fn filtered_view_follows_the_source_collection() {
        let mut collection = DomainCollection::from_items(vec![Item::new("a", "alpha")]);
        assert_eq!(collection.filtered("al").len(), 1);

        collection.append_if_absent(Item::new("b", "alpine"));

        assert_eq!(collection.filtered("al").len(), 2);
    }

    #[test]
    fn shared_collection_bumps_revision_only_on_change() {
        let shared = SharedCollection::default();
        assert_eq!(shared.revision(), 0);

        assert!(shared.append_if_absent(Item::new("a", "A")));
        assert!(!shared.append_if_absent(Item::new("a", "A")));
        assert_eq!(shared.revision(), 1);

        shared.replace_all(vec![Item::new("b", "B")]);
        assert_eq!(shared.revision(), 2);
        assert!(!shared.contains("a"));
        assert_eq!(shared.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn changes_wakes_on_mutation() {
        let shared = SharedCollection::default();
        let mut changes = shared.changes();

        let writer = shared.clone();
        tokio::spawn(async move {
            writer.append_if_absent(Item::new("a", "A"));
        });

        changes.changed().await.unwrap();
        assert_eq!(*changes.borrow(), 1);
        assert!(shared.contains("a"));
    }
}
