//! Disjoint-set grouping of matched nodes.

use std::collections::HashMap;

/// String-keyed union-find with path compression.
///
/// The parent map is mutated during `find` and `union`; an instance is owned
/// by a single merge call and never shared across threads.
#[derive(Debug, Default)]
pub struct UnionFind {
    parent: HashMap<String, String>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a key exists as its own singleton set
    pub fn insert(&mut self, key: &str) {
        self.parent
            .entry(key.to_string())
            .or_insert_with(|| key.to_string());
    }

    /// The representative of a key's set, compressing the path walked.
    ///
    /// Unknown keys are inserted as singletons first.
    pub fn find(&mut self, key: &str) -> String {
        self.insert(key);

        let mut root = key.to_string();
        while self.parent[&root] != root {
            root = self.parent[&root].clone();
        }

        // Second pass: point every node on the walked path at the root.
        let mut current = key.to_string();
        while self.parent[&current] != root {
            let next = self.parent[&current].clone();
            self.parent.insert(current, root.clone());
            current = next;
        }

        root
    }

    /// Merge the sets containing the two keys
    pub fn union(&mut self, a: &str, b: &str) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            self.parent.insert(root_b, root_a);
        }
    }

    /// Group all known keys by their set representative
    pub fn groups(&mut self) -> HashMap<String, Vec<String>> {
        let keys: Vec<String> = self.parent.keys().cloned().collect();
        let mut groups: HashMap<String, Vec<String>> = HashMap::new();
        for key in keys {
            let root = self.find(&key);
            groups.entry(root).or_default().push(key);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitive_closure() {
        let mut uf = UnionFind::new();
        uf.union("a", "b");
        uf.union("b", "c");

        assert_eq!(uf.find("a"), uf.find("c"));
        let groups = uf.groups();
        let group = groups.values().find(|g| g.len() == 3).unwrap();
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn test_disjoint_sets_stay_apart() {
        let mut uf = UnionFind::new();
        uf.union("a", "b");
        uf.union("x", "y");

        assert_ne!(uf.find("a"), uf.find("x"));
        assert_eq!(uf.groups().len(), 2);
    }

    #[test]
    fn test_singleton() {
        let mut uf = UnionFind::new();
        uf.insert("lonely");
        assert_eq!(uf.find("lonely"), "lonely");
    }
}
