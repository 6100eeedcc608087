//! The authoritative set of selected equipment ids.

use std::collections::HashSet;

/// Ordered, duplicate-free set of selected ids.
///
/// Iteration follows insertion order so exports and routes built from the
/// selection are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    order: Vec<String>,
    members: HashSet<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union with `ids`. Returns how many were new.
    pub fn add<I, S>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for id in ids {
            let id = id.into();
            if self.members.insert(id.clone()) {
                self.order.push(id);
                added += 1;
            }
        }
        added
    }

    /// Flip membership of `id`. Returns whether it is now selected.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.members.remove(id) {
            self.order.retain(|x| x != id);
            false
        } else {
            self.members.insert(id.to_string());
            self.order.push(id.to_string());
            true
        }
    }

    /// Remove `ids`. Returns how many were present.
    pub fn remove<I, S>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let before = self.order.len();
        for id in ids {
            self.members.remove(id.as_ref());
        }
        self.order.retain(|x| self.members.contains(x));
        before - self.order.len()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    /// Replace the whole selection with `ids`.
    pub fn replace<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clear();
        self.add(ids);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.order.clone()
    }
}
