// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{HashMap, HashSet};

pub trait Named {
    fn name(&self) -> &str;
}

pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn names_equal(left: &str, right: &str) -> bool {
    name_key(left) == name_key(right)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Catalog<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Named> Catalog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(records: Vec<T>) -> Self {
        let mut catalog = Self::new();
        for record in records {
            catalog.upsert(record);
        }
        catalog
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.index
            .get(&name_key(name))
            .and_then(|position| self.items.get(*position))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name_key(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(Named::name)
    }

    pub fn upsert(&mut self, record: T) -> bool {
        let key = name_key(record.name());
        match self.index.get(&key) {
            Some(position) => {
                self.items[*position] = record;
                true
            }
            None => {
                self.index.insert(key, self.items.len());
                self.items.push(record);
                false
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<T> {
        let position = self.index.remove(&name_key(name))?;
        let removed = self.items.remove(position);
        self.reindex();
        Some(removed)
    }

    fn reindex(&mut self) {
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(position, item)| (name_key(item.name()), position))
            .collect();
    }
}

// Returns `proposed` (trimmed) when it does not collide case-insensitively with any existing
// name, else the first of `"<proposed> (1)"`, `"<proposed> (2)"`, ... that does not.
pub fn resolve_unique_name<'a, I>(proposed: &str, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let base = proposed.trim();
    let taken: HashSet<String> = existing.into_iter().map(name_key).collect();
    if !taken.contains(&name_key(base)) {
        return base.to_owned();
    }

    let mut counter: u64 = 1;
    loop {
        let candidate = format!("{base} ({counter})");
        if !taken.contains(&name_key(&candidate)) {
            return candidate;
        }
        counter += 1;
    }
}
