use crate::objects::ObjString;
use crate::value::Value;

const MAX_LOAD_FACTOR: f64 = 0.75;

#[derive(Clone, Copy)]
struct Entry {
    key: *mut ObjString,
    value: Value,
}

impl Entry {
    fn empty() -> Entry {
        Entry { key: std::ptr::null_mut(), value: Value::Nil }
    }

    fn is_empty(&self) -> bool {
        self.key.is_null() && matches!(self.value, Value::Nil)
    }

    fn is_tombstone(&self) -> bool {
        self.key.is_null() && matches!(self.value, Value::Bool(true))
    }
}

/// Open-addressed hash map from interned-string identity to `Value`, keyed by
/// linear probing over a power-of-two capacity, per the spec's hash table design.
pub struct Table {
    count: usize,
    entries: Vec<Entry>,
}

impl Table {
    pub fn new() -> Table {
        Table { count: 0, entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Linear probe starting at `hash mod capacity`, returning the slot a key
    /// would occupy or be inserted at: first exact match, else first empty
    /// slot, preferring an earlier tombstone if one was passed along the way.
    fn find_entry_index(entries: &[Entry], capacity: usize, key: *mut ObjString) -> usize {
        let hash = unsafe { (*key).hash };
        let mask = capacity - 1;
        let mut index = (hash as usize) & mask;
        let mut tombstone: Option<usize> = None;
        loop {
            let entry = &entries[index];
            if entry.key.is_null() {
                if entry.is_tombstone() {
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                } else {
                    return tombstone.unwrap_or(index);
                }
            } else if std::ptr::eq(entry.key, key) {
                return index;
            }
            index = (index + 1) & mask;
        }
    }

    fn grow_capacity(&mut self) {
        let new_capacity = if self.capacity() < 8 { 8 } else { self.capacity() * 2 };
        let mut new_entries = vec![Entry::empty(); new_capacity];
        self.count = 0;
        for entry in self.entries.iter() {
            if entry.key.is_null() {
                continue;
            }
            let index = Self::find_entry_index(&new_entries, new_capacity, entry.key);
            new_entries[index] = *entry;
            self.count += 1;
        }
        self.entries = new_entries;
    }

    /// Inserts or overwrites `key -> value`. Returns `true` iff this created a
    /// brand-new entry (as opposed to overwriting an existing key).
    pub fn set(&mut self, key: *mut ObjString, value: Value) -> bool {
        if (self.count + 1) as f64 > self.capacity() as f64 * MAX_LOAD_FACTOR {
            self.grow_capacity();
        }
        let index = Self::find_entry_index(&self.entries, self.capacity(), key);
        let entry = &mut self.entries[index];
        let is_new_key = entry.key.is_null();
        if is_new_key && entry.is_empty() {
            self.count += 1;
        }
        entry.key = key;
        entry.value = value;
        is_new_key
    }

    pub fn get(&self, key: *mut ObjString) -> Option<Value> {
        if self.count == 0 {
            return None;
        }
        let index = Self::find_entry_index(&self.entries, self.capacity(), key);
        let entry = &self.entries[index];
        if entry.key.is_null() {
            None
        } else {
            Some(entry.value)
        }
    }

    pub fn contains(&self, key: *mut ObjString) -> bool {
        self.get(key).is_some()
    }

    /// Converts an occupied slot into a tombstone rather than an empty slot,
    /// so later probes that passed through it still find entries beyond it.
    pub fn delete(&mut self, key: *mut ObjString) -> bool {
        if self.count == 0 {
            return false;
        }
        let index = Self::find_entry_index(&self.entries, self.capacity(), key);
        let entry = &mut self.entries[index];
        if entry.key.is_null() {
            return false;
        }
        entry.key = std::ptr::null_mut();
        entry.value = Value::Bool(true);
        true
    }

    /// Copies every occupied entry of `self` into `dest`, used by `INHERIT`.
    pub fn add_all(&self, dest: &mut Table) {
        for entry in self.entries.iter() {
            if !entry.key.is_null() {
                dest.set(entry.key, entry.value);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (*mut ObjString, Value)> + '_ {
        self.entries.iter().filter(|e| !e.key.is_null()).map(|e| (e.key, e.value))
    }

    /// Interning-specific lookup: compares by content (length + hash + bytes)
    /// rather than pointer identity, since this is exactly how a fresh,
    /// not-yet-interned string checks whether a canonical copy already exists.
    /// Must still skip tombstones to keep probe chains intact.
    pub fn find_string(&self, chars: &str, hash: u32) -> Option<*mut ObjString> {
        if self.count == 0 {
            return None;
        }
        let mask = self.capacity() - 1;
        let mut index = (hash as usize) & mask;
        loop {
            let entry = &self.entries[index];
            if entry.key.is_null() {
                if !entry.is_tombstone() {
                    return None;
                }
            } else {
                let candidate = unsafe { &*entry.key };
                if candidate.hash == hash && candidate.chars == chars {
                    return Some(entry.key);
                }
            }
            index = (index + 1) & mask;
        }
    }

    /// Removes every entry whose key is an unmarked string, breaking the
    /// intern table's otherwise-strong reference to its keys so the GC can
    /// collect interned strings nothing else still reaches.
    pub fn remove_unmarked_keys(&mut self) {
        for entry in self.entries.iter_mut() {
            if entry.key.is_null() {
                continue;
            }
            let marked = unsafe { (*entry.key).object.marked };
            if !marked {
                entry.key = std::ptr::null_mut();
                entry.value = Value::Bool(true);
            }
        }
    }
}

impl Default for Table {
    fn default() -> Self {
        Table::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::object_manager::ObjectManager;

    #[test]
    fn set_get_delete_roundtrip() {
        let mut manager = ObjectManager::new();
        let mut table = Table::new();
        let key = manager.alloc_string("answer".to_string());
        assert!(table.set(key, Value::Number(42.0)));
        assert_eq!(table.get(key), Some(Value::Number(42.0)));
        assert!(!table.set(key, Value::Number(43.0)), "overwrite is not a new key");
        assert_eq!(table.get(key), Some(Value::Number(43.0)));
        assert!(table.delete(key));
        assert_eq!(table.get(key), None);
    }

    #[test]
    fn tombstones_preserve_probe_chains() {
        let mut manager = ObjectManager::new();
        let mut table = Table::new();
        let a = manager.alloc_string("a".to_string());
        let b = manager.alloc_string("b".to_string());
        table.set(a, Value::Number(1.0));
        table.set(b, Value::Number(2.0));
        table.delete(a);
        assert_eq!(table.get(b), Some(Value::Number(2.0)));
    }

    #[test]
    fn grows_under_load_factor() {
        let mut manager = ObjectManager::new();
        let mut table = Table::new();
        for i in 0..100 {
            let key = manager.alloc_string(format!("k{i}"));
            table.set(key, Value::Number(i as f64));
        }
        assert_eq!(table.len(), 100);
    }

    #[test]
    fn find_string_matches_by_content() {
        let mut manager = ObjectManager::new();
        let mut table = Table::new();
        let key = manager.alloc_string("hello".to_string());
        table.set(key, Value::Nil);
        let hash = unsafe { (*key).hash };
        assert_eq!(table.find_string("hello", hash), Some(key));
        assert_eq!(table.find_string("world", hash), None);
    }
}
