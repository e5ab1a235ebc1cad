//! Keyed Registry
//!
//! Options such as AOV shaders and outputs are set one key at a time but
//! handed to the renderer as a single array. [`KeyedRegistry`] holds them
//! by key and flattens them in order of first insertion.

/// Keyed, insertion-ordered registry.
///
/// Setting an existing key replaces its value in place, so the order of
/// first insertion is preserved. Flattening yields values in that order.
#[derive(Debug, Clone)]
pub struct KeyedRegistry<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for KeyedRegistry<V> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<V> KeyedRegistry<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces `key`, returning the previous value.
    pub fn set(&mut self, key: &str, value: V) -> Option<V> {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key.to_string(), value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Values mapped through `f`, in order of first insertion.
    pub fn flatten<T>(&self, f: impl FnMut(&V) -> T) -> Vec<T> {
        self.values().map(f).collect()
    }

    /// Removes every entry, returning the values.
    pub fn drain(&mut self) -> Vec<V> {
        self.entries.drain(..).map(|(_, v)| v).collect()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_preserves_order() {
        let mut registry = KeyedRegistry::new();
        registry.set("test", 1);
        registry.set("test2", 2);
        assert_eq!(registry.flatten(|v| *v), vec![1, 2]);

        assert_eq!(registry.set("test", 3), Some(1));
        assert_eq!(registry.flatten(|v| *v), vec![3, 2]);

        assert_eq!(registry.remove("test"), Some(3));
        assert_eq!(registry.flatten(|v| *v), vec![2]);
        registry.remove("test2");
        assert!(registry.is_empty());
    }
}
