use std::collections::HashMap;
use std::hash::Hash;

/// Memoizes the values produced by a factory function, keyed by its argument.
///
/// Asking twice for the same key yields clones of the same cached value, so
/// when `V` is an `Rc` or `Arc` every caller shares one instance.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
/// use mixtree_util::FactoryCache;
///
/// let mut cache = FactoryCache::new(|id: &String| Rc::new(id.to_uppercase()));
/// let a1 = cache.get("a".to_string());
/// let a2 = cache.get("a".to_string());
/// assert!(Rc::ptr_eq(&a1, &a2));
/// assert_eq!(*a1, "A");
/// ```
pub struct FactoryCache<K, V, F = fn(&K) -> V> {
    values: HashMap<K, V>,
    factory: F,
}

impl<K, V, F> FactoryCache<K, V, F>
where
    K: Eq + Hash,
    V: Clone,
    F: Fn(&K) -> V,
{
    /// Create an empty cache around `factory`.
    pub fn new(factory: F) -> Self {
        Self {
            values: HashMap::new(),
            factory,
        }
    }

    /// Return the cached value for `key`, creating it on first request.
    pub fn get(&mut self, key: K) -> V {
        let factory = &self.factory;
        self.values
            .entry(key)
            .or_insert_with_key(|k| factory(k))
            .clone()
    }

    /// Drop the cached value for `key`. The next `get` creates a fresh one.
    pub fn delete(&mut self, key: &K) -> Option<V> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over every cached value, in no particular order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.values.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug)]
    struct Probe {
        id: String,
    }

    #[test]
    fn test_same_key_returns_same_instance() {
        let mut cache = FactoryCache::new(|id: &String| Rc::new(Probe { id: id.clone() }));
        let a1 = cache.get("a".to_string());
        let a2 = cache.get("a".to_string());
        let b1 = cache.get("b".to_string());

        assert_eq!(a1.id, "a");
        assert!(Rc::ptr_eq(&a1, &a2));
        assert!(!Rc::ptr_eq(&a1, &b1));
        assert_eq!(b1.id, "b");
    }

    #[test]
    fn test_factory_runs_once_per_key() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut cache = FactoryCache::new(move |n: &u32| {
            counter.set(counter.get() + 1);
            n * 2
        });

        assert_eq!(cache.get(4), 8);
        assert_eq!(cache.get(4), 8);
        assert_eq!(cache.get(5), 10);
        assert_eq!(calls.get(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_delete_forces_recreation() {
        let mut cache = FactoryCache::new(|id: &&str| Rc::new(id.len()));
        let first = cache.get("abc");
        assert!(cache.delete(&"abc").is_some());
        assert!(!cache.contains(&"abc"));

        let second = cache.get("abc");
        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(*second, 3);
    }

    #[test]
    fn test_values_iterates_cache() {
        let mut cache = FactoryCache::new(|n: &u8| u32::from(*n) + 1);
        assert!(cache.is_empty());
        cache.get(1);
        cache.get(2);

        let mut values: Vec<u32> = cache.values().copied().collect();
        values.sort_unstable();
        assert_eq!(values, vec![2, 3]);
    }
}
