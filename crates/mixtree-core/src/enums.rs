//! Name ↔ code tables for enumerated device parameters.

use std::collections::HashMap;

/// Ordered mapping between symbolic names and the integer codes sent on the
/// wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    entries: Vec<(String, i32)>,
}

impl EnumDef {
    /// Names keep their spelling; codes follow declaration order from 0.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = names
            .into_iter()
            .enumerate()
            .map(|(code, name)| (name.into(), code as i32))
            .collect();
        Self { entries }
    }

    /// Like [`EnumDef::new`], with names normalized to upper case.
    pub fn upper<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(|name| name.into().to_uppercase()))
    }

    /// Codes follow the order of `keys` from 0. A key listed in `names`
    /// goes by that name on the wire; the others keep their spelling.
    pub fn with_names<I, S, N, K, V>(keys: I, names: N) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        N: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut names: HashMap<String, String> = names
            .into_iter()
            .map(|(key, name)| (key.into(), name.into()))
            .collect();
        Self::new(keys.into_iter().map(|key| {
            let key = key.into();
            names.remove(&key).unwrap_or(key)
        }))
    }

    pub fn with_codes<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, i32)>,
        S: Into<String>,
    {
        let mut entries: Vec<(String, i32)> = pairs
            .into_iter()
            .map(|(name, code)| (name.into(), code))
            .collect();
        entries.sort_by_key(|(_, code)| *code);
        Self { entries }
    }

    pub fn code_of(&self, name: &str) -> Option<i32> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, code)| *code)
    }

    pub fn name_of(&self, code: i32) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(name, _)| name.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
