//! Environment, alias table, and array table — the shell's named-value
//! stores, owned by the shell runtime and read immutably by the expander.

use std::collections::HashMap;
use std::env as std_env;

/// Mapping from variable name to value. Keys are unique; assignment always
/// overwrites. `exported` tracks which names should be passed to child
/// processes via `export`.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    exported: std::collections::HashSet<String>,
}

impl Environment {
    /// Seed from the process's own environment, marking every inherited
    /// variable as exported (it already came from the environment).
    pub fn from_process() -> Self {
        let mut env = Environment::default();
        for (k, v) in std_env::vars() {
            env.vars.insert(k.clone(), v);
            env.exported.insert(k);
        }
        env
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn unset(&mut self, name: &str) {
        self.vars.remove(name);
        self.exported.remove(name);
    }

    pub fn export(&mut self, name: &str) {
        self.exported.insert(name.to_string());
    }

    pub fn is_exported(&self, name: &str) -> bool {
        self.exported.contains(name)
    }

    /// Every exported variable, ready to hand to `std::process::Command::envs`.
    pub fn exported_vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars
            .iter()
            .filter(move |(k, _)| self.exported.contains(*k))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Mapping from alias name to replacement text. Expansion applies only to
/// a command's `name`, not its arguments, and is non-recursive.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.aliases.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.aliases.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Mapping from name to an ordered sequence of text items, referenced via
/// `${name[i]}` / `${name[@]}` / `$name` (first element).
#[derive(Debug, Clone, Default)]
pub struct ArrayTable {
    arrays: HashMap<String, Vec<String>>,
}

impl ArrayTable {
    pub fn set(&mut self, name: impl Into<String>, items: Vec<String>) {
        self.arrays.insert(name.into(), items);
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.arrays.get(name).map(Vec::as_slice)
    }

    pub fn element(&self, name: &str, index: usize) -> Option<&str> {
        self.arrays.get(name).and_then(|v| v.get(index)).map(String::as_str)
    }

    pub fn all_joined(&self, name: &str) -> Option<String> {
        self.arrays.get(name).map(|v| v.join(" "))
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.arrays.get(name).and_then(|v| v.first()).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_set_get_overwrite() {
        let mut env = Environment::default();
        env.set("NAME", "world");
        assert_eq!(env.get("NAME"), Some("world"));
        env.set("NAME", "again");
        assert_eq!(env.get("NAME"), Some("again"));
    }

    #[test]
    fn environment_export_tracks_separately_from_value() {
        let mut env = Environment::default();
        env.set("FOO", "bar");
        assert!(!env.is_exported("FOO"));
        env.export("FOO");
        assert!(env.is_exported("FOO"));
        assert_eq!(env.exported_vars().count(), 1);
    }

    #[test]
    fn alias_table_non_recursive_single_lookup() {
        let mut aliases = AliasTable::default();
        aliases.set("ll", "ls -la");
        assert_eq!(aliases.get("ll"), Some("ls -la"));
        assert_eq!(aliases.get("missing"), None);
    }

    #[test]
    fn array_table_element_and_all() {
        let mut arrays = ArrayTable::default();
        arrays.set("files", vec!["a.txt".into(), "b.txt".into()]);
        assert_eq!(arrays.element("files", 0), Some("a.txt"));
        assert_eq!(arrays.element("files", 1), Some("b.txt"));
        assert_eq!(arrays.element("files", 9), None);
        assert_eq!(arrays.all_joined("files"), Some("a.txt b.txt".to_string()));
        assert_eq!(arrays.first("files"), Some("a.txt"));
    }
}
