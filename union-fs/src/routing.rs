//! Classification of request paths as "alternate" or "default".

/// The fixed set of relative path prefixes routed to the alternate backend.
///
/// Entries are validated at construction time: none may be empty or begin
/// or end with `/`.
pub struct RoutingTable {
    entries: Vec<String>,
}

impl RoutingTable {
    pub fn new(entries: Vec<String>) -> Result<Self, String> {
        for e in &entries {
            if e.is_empty() || e.starts_with('/') || e.ends_with('/') {
                return Err(e.clone());
            }
        }
        Ok(Self { entries })
    }

    /// Classifies a path relative to the mount root (no leading `/`).
    ///
    /// `path` is in component-prefix form: `a/b` is alternate under the
    /// entry `a` or `a/b`, but not under `a/bc` or `ab`.
    pub fn is_alternate(&self, path: &str) -> bool {
        self.entries.iter().any(|e| Self::matches(path, e))
    }

    fn matches(path: &str, entry: &str) -> bool {
        if !path.starts_with(entry) {
            return false;
        }
        match path.as_bytes().get(entry.len()) {
            None => true,
            Some(&b'/') => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_is_alternate() {
        let t = RoutingTable::new(vec!["tmp".into()]).unwrap();
        assert!(t.is_alternate("tmp"));
        assert!(t.is_alternate("tmp/x"));
        assert!(!t.is_alternate("tmpfoo"));
        assert!(!t.is_alternate("var"));
    }

    #[test]
    fn component_prefix_rules() {
        let t = RoutingTable::new(vec!["a".into()]).unwrap();
        assert!(t.is_alternate("a/b"));
        assert!(!t.is_alternate("ab"));

        let t = RoutingTable::new(vec!["a/b".into()]).unwrap();
        assert!(t.is_alternate("a/b"));
        assert!(t.is_alternate("a/b/c"));
        assert!(!t.is_alternate("a/bc"));
    }

    #[test]
    fn rejects_malformed_entries() {
        assert!(RoutingTable::new(vec!["/a".into()]).is_err());
        assert!(RoutingTable::new(vec!["a/".into()]).is_err());
        assert!(RoutingTable::new(vec!["".into()]).is_err());
    }
}
