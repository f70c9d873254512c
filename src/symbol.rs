use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Fully-qualified type name in dotted form (`com.example.Foo`).
///
/// Clones share one allocation; equality and hashing go through the text, so
/// two symbols for the same name are interchangeable as boot-tier keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Builds a symbol from a binary name (`com/example/Foo`).
    pub fn from_internal(name: &str) -> Self {
        Self(Arc::from(name.replace('/', ".")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_internal_converts_slashes() {
        let sym = Symbol::from_internal("org/apache/commons/lang3/StringUtils");
        assert_eq!(sym.as_str(), "org.apache.commons.lang3.StringUtils");
        assert_eq!(sym, Symbol::new("org.apache.commons.lang3.StringUtils"));
    }
}
