use std::{fmt, sync::Arc};

/// A named symbolic variable.
///
/// Two symbols are equal when their names are equal. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Creates a symbol with the given name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Returns the symbol's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Bit used by the per-node symbol filter in [`Expr`](crate::Expr).
    ///
    /// A stable FNV-1a hash of the name, folded to one of 64 bits.
    pub(crate) fn mask(&self) -> u64 {
        1 << (fnv1a(self.0.as_bytes()) % 64)
    }

    /// Stable 64-bit hash of the name, independent of process and platform.
    #[must_use]
    pub fn stable_hash(&self) -> u64 {
        fnv1a(self.0.as_bytes())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Creates symbols from a whitespace- or comma-separated list of names.
///
/// ```
/// use ctrlprop_symbolic::symbols;
///
/// let xx = symbols("x1, x2 x3");
/// assert_eq!(xx.len(), 3);
/// assert_eq!(xx[2].name(), "x3");
/// ```
#[must_use]
pub fn symbols(names: &str) -> Vec<Symbol> {
    names
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|name| !name.is_empty())
        .map(Symbol::new)
        .collect()
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes.iter().fold(OFFSET, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(PRIME)
    })
}
