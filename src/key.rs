use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Cache key over raw bytes. Equality and hashing follow the content, so two separately
/// allocated but equal byte strings address the same entry.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteArrayKey(Arc<[u8]>);

impl ByteArrayKey {
    pub fn wrap(data: &[u8]) -> Self {
        ByteArrayKey(Arc::from(data))
    }

    pub fn data(&self) -> &[u8] {
        &self.0
    }
}

// Hash of Arc<[u8]> delegates to [u8], so borrowed lookups hash identically.
impl Borrow<[u8]> for ByteArrayKey {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for ByteArrayKey {
    fn from(data: &[u8]) -> Self {
        Self::wrap(data)
    }
}

impl From<Vec<u8>> for ByteArrayKey {
    fn from(data: Vec<u8>) -> Self {
        ByteArrayKey(Arc::from(data))
    }
}

impl fmt::Debug for ByteArrayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteArrayKey(")?;
        for byte in self.0.iter() {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}
