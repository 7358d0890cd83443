use std::fmt;

use rand::RngExt;

/// 128-bit random identifier that keys every file a request creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u128);

impl RequestId {
    pub fn new() -> Self {
        let mut rng = rand::rng();
        Self(rng.random())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

/// 32 lowercase hex digits, zero-padded.
impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}
