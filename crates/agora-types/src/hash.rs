use crate::address::Address;
use crate::error::TypesError;
use std::fmt;
use std::str::FromStr;

/// 32-byte hash value (blake3 digest).
///
/// Proposal ids, timelock operation ids and salts are all `Hash` values.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "borsh", derive(borsh::BorshSerialize, borsh::BorshDeserialize))]
pub struct Hash([u8; 32]);

impl Hash {
    pub const ZERO: Self = Self([0u8; 32]);
    pub const LEN: usize = 32;

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from a byte slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, TypesError> {
        if slice.len() != Self::LEN {
            return Err(TypesError::InvalidHashLength(slice.len()));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Compute blake3 hash of data
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Check if hash is zero
    pub fn is_zero(&self) -> bool {
        self == &Self::ZERO
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

impl fmt::LowerHex for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Hash {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Canonical, domain-separated hasher for content-derived ids.
///
/// Encoding rules:
/// - the domain tag is absorbed first, as a length-prefixed byte string
/// - `u64` as 8 bytes big-endian, `u128` as 16 bytes big-endian
/// - addresses as their 20 raw bytes, hashes as their 32 raw bytes
/// - byte strings as a `u64` length followed by the bytes
/// - lists as a `u64` item count followed by each item
pub struct HashBuilder {
    hasher: blake3::Hasher,
}

impl HashBuilder {
    /// Start a digest under `domain`.
    pub fn new(domain: &str) -> Self {
        let mut builder = Self {
            hasher: blake3::Hasher::new(),
        };
        builder.bytes(domain.as_bytes());
        builder
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.hasher.update(&value.to_be_bytes());
        self
    }

    pub fn u128(&mut self, value: u128) -> &mut Self {
        self.hasher.update(&value.to_be_bytes());
        self
    }

    pub fn address(&mut self, address: &Address) -> &mut Self {
        self.hasher.update(address.as_bytes());
        self
    }

    pub fn hash(&mut self, hash: &Hash) -> &mut Self {
        self.hasher.update(hash.as_bytes());
        self
    }

    pub fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.u64(data.len() as u64);
        self.hasher.update(data);
        self
    }

    /// Absorb a list prefix. Items follow through the typed methods.
    pub fn count(&mut self, len: usize) -> &mut Self {
        self.u64(len as u64)
    }

    pub fn addresses(&mut self, items: &[Address]) -> &mut Self {
        self.count(items.len());
        for item in items {
            self.address(item);
        }
        self
    }

    pub fn u128s(&mut self, items: &[u128]) -> &mut Self {
        self.count(items.len());
        for item in items {
            self.u128(*item);
        }
        self
    }

    pub fn byte_strings(&mut self, items: &[Vec<u8>]) -> &mut Self {
        self.count(items.len());
        for item in items {
            self.bytes(item);
        }
        self
    }

    pub fn finish(&self) -> Hash {
        Hash(*self.hasher.finalize().as_bytes())
    }
}
