use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Decimals used by the staking token (18, like the original cUSD deployment).
pub const TOKEN_DECIMALS: u32 = 18;

/// One whole token in base units.
pub const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

// ── Address ─────────────────────────────────────────────────────────────────

/// A 20-byte account identifier, serialized as a `0x`-prefixed hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::str::FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| Error::InvalidAddress(e.to_string()))?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| Error::InvalidAddress(format!("expected 20 bytes: {s}")))?;
        Ok(Address(arr))
    }
}

impl TryFrom<String> for Address {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.to_string()
    }
}

// ── Token amounts ───────────────────────────────────────────────────────────

/// Parse a decimal token amount (e.g. `"12.5"`) into base units.
pub fn parse_units(s: &str) -> Result<u128> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::InvalidAmount("empty amount".into()));
    }
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if frac_part.len() as u32 > TOKEN_DECIMALS {
        return Err(Error::InvalidAmount(format!(
            "more than {TOKEN_DECIMALS} fractional digits: {s}"
        )));
    }
    let int_part = if int_part.is_empty() { "0" } else { int_part };
    let whole: u128 = int_part
        .parse()
        .map_err(|_| Error::InvalidAmount(format!("invalid integer part: {s}")))?;
    let frac: u128 = if frac_part.is_empty() {
        0
    } else {
        frac_part
            .parse()
            .map_err(|_| Error::InvalidAmount(format!("invalid fractional part: {s}")))?
    };
    let scale = 10u128.pow(TOKEN_DECIMALS - frac_part.len() as u32);
    whole
        .checked_mul(ONE_TOKEN)
        .and_then(|w| frac.checked_mul(scale).and_then(|f| w.checked_add(f)))
        .ok_or_else(|| Error::InvalidAmount(format!("amount overflow: {s}")))
}

/// Format base units as a decimal token amount with trailing zeros trimmed.
pub fn format_units(amount: u128) -> String {
    let whole = amount / ONE_TOKEN;
    let frac = amount % ONE_TOKEN;
    if frac == 0 {
        return whole.to_string();
    }
    let frac_str = format!("{frac:018}");
    format!("{whole}.{}", frac_str.trim_end_matches('0'))
}

// ── Pool records ────────────────────────────────────────────────────────────

/// Lifecycle status of a pool, as reported by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolStatus {
    Active = 0,
    Closed = 1,
    Resolved = 2,
    Cancelled = 3,
}

impl PoolStatus {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Active),
            1 => Some(Self::Closed),
            2 => Some(Self::Resolved),
            3 => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Resolved)
    }
}

impl std::fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PoolStatus::Active => "active",
            PoolStatus::Closed => "closed",
            PoolStatus::Resolved => "resolved",
            PoolStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Authoritative on-chain pool record, read through the ledger accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: u64,
    pub creator: Address,
    /// Off-chain content reference used to locate descriptive metadata.
    pub metadata_uri: String,
    pub choices_count: u8,
    /// Absolute unix timestamp (seconds) after which staking closes.
    pub deadline: u64,
    pub min_stake: u128,
    pub max_stake: u128,
    pub creator_seed: u128,
    pub platform_fee_bps: u32,
    pub creator_fee_bps: u32,
    pub total_staked: u128,
    /// Only meaningful once `status` is `Resolved`.
    pub winning_choice: u8,
    pub status: PoolStatus,
    /// Zero denotes an unallocated slot; such records are never surfaced.
    pub created_at: u64,
    pub resolved_at: u64,
}

impl Pool {
    /// The ledger returns zeroed records for ids that were never allocated.
    pub fn is_empty_slot(&self) -> bool {
        self.created_at == 0
    }
}

/// A user's stake on one choice within a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStake {
    pub amount: u128,
    pub claimed: bool,
}
