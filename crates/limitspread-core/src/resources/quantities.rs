use crate::{LimitSpreadError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;

/// Resource dimensions tracked by the scorers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceName {
    Cpu,
    Memory,
}

impl ResourceName {
    /// Key used in Kubernetes resource maps
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceName::Cpu => "cpu",
            ResourceName::Memory => "memory",
        }
    }

    /// Parse a quantity of this resource into its integer unit
    pub fn parse(&self, s: &str) -> Result<i64> {
        match self {
            ResourceName::Cpu => ResourceQuantities::parse_cpu(s),
            ResourceName::Memory => ResourceQuantities::parse_memory(s),
        }
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource quantities for nodes and pods
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceQuantities {
    /// CPU in millicores (1000 = 1 core)
    pub cpu_millicores: i64,
    /// Memory in bytes
    pub memory_bytes: i64,
}

const BINARY_SUFFIXES: [(&str, i64); 6] = [
    ("Ki", 1 << 10),
    ("Mi", 1 << 20),
    ("Gi", 1 << 30),
    ("Ti", 1 << 40),
    ("Pi", 1 << 50),
    ("Ei", 1 << 60),
];

const DECIMAL_SUFFIXES: [(&str, i64); 6] = [
    ("k", 1_000),
    ("M", 1_000_000),
    ("G", 1_000_000_000),
    ("T", 1_000_000_000_000),
    ("P", 1_000_000_000_000_000),
    ("E", 1_000_000_000_000_000_000),
];

impl ResourceQuantities {
    pub fn new(cpu_millicores: i64, memory_bytes: i64) -> Self {
        Self {
            cpu_millicores,
            memory_bytes,
        }
    }

    /// Quantity for one resource dimension
    pub fn get(&self, resource: ResourceName) -> i64 {
        match resource {
            ResourceName::Cpu => self.cpu_millicores,
            ResourceName::Memory => self.memory_bytes,
        }
    }

    /// Mutable quantity for one resource dimension
    pub fn get_mut(&mut self, resource: ResourceName) -> &mut i64 {
        match resource {
            ResourceName::Cpu => &mut self.cpu_millicores,
            ResourceName::Memory => &mut self.memory_bytes,
        }
    }

    /// Parse CPU string (e.g., "2", "1000m", "0.5", "1.5m")
    ///
    /// Fractions of a millicore round up.
    pub fn parse_cpu(s: &str) -> Result<i64> {
        let s = s.trim();
        let invalid = || LimitSpreadError::invalid_quantity("cpu", s);

        if let Some(m) = s.strip_suffix('m') {
            // Millicores
            return m
                .parse::<i64>()
                .ok()
                .or_else(|| decimal_ceil(m, 0))
                .ok_or_else(invalid);
        }

        if let Ok(cores) = s.parse::<i64>() {
            return cores.checked_mul(1000).ok_or_else(invalid);
        }
        if let Some(millis) = decimal_ceil(s, 3) {
            return Ok(millis);
        }

        match s.parse::<f64>() {
            Ok(cores) if cores.is_finite() && (cores * 1000.0).abs() < i64::MAX as f64 => {
                Ok((cores * 1000.0).ceil() as i64)
            }
            _ => Err(invalid()),
        }
    }

    /// Parse memory string (e.g., "128Mi", "1Gi", "1.5G", "1024")
    pub fn parse_memory(s: &str) -> Result<i64> {
        let s = s.trim();
        let invalid = || LimitSpreadError::invalid_quantity("memory", s);

        let (number, multiplier) = BINARY_SUFFIXES
            .iter()
            .chain(DECIMAL_SUFFIXES.iter())
            .find_map(|(suffix, mult)| s.strip_suffix(suffix).map(|n| (n, *mult)))
            .unwrap_or((s, 1));

        if let Ok(value) = number.parse::<i64>() {
            return value.checked_mul(multiplier).ok_or_else(invalid);
        }

        match number.parse::<f64>() {
            // Fractional bytes round up, matching the apiserver
            Ok(value) if value.is_finite() => Ok((value * multiplier as f64).ceil() as i64),
            _ => Err(invalid()),
        }
    }
}

/// Scale an unsigned decimal like "1.25" by `10^scale`, rounding any
/// remaining fraction up. `None` for anything else.
fn decimal_ceil(number: &str, scale: usize) -> Option<i64> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let (kept, rest) = fraction.split_at(fraction.len().min(scale));
    let mut value: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    for digit in kept.bytes().chain(std::iter::repeat(b'0')).take(scale) {
        value = value.checked_mul(10)?.checked_add(i64::from(digit - b'0'))?;
    }

    if rest.bytes().any(|b| b != b'0') {
        value = value.checked_add(1)?;
    }
    Some(value)
}

impl AddAssign for ResourceQuantities {
    fn add_assign(&mut self, other: Self) {
        self.cpu_millicores = self.cpu_millicores.saturating_add(other.cpu_millicores);
        self.memory_bytes = self.memory_bytes.saturating_add(other.memory_bytes);
    }
}
