//! Sorted, de-duplicated port lists

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// A sorted set of port numbers
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortList(Vec<u32>);

impl PortList {
    pub fn new(ports: impl IntoIterator<Item = u32>) -> Self {
        let mut v: Vec<u32> = ports.into_iter().collect();
        v.sort_unstable();
        v.dedup();
        Self(v)
    }

    pub fn contains(&self, port: u32) -> bool {
        self.0.binary_search(&port).is_ok()
    }

    /// Ports present in both lists
    pub fn intersection(&self, other: &PortList) -> PortList {
        let (mut i, mut j) = (0, 0);
        let mut out = Vec::new();
        while i < self.0.len() && j < other.0.len() {
            match self.0[i].cmp(&other.0[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    out.push(self.0[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        PortList(out)
    }

    pub fn intersects(&self, other: &PortList) -> bool {
        self.0.iter().any(|p| other.contains(*p))
    }

    pub fn is_subset_of(&self, other: &PortList) -> bool {
        self.0.iter().all(|p| other.contains(*p))
    }
}

impl Deref for PortList {
    type Target = [u32];

    fn deref(&self) -> &[u32] {
        &self.0
    }
}

impl From<&[u32]> for PortList {
    fn from(ports: &[u32]) -> Self {
        PortList::new(ports.iter().copied())
    }
}

impl From<Vec<u32>> for PortList {
    fn from(ports: Vec<u32>) -> Self {
        PortList::new(ports)
    }
}

impl fmt::Display for PortList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, p) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", p)?;
        }
        f.write_str("]")
    }
}
