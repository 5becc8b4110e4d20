//! Pipelines and same-table priority relations

use super::{NodeKey, PipeKey};
use crate::shared::PortList;
use netplumber_hs::TernaryVector;

/// One side of a pipe pair
///
/// The forward side belongs to the upstream node and carries an output
/// port; the backward side belongs to the downstream node and carries an
/// input port. Both cache the same vector `downstream.match ∩ upstream.inv_match`.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub(crate) node: NodeKey,
    pub(crate) local_port: u32,
    pub(crate) vector: TernaryVector,
    pub(crate) reverse: PipeKey,
}

impl Pipeline {
    pub(crate) fn new(node: NodeKey, local_port: u32, vector: TernaryVector) -> Self {
        Self {
            node,
            local_port,
            vector,
            reverse: PipeKey::dangling(),
        }
    }

    pub fn node(&self) -> NodeKey {
        self.node
    }

    pub fn local_port(&self) -> u32 {
        self.local_port
    }

    pub fn vector(&self) -> &TernaryVector {
        &self.vector
    }

    pub fn reverse(&self) -> PipeKey {
        self.reverse
    }
}

/// Overlap between a higher-priority rule and a lower-priority rule
///
/// Listed in the influencer's `effect_on` and the influenced rule's
/// `influenced_by`.
#[derive(Debug, Clone)]
pub struct Influence {
    pub(crate) influencer: NodeKey,
    pub(crate) influenced: NodeKey,
    pub(crate) comm: TernaryVector,
    pub(crate) ports: PortList,
}

impl Influence {
    pub fn influencer(&self) -> NodeKey {
        self.influencer
    }

    pub fn influenced(&self) -> NodeKey {
        self.influenced
    }

    /// Headers matched by both rules
    pub fn common(&self) -> &TernaryVector {
        &self.comm
    }

    /// Input ports shared by both rules
    pub fn ports(&self) -> &PortList {
        &self.ports
    }
}
