//! Propagation tree nodes

use super::{FlowId, NodeKey, PipeKey};
use netplumber_hs::PacketSet;

/// A header set that reached a node through a particular path
///
/// `processed == None` means nothing survived the node's match and the
/// higher-priority rules. A looped flow is frozen and is never processed.
#[derive(Debug, Clone)]
pub struct Flow<P: PacketSet> {
    pub(crate) node: NodeKey,
    /// Root flow of the source this flow descends from
    pub(crate) source: FlowId,
    /// Headers arriving at the node
    pub(crate) hs_object: P,
    /// Headers leaving the node
    pub(crate) processed: Option<P>,
    pub(crate) in_port: u32,
    /// Forward pipe the flow came through; `None` for a root flow
    pub(crate) pipe: Option<PipeKey>,
    pub(crate) parent: Option<FlowId>,
    /// `None` until the flow is processed alive
    pub(crate) children: Option<Vec<FlowId>>,
    pub(crate) looped: bool,
}

impl<P: PacketSet> Flow<P> {
    pub(crate) fn child(
        node: NodeKey,
        source: FlowId,
        parent: FlowId,
        pipe: PipeKey,
        in_port: u32,
        input: P,
    ) -> Self {
        Self {
            node,
            source,
            hs_object: input,
            processed: None,
            in_port,
            pipe: Some(pipe),
            parent: Some(parent),
            children: None,
            looped: false,
        }
    }

    pub(crate) fn root(node: NodeKey, space: P) -> Self {
        Self {
            node,
            source: FlowId::dangling(),
            processed: Some(space.clone()),
            hs_object: space,
            in_port: 0,
            pipe: None,
            parent: None,
            children: Some(Vec::new()),
            looped: false,
        }
    }

    pub fn node(&self) -> NodeKey {
        self.node
    }

    pub fn source(&self) -> FlowId {
        self.source
    }

    pub fn input(&self) -> &P {
        &self.hs_object
    }

    pub fn processed(&self) -> Option<&P> {
        self.processed.as_ref()
    }

    pub fn in_port(&self) -> u32 {
        self.in_port
    }

    pub fn pipe(&self) -> Option<PipeKey> {
        self.pipe
    }

    pub fn parent(&self) -> Option<FlowId> {
        self.parent
    }

    pub fn children(&self) -> &[FlowId] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn is_looped(&self) -> bool {
        self.looped
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Has a non-empty outgoing space
    pub fn is_alive(&self) -> bool {
        self.processed.as_ref().is_some_and(|p| !p.is_empty())
    }
}
