//! Incremental flow propagation
//!
//! Flows form a tree per source: a flow at a node spawns one child per
//! forward pipe its processed space overlaps. Mutations update that tree in
//! place:
//!
//! - new pipes pull the upstream flows through them
//! - a new higher-priority rule subtracts its overlap from lower rules' flows
//! - removed rules and links absorb the subtrees that went through them
//!
//! Every step that processes a flow goes through the mutation's
//! [`PropagationBudget`].

mod budget;
mod processing;
mod propagation;

pub use budget::PropagationBudget;
