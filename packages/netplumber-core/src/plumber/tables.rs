//! Tables, rules and same-table priority relations

use super::{NetPlumber, Table};
use crate::callbacks::{AnomalyKind, AnomalyReport, ShadowReport, UnreachableReport};
use crate::errors::{PlumberError, Result};
use crate::events::{Event, EventKind};
use crate::graph::{Influence, Node, NodeKey, NodeType, RuleData};
use crate::shared::PortList;
use netplumber_hs::{PacketSet, TernaryVector};
use tracing::debug;

/// Rule id for `(table, index)`
pub fn rule_id(table: u32, index: u32) -> u64 {
    ((table as u64) << 32) + index as u64
}

impl<P: PacketSet> NetPlumber<P> {
    pub fn add_table(&mut self, id: u32, ports: &[u32]) -> Result<()> {
        if id == 0 {
            return Err(PlumberError::InvalidTable(id));
        }
        if self.tables.contains_key(&id) {
            return Err(PlumberError::TableExists(id));
        }
        self.tables.insert(
            id,
            Table {
                ports: PortList::from(ports),
                rules: Default::default(),
            },
        );
        self.set_last_event(Event::new(EventKind::AddTable, id as u64, 0));
        debug!("Added table {} with ports {:?}", id, ports);
        Ok(())
    }

    /// Remove a table and every rule in it
    pub fn remove_table(&mut self, id: u32) -> Result<()> {
        let Some(table) = self.tables.get(&id) else {
            return Err(PlumberError::TableNotFound(id));
        };
        let rules: Vec<NodeKey> = table.rules.values().copied().collect();

        self.run(|np| {
            np.set_last_event(Event::new(EventKind::RemoveTable, id as u64, 0));
            for rule in rules {
                np.remove_rule_node(rule)?;
            }
            np.tables.remove(&id);
            debug!("Removed table {}", id);
            Ok(())
        })
    }

    pub fn table_ports(&self, id: u32) -> Option<&PortList> {
        self.tables.get(&id).map(|t| &t.ports)
    }

    pub fn table_ids(&self) -> Vec<u32> {
        self.tables.keys().copied().collect()
    }

    /// Rule ids of a table in priority order
    pub fn table_rules(&self, id: u32) -> Option<Vec<u64>> {
        let table = self.tables.get(&id)?;
        Some(table.rules.values().map(|k| self.nodes[*k].id).collect())
    }

    /// Insert a rule and propagate its effect; returns the rule id
    ///
    /// Empty `in_ports` mean all the table's ports. A rule already at
    /// `(table, index)` is replaced.
    #[allow(clippy::too_many_arguments)]
    pub fn add_rule(
        &mut self,
        table: u32,
        index: u32,
        in_ports: &[u32],
        out_ports: &[u32],
        match_vector: TernaryVector,
        mask: Option<TernaryVector>,
        rewrite: Option<TernaryVector>,
    ) -> Result<u64> {
        let table_ports = self
            .tables
            .get(&table)
            .map(|t| t.ports.clone())
            .ok_or(PlumberError::TableNotFound(table))?;
        for &port in in_ports.iter().chain(out_ports) {
            if !table_ports.contains(port) {
                return Err(PlumberError::PortNotInTable { table, port });
            }
        }
        self.check_vector(&match_vector)?;
        match (&mask, &rewrite) {
            (Some(m), Some(rw)) => {
                self.check_vector(m)?;
                self.check_vector(rw)?;
            }
            (None, None) => {}
            _ => {
                return Err(PlumberError::invalid_rule(
                    "mask and rewrite must be given together",
                ))
            }
        }

        let id = rule_id(table, index);
        let in_ports = if in_ports.is_empty() {
            table_ports.clone()
        } else {
            PortList::from(in_ports)
        };
        let data = RuleData {
            table,
            index,
            mask,
            rewrite,
            influenced_by: Vec::new(),
            effect_on: Vec::new(),
        };
        let node = Node::rule(
            id,
            data,
            match_vector,
            in_ports,
            PortList::from(out_ports),
            &table_ports,
        );

        self.run(move |np| {
            np.set_last_event(Event::new(EventKind::AddRule, id, 0));
            let existing = np.tables.get(&table).and_then(|t| t.rules.get(&index).copied());
            if let Some(existing) = existing {
                np.remove_rule_node(existing)?;
            }

            let key = np.nodes.insert(node);
            np.id_to_node.insert(id, key);
            if let Some(t) = np.tables.get_mut(&table) {
                t.rules.insert(index, key);
            }
            np.register_ports(key);

            np.set_table_dependency(key);
            np.set_node_pipelines(key);
            np.subtract_influences_from_flows(key)?;
            np.process_src_flow(key, None)?;
            debug!("Added rule 0x{:x} to table {}", id, table);
            Ok(id)
        })
    }

    pub fn remove_rule(&mut self, id: u64) -> Result<()> {
        let key = self.node_key(id)?;
        if self.nodes[key].node_type() != NodeType::Rule {
            return Err(PlumberError::wrong_type(id, "rule"));
        }
        self.run(|np| {
            np.set_last_event(Event::new(EventKind::RemoveRule, id, 0));
            np.remove_rule_node(key)?;
            debug!("Removed rule 0x{:x}", id);
            Ok(())
        })
    }

    pub(crate) fn remove_rule_node(&mut self, key: NodeKey) -> Result<()> {
        for f in self.nodes[key].flows.clone() {
            self.remove_src_flow(f);
        }
        self.remove_node_pipes(key);

        let (influenced_by, effect_on) = match self.nodes[key].as_rule_mut() {
            Some(rule) => (
                std::mem::take(&mut rule.influenced_by),
                std::mem::take(&mut rule.effect_on),
            ),
            None => (Vec::new(), Vec::new()),
        };

        for inf_key in influenced_by {
            if let Some(inf) = self.influences.remove(inf_key) {
                if let Some(higher) = self.nodes[inf.influencer].as_rule_mut() {
                    higher.effect_on.retain(|k| *k != inf_key);
                }
            }
        }

        // tear down every relation before lower rules recompute
        let mut freed = Vec::with_capacity(effect_on.len());
        for inf_key in effect_on {
            if let Some(inf) = self.influences.remove(inf_key) {
                if let Some(lower) = self.nodes[inf.influenced].as_rule_mut() {
                    lower.influenced_by.retain(|k| *k != inf_key);
                }
                freed.push(inf);
            }
        }
        for inf in freed {
            for f in self.nodes[inf.influenced].flows.clone() {
                if self.flows.get(f).is_some_and(|fl| inf.ports.contains(fl.in_port)) {
                    self.process_src_flow_at_location(f, None)?;
                }
            }
        }

        let node = &self.nodes[key];
        let id = node.id;
        if let Some(rule) = node.as_rule() {
            let (table, index) = (rule.table, rule.index);
            if let Some(t) = self.tables.get_mut(&table) {
                if t.rules.get(&index) == Some(&key) {
                    t.rules.remove(&index);
                }
            }
        }
        self.unregister_ports(key);
        self.id_to_node.remove(&id);
        self.nodes.remove(key);
        Ok(())
    }

    /// Create the influences between a new rule and the rest of its table,
    /// then run the shadow check
    pub(crate) fn set_table_dependency(&mut self, key: NodeKey) {
        let node = &self.nodes[key];
        let (Some(rule), Some(r_match)) = (node.as_rule(), node.match_vector.as_ref()) else {
            return;
        };
        let Some(table) = self.tables.get(&rule.table) else {
            return;
        };

        let mut created = Vec::new();
        let mut higher = Vec::new();
        for (&index, &other_key) in &table.rules {
            if other_key == key {
                continue;
            }
            let other = &self.nodes[other_key];
            let ports = other.input_ports.intersection(&node.input_ports);
            if ports.is_empty() {
                continue;
            }
            if index < rule.index {
                higher.push(other_key);
            }
            let Some(comm) = other.match_vector.as_ref().and_then(|m| r_match.intersect(m))
            else {
                continue;
            };
            let (influencer, influenced) = if index < rule.index {
                (other_key, key)
            } else {
                (key, other_key)
            };
            created.push(Influence {
                influencer,
                influenced,
                comm,
                ports,
            });
        }

        let shadow = if self.config.check_shadow {
            Some(self.cover_of(key, &higher))
        } else {
            None
        };

        for inf in created {
            let (influencer, influenced) = (inf.influencer, inf.influenced);
            let inf_key = self.influences.insert(inf);
            if let Some(r) = self.nodes[influencer].as_rule_mut() {
                r.effect_on.push(inf_key);
            }
            if let Some(r) = self.nodes[influenced].as_rule_mut() {
                r.influenced_by.push(inf_key);
            }
        }

        if let Some(cover) = shadow {
            let rule_id = self.nodes[key].id;
            if cover.universal {
                let report = UnreachableReport {
                    rule_id,
                    event: self.last_event,
                };
                (self.callbacks.on_unreachable)(&report);
            } else if cover.covers {
                let report = ShadowReport {
                    rule_id,
                    shadowed_by: cover.related,
                    event: self.last_event,
                };
                (self.callbacks.on_shadow)(&report);
            }
        }
    }

    /// Union of `others`' matches that share input ports with `key`
    fn cover_of(&self, key: NodeKey, others: &[NodeKey]) -> Cover {
        let node = &self.nodes[key];
        let mut aggregate = P::empty(self.length);
        let mut related = Vec::new();
        let Some(r_match) = node.match_vector.as_ref() else {
            return Cover::default();
        };

        for &other_key in others {
            let other = &self.nodes[other_key];
            if !other.input_ports.intersects(&node.input_ports) {
                continue;
            }
            let Some(m) = other.match_vector.as_ref() else {
                continue;
            };
            if r_match.intersect(m).is_some() {
                related.push(other.id);
            }
            aggregate.add_vector(m.clone());
        }

        if aggregate.is_empty() {
            return Cover::default();
        }
        aggregate.simple_merge();
        let universal = aggregate.is_equal(&P::universe(self.length));
        let covers = P::from_vector(r_match.clone()).is_subset_or_equal(&aggregate);
        Cover {
            universal,
            covers,
            related,
        }
    }

    /// Audit tables for shadowed, unreachable and generalized rules
    ///
    /// `None` or `Some(0)` audits every table. Reports go to the anomaly
    /// callback and are returned.
    pub fn check_anomalies(&mut self, table: Option<u32>) -> Result<Vec<AnomalyReport>> {
        let ids: Vec<u32> = match table {
            None | Some(0) => self.tables.keys().copied().collect(),
            Some(t) if self.tables.contains_key(&t) => vec![t],
            Some(t) => return Err(PlumberError::TableNotFound(t)),
        };
        let checks = self.config.anomalies.clone();

        let mut reports = Vec::new();
        for t in ids {
            let rules: Vec<NodeKey> = self
                .tables
                .get(&t)
                .map(|tb| tb.rules.values().copied().collect())
                .unwrap_or_default();

            for (i, &key) in rules.iter().enumerate() {
                let rule_id = self.nodes[key].id;
                if checks.shadow || checks.reach {
                    let cover = self.cover_of(key, &rules[..i]);
                    if cover.universal && checks.reach {
                        reports.push(AnomalyReport {
                            kind: AnomalyKind::Unreachable,
                            table: t,
                            rule_id,
                            related: cover.related,
                        });
                    } else if cover.covers && !cover.universal && checks.shadow {
                        reports.push(AnomalyReport {
                            kind: AnomalyKind::Shadowed,
                            table: t,
                            rule_id,
                            related: cover.related,
                        });
                    }
                }
                if checks.generalization {
                    let cover = self.cover_of(key, &rules[i + 1..]);
                    if cover.covers {
                        reports.push(AnomalyReport {
                            kind: AnomalyKind::Generalization,
                            table: t,
                            rule_id,
                            related: cover.related,
                        });
                    }
                }
            }
        }

        for report in &reports {
            (self.callbacks.on_anomaly)(report);
        }
        Ok(reports)
    }
}

#[derive(Debug, Default)]
struct Cover {
    /// The aggregate is the whole header space
    universal: bool,
    /// The rule's match lies inside the aggregate
    covers: bool,
    /// Ids of the aggregated rules overlapping the match
    related: Vec<u64>,
}
