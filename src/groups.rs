//! Co-reference groups of bet offers.
//!
//! An explicit-membership union-find: each group is an arena slot owning its
//! member id list and one attached value (the latest computed profit %).
//! Merging unions every group touched by the incoming id set into a single
//! slot and overwrites its value (last write wins, including downward
//! revisions).
//!
//! Not internally thread-safe. The engine keeps the store behind one mutex
//! and holds it across any merge + read that must be atomic together.

use std::collections::{HashMap, HashSet};

#[derive(Debug)]
struct GroupSlot {
    members: Vec<String>,
    value: f64,
}

/// Union-find over record ids with a per-group value.
#[derive(Debug, Default)]
pub struct GroupStore {
    /// record id → arena slot index. Every indexed id is live.
    index: HashMap<String, usize>,
    slots: Vec<Option<GroupSlot>>,
    free: Vec<usize>,
}

impl GroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure `id` exists as its own one-element group. No-op if already
    /// tracked (in any group).
    pub fn add_singleton(&mut self, id: &str) {
        if self.index.contains_key(id) {
            return;
        }
        let slot = self.alloc(GroupSlot {
            members: vec![id.to_string()],
            value: 0.0,
        });
        self.index.insert(id.to_string(), slot);
    }

    /// Union every group containing any of `ids` (plus any unseen ids) into
    /// one group and set that group's value, superseding prior values.
    /// Idempotent under repeated calls with the same ids.
    pub fn merge_and_set_value(&mut self, ids: &[String], value: f64) {
        if ids.is_empty() {
            return;
        }

        // Distinct slots touched, in first-seen order for stable member order.
        let mut touched: Vec<usize> = Vec::new();
        for id in ids {
            if let Some(&slot) = self.index.get(id) {
                if !touched.contains(&slot) {
                    touched.push(slot);
                }
            }
        }

        let target = match touched.first() {
            Some(&slot) => slot,
            None => self.alloc(GroupSlot {
                members: Vec::new(),
                value: 0.0,
            }),
        };

        // Fold the other groups into the target.
        for &slot in touched.iter().skip(1) {
            let absorbed = self.slots[slot].take().expect("touched slot is live");
            self.free.push(slot);
            for member in absorbed.members {
                self.index.insert(member.clone(), target);
                self.slots[target]
                    .as_mut()
                    .expect("target slot is live")
                    .members
                    .push(member);
            }
        }

        // Attach ids never seen before.
        for id in ids {
            if !self.index.contains_key(id) {
                self.index.insert(id.to_string(), target);
                self.slots[target]
                    .as_mut()
                    .expect("target slot is live")
                    .members
                    .push(id.to_string());
            }
        }

        self.slots[target].as_mut().expect("target slot is live").value = value;
    }

    /// Current membership set for `id`, or `None` if unseen.
    pub fn group_of(&self, id: &str) -> Option<Vec<String>> {
        let &slot = self.index.get(id)?;
        Some(self.live(slot).members.clone())
    }

    /// Value attached to the group containing `id`.
    pub fn value_of(&self, id: &str) -> Option<f64> {
        let &slot = self.index.get(id)?;
        Some(self.live(slot).value)
    }

    /// Value attached to the group whose membership equals `ids` by set
    /// content, irrespective of order or representation.
    pub fn value_of_set<'a, I>(&self, ids: I) -> Option<f64>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let wanted: HashSet<&str> = ids.into_iter().collect();
        let &slot = self.index.get(*wanted.iter().next()?)?;
        let group = self.live(slot);
        if group.members.len() == wanted.len()
            && group.members.iter().all(|m| wanted.contains(m.as_str()))
        {
            Some(group.value)
        } else {
            None
        }
    }

    /// Detach `id` from its group. The group's value is discarded once its
    /// last member is removed.
    pub fn remove(&mut self, id: &str) {
        let Some(slot) = self.index.remove(id) else {
            return;
        };
        let group = self.slots[slot].as_mut().expect("indexed slot is live");
        group.members.retain(|m| m != id);
        if group.members.is_empty() {
            self.slots[slot] = None;
            self.free.push(slot);
        }
    }

    /// Number of record ids currently tracked.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Every distinct group holding more than one member and a positive
    /// value. Singletons and non-profitable groups are skipped.
    pub fn profitable_groups(&self) -> impl Iterator<Item = (&[String], f64)> {
        self.slots.iter().filter_map(|slot| {
            let group = slot.as_ref()?;
            if group.members.len() > 1 && group.value > 0.0 {
                Some((group.members.as_slice(), group.value))
            } else {
                None
            }
        })
    }

    /// Count of active profitable groups.
    pub fn profitable_count(&self) -> usize {
        self.profitable_groups().count()
    }

    fn alloc(&mut self, group: GroupSlot) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(group);
                slot
            }
            None => {
                self.slots.push(Some(group));
                self.slots.len() - 1
            }
        }
    }

    fn live(&self, slot: usize) -> &GroupSlot {
        self.slots[slot].as_ref().expect("indexed slot is live")
    }
}
