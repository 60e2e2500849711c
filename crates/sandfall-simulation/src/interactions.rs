//! Dense pairwise interaction table

/// Outcome of a contact between a cell (`self`) and one neighbour (`other`)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InteractionRule {
    pub result_self: u16,
    pub result_other: u16,
    pub probability: f32,
}

/// `(N+1) x (N+1)` table indexed `[self][other]`, including air at index 0
pub struct InteractionTable {
    size: usize,
    rules: Vec<Option<InteractionRule>>,
}

impl InteractionTable {
    /// Empty table for `size` materials (air included)
    pub fn new(size: usize) -> Self {
        Self {
            size,
            rules: vec![None; size * size],
        }
    }

    /// Rule for `self_id` touching `other_id`.
    /// Ids outside the table (the boundary sentinel) never interact.
    pub fn get(&self, self_id: u16, other_id: u16) -> Option<&InteractionRule> {
        let (a, b) = (self_id as usize, other_id as usize);
        if a >= self.size || b >= self.size {
            return None;
        }
        self.rules[a * self.size + b].as_ref()
    }

    /// Install a rule in both orientations, replacing whatever the pair had.
    pub fn insert(&mut self, a: u16, b: u16, a1: u16, b1: u16, probability: f32) {
        let (ia, ib) = (a as usize, b as usize);
        if ia >= self.size || ib >= self.size {
            log::warn!("Interaction ({a}, {b}) outside table of size {}", self.size);
            return;
        }
        self.rules[ia * self.size + ib] = Some(InteractionRule {
            result_self: a1,
            result_other: b1,
            probability,
        });
        self.rules[ib * self.size + ia] = Some(InteractionRule {
            result_self: b1,
            result_other: a1,
            probability,
        });
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of populated ordered pairs
    pub fn rule_count(&self) -> usize {
        self.rules.iter().filter(|r| r.is_some()).count()
    }
}
