//! Soft (partial) assignments.
//!
//! An [`Assignment`] gives, for every variable, a non-negative weight per
//! state. Feeding it to [`Spn::eval`][crate::spn::Spn::eval] multiplies each
//! indicator by its weight, so:
//!
//! - exactly one state with weight 1 encodes an observed variable,
//! - all states with weight 1 encode an unobserved (summed-out) variable,
//! - any other 0/1 pattern encodes partial evidence ("not state 0").
//!
//! The compact signed form of a partial assignment uses `-1` for
//! "unobserved" and a state index otherwise.

use crate::types::Schema;

/// Per-variable, per-state indicator weights.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    weights: Vec<Vec<f64>>,
}

impl Assignment {
    /// Every variable unobserved: all weights are 1.
    pub fn marginal(schema: &Schema) -> Self {
        Self {
            weights: schema.iter().map(|&s| vec![1.0; s]).collect(),
        }
    }

    /// One-hot encoding of a full assignment.
    ///
    /// # Panics
    ///
    /// Panics if `states` does not match the schema.
    pub fn from_states(schema: &Schema, states: &[usize]) -> Self {
        assert_eq!(states.len(), schema.len(), "Assignment length does not match schema");
        let weights = schema
            .iter()
            .zip(states)
            .map(|(&n, &x)| {
                let mut w = vec![0.0; n];
                w[x] = 1.0;
                w
            })
            .collect();
        Self { weights }
    }

    /// Expands the compact signed form: `-1` (or any negative value) means
    /// unobserved, a non-negative value is an observed state.
    pub fn from_signed(schema: &Schema, xs: &[i64]) -> Self {
        assert_eq!(xs.len(), schema.len(), "Assignment length does not match schema");
        let mut ass = Self::marginal(schema);
        for (var, &x) in xs.iter().enumerate() {
            if x >= 0 {
                ass.observe(var, x as usize);
            }
        }
        ass
    }

    /// All variables unobserved except `var`, which is observed in `state`.
    pub fn restricted(schema: &Schema, var: usize, state: usize) -> Self {
        let mut ass = Self::marginal(schema);
        ass.observe(var, state);
        ass
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Returns true if there are no variables.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weight of `state` of `var`.
    #[inline]
    pub fn weight(&self, var: usize, state: usize) -> f64 {
        self.weights[var][state]
    }

    /// Sets the weight of `state` of `var`.
    pub fn set_weight(&mut self, var: usize, state: usize, weight: f64) {
        debug_assert!(weight >= 0.0, "Indicator weights must be non-negative");
        self.weights[var][state] = weight;
    }

    /// Makes `var` observed in `state` (one-hot).
    pub fn observe(&mut self, var: usize, state: usize) {
        for (s, w) in self.weights[var].iter_mut().enumerate() {
            *w = if s == state { 1.0 } else { 0.0 };
        }
    }

    /// Makes `var` unobserved again.
    pub fn unobserve(&mut self, var: usize) {
        self.weights[var].fill(1.0);
    }

    /// Rules out `state` of `var`.
    pub fn forbid(&mut self, var: usize, state: usize) {
        self.weights[var][state] = 0.0;
    }

    /// States of `var` that carry a non-zero weight.
    pub fn allowed(&self, var: usize) -> impl Iterator<Item = usize> + '_ {
        self.weights[var].iter().enumerate().filter(|(_, &w)| w > 0.0).map(|(s, _)| s)
    }

    /// Number of states of `var` that carry a non-zero weight.
    pub fn allowed_count(&self, var: usize) -> usize {
        self.allowed(var).count()
    }

    /// The single allowed state of `var`, if exactly one remains.
    pub fn fixed(&self, var: usize) -> Option<usize> {
        let mut allowed = self.allowed(var);
        match (allowed.next(), allowed.next()) {
            (Some(s), None) => Some(s),
            _ => None,
        }
    }

    /// Checks whether every variable has exactly one allowed state.
    pub fn is_complete(&self) -> bool {
        (0..self.len()).all(|var| self.fixed(var).is_some())
    }

    /// Extracts the full assignment, if [complete][Self::is_complete].
    pub fn to_states(&self) -> Option<Vec<usize>> {
        (0..self.len()).map(|var| self.fixed(var)).collect()
    }
}
