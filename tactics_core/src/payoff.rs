//! Persisted 2x2 payoff matrix of running-average dyad outcomes.
//!
//! Cells are addressed by `(own action, partner action)` from the point of view
//! of the agent recording the outcome. Each cell holds a score pair
//! `[own, partner]` and a visit-count pair.

use std::collections::BTreeMap;
use std::fmt;

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

pub const BUILTIN_PAYOFF_TEMPLATE: &str = include_str!("data/payoff_template.json");

/// Closed action space of a dyad member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    #[serde(alias = "attack", alias = "ATTACK")]
    Attack,
    #[serde(alias = "flee", alias = "FLEE")]
    Flee,
}

impl Action {
    pub const ALL: [Action; 2] = [Action::Attack, Action::Flee];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Action::Attack => 0,
            Action::Flee => 1,
        }
    }

    pub fn other(self) -> Action {
        match self {
            Action::Attack => Action::Flee,
            Action::Flee => Action::Attack,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Attack => "Attack",
            Action::Flee => "Flee",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running averages and visit counts for one `(own, partner)` outcome.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PayoffCell {
    pub scores: [f64; 2],
    pub counts: [u32; 2],
}

impl PayoffCell {
    /// Fold an observed `[own, partner]` score pair into the running averages.
    ///
    /// A side with no visits takes the observed value directly.
    pub fn record(&mut self, observed: [f64; 2]) {
        for side in 0..2 {
            let n = self.counts[side];
            self.scores[side] = if n == 0 {
                observed[side]
            } else {
                (self.scores[side] * n as f64 + observed[side]) / (n as f64 + 1.0)
            };
            self.counts[side] = n.saturating_add(1);
        }
    }

    #[inline]
    pub fn own(&self) -> f64 {
        self.scores[0]
    }

    #[inline]
    pub fn partner(&self) -> f64 {
        self.scores[1]
    }

    #[inline]
    pub fn joint(&self) -> f64 {
        self.scores[0] + self.scores[1]
    }
}

/// Shared 2x2 payoff table carried across epochs.
#[derive(Resource, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(into = "PersistedMatrix", from = "PersistedMatrix")]
pub struct PayoffMatrix {
    cells: [[PayoffCell; 2]; 2],
}

impl PayoffMatrix {
    /// Matrix used when no persisted table exists yet.
    pub fn template() -> Self {
        serde_json::from_str(BUILTIN_PAYOFF_TEMPLATE)
            .expect("builtin payoff template should parse")
    }

    pub fn from_cells(cells: [[PayoffCell; 2]; 2]) -> Self {
        Self { cells }
    }

    /// Matrix with the given `[own, partner]` scores and zero visit counts.
    pub fn from_scores(scores: [[[f64; 2]; 2]; 2]) -> Self {
        let cells = scores.map(|row| {
            row.map(|scores| PayoffCell {
                scores,
                counts: [0, 0],
            })
        });
        Self { cells }
    }

    #[inline]
    pub fn cell(&self, own: Action, partner: Action) -> &PayoffCell {
        &self.cells[own.index()][partner.index()]
    }

    #[inline]
    pub fn cell_mut(&mut self, own: Action, partner: Action) -> &mut PayoffCell {
        &mut self.cells[own.index()][partner.index()]
    }

    pub fn record(&mut self, own: Action, partner: Action, observed: [f64; 2]) {
        self.cell_mut(own, partner).record(observed);
    }

    /// Cells in the fixed scan order used for every tie-break:
    /// (Attack, Attack), (Attack, Flee), (Flee, Attack), (Flee, Flee).
    pub fn iter(&self) -> impl Iterator<Item = (Action, Action, &PayoffCell)> + '_ {
        Action::ALL.into_iter().flat_map(move |own| {
            Action::ALL
                .into_iter()
                .map(move |partner| (own, partner, self.cell(own, partner)))
        })
    }

    /// Total own-side visits across every cell.
    pub fn total_visits(&self) -> u64 {
        self.iter().map(|(_, _, cell)| cell.counts[0] as u64).sum()
    }
}

/// On-disk shape: `{"Scores": {own: {partner: [a, b]}}, "Counts": {...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedMatrix {
    #[serde(rename = "Scores", default)]
    scores: BTreeMap<Action, BTreeMap<Action, [f64; 2]>>,
    #[serde(rename = "Counts", default)]
    counts: BTreeMap<Action, BTreeMap<Action, [u32; 2]>>,
}

impl From<PayoffMatrix> for PersistedMatrix {
    fn from(matrix: PayoffMatrix) -> Self {
        let mut persisted = PersistedMatrix::default();
        for (own, partner, cell) in matrix.iter() {
            persisted
                .scores
                .entry(own)
                .or_default()
                .insert(partner, cell.scores);
            persisted
                .counts
                .entry(own)
                .or_default()
                .insert(partner, cell.counts);
        }
        persisted
    }
}

impl From<PersistedMatrix> for PayoffMatrix {
    fn from(persisted: PersistedMatrix) -> Self {
        let mut matrix = PayoffMatrix::default();
        for (own, row) in persisted.scores {
            for (partner, scores) in row {
                matrix.cell_mut(own, partner).scores = scores;
            }
        }
        for (own, row) in persisted.counts {
            for (partner, counts) in row {
                matrix.cell_mut(own, partner).counts = counts;
            }
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_is_all_zero() {
        let template = PayoffMatrix::template();
        assert_eq!(template, PayoffMatrix::default());
        assert_eq!(template.total_visits(), 0);
    }

    #[test]
    fn running_average_per_side() {
        let mut cell = PayoffCell::default();
        cell.record([3.0, 5.0]);
        cell.record([7.0, 5.0]);
        cell.record([2.0, -1.0]);
        assert_eq!(cell.scores, [4.0, 3.0]);
        assert_eq!(cell.counts, [3, 3]);
    }

    #[test]
    fn lowercase_action_keys_are_accepted() {
        let json = r#"{
            "Scores": { "attack": { "flee": [1.5, -2.0] } },
            "Counts": { "attack": { "flee": [4, 4] } }
        }"#;
        let matrix: PayoffMatrix = serde_json::from_str(json).unwrap();
        let cell = matrix.cell(Action::Attack, Action::Flee);
        assert_eq!(cell.scores, [1.5, -2.0]);
        assert_eq!(cell.counts, [4, 4]);
        assert_eq!(*matrix.cell(Action::Flee, Action::Flee), PayoffCell::default());
    }

    #[test]
    fn negative_counts_are_rejected() {
        let json = r#"{ "Scores": {}, "Counts": { "Flee": { "Flee": [-1, 0] } } }"#;
        assert!(serde_json::from_str::<PayoffMatrix>(json).is_err());
    }

    #[test]
    fn persisted_form_uses_capitalised_keys() {
        let mut matrix = PayoffMatrix::default();
        matrix.record(Action::Flee, Action::Attack, [1.0, 2.5]);
        let json = serde_json::to_string(&matrix).unwrap();
        insta::assert_snapshot!(json, @r###"{"Scores":{"Attack":{"Attack":[0.0,0.0],"Flee":[0.0,0.0]},"Flee":{"Attack":[1.0,2.5],"Flee":[0.0,0.0]}},"Counts":{"Attack":{"Attack":[0,0],"Flee":[0,0]},"Flee":{"Attack":[1,1],"Flee":[0,0]}}}"###);
    }
}
