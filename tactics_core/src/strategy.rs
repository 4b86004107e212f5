//! Per-type action selection against the shared payoff matrix.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::payoff::{Action, PayoffMatrix};

/// Behavioural type assigned to a friendly agent for the whole episode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StrategyType {
    #[serde(alias = "attacker")]
    Attacker,
    #[serde(alias = "runner")]
    Runner,
    #[serde(alias = "greedy")]
    Greedy,
    #[serde(alias = "rational")]
    Rational,
    #[serde(alias = "altruistic")]
    Altruistic,
}

impl StrategyType {
    pub const ALL: [StrategyType; 5] = [
        StrategyType::Attacker,
        StrategyType::Runner,
        StrategyType::Greedy,
        StrategyType::Rational,
        StrategyType::Altruistic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyType::Attacker => "Attacker",
            StrategyType::Runner => "Runner",
            StrategyType::Greedy => "Greedy",
            StrategyType::Rational => "Rational",
            StrategyType::Altruistic => "Altruistic",
        }
    }

    /// Only rational agents feed their outcomes back into the matrix.
    pub fn updates_matrix(self) -> bool {
        matches!(self, StrategyType::Rational)
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown strategy type `{0}`")]
pub struct ParseStrategyError(pub String);

impl FromStr for StrategyType {
    type Err = ParseStrategyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        StrategyType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ParseStrategyError(value.to_string()))
    }
}

/// How a rational decision was reached.
///
/// A strictly dominant action on either side always pairs with a best reply
/// into a pure equilibrium, so in a 2x2 game `Dominant` and `PartnerDominant`
/// are never produced; only `Equilibrium` and `Maximin` occur in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RationalBasis {
    /// Pure Nash equilibrium; the highest joint score when several exist.
    Equilibrium { partner: Action },
    /// No equilibrium: own action strictly better against both partner replies.
    Dominant,
    /// No equilibrium: best response to the partner's strictly dominant action.
    PartnerDominant { partner: Action },
    /// Action with the better worst-case own score; Attack on ties.
    Maximin,
}

/// Decision together with the reasoning that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    pub rational: Option<RationalBasis>,
}

/// Action an agent of `strategy` commits to for the episode.
pub fn choose_action(strategy: StrategyType, matrix: &PayoffMatrix) -> Action {
    decide(strategy, matrix).action
}

pub fn decide(strategy: StrategyType, matrix: &PayoffMatrix) -> Decision {
    match strategy {
        StrategyType::Attacker => plain(Action::Attack),
        StrategyType::Runner => plain(Action::Flee),
        StrategyType::Greedy => plain(greedy_action(matrix)),
        StrategyType::Altruistic => plain(altruistic_action(matrix)),
        StrategyType::Rational => {
            let (action, basis) = rational_action(matrix);
            Decision {
                action,
                rational: Some(basis),
            }
        }
    }
}

fn plain(action: Action) -> Decision {
    Decision {
        action,
        rational: None,
    }
}

/// Own action of the cell with the highest own-side score; first in scan order wins ties.
pub fn greedy_action(matrix: &PayoffMatrix) -> Action {
    argmax_cell(matrix, |own, _| own)
}

/// Own action of the cell with the highest joint score; first in scan order wins ties.
pub fn altruistic_action(matrix: &PayoffMatrix) -> Action {
    argmax_cell(matrix, |own, partner| own + partner)
}

fn argmax_cell(matrix: &PayoffMatrix, value: impl Fn(f64, f64) -> f64) -> Action {
    let mut best: Option<(Action, f64)> = None;
    for (own, _, cell) in matrix.iter() {
        let candidate = value(cell.own(), cell.partner());
        if best.map_or(true, |(_, current)| candidate > current) {
            best = Some((own, candidate));
        }
    }
    best.map(|(action, _)| action).unwrap_or(Action::Attack)
}

/// Pure Nash equilibria in scan order.
///
/// A cell is an equilibrium when neither side gains by switching unilaterally;
/// ties count as best responses.
pub fn pure_equilibria(matrix: &PayoffMatrix) -> Vec<(Action, Action)> {
    matrix
        .iter()
        .filter(|(own, partner, cell)| {
            let own_deviation = matrix.cell(own.other(), *partner).own();
            let partner_deviation = matrix.cell(*own, partner.other()).partner();
            cell.own() >= own_deviation && cell.partner() >= partner_deviation
        })
        .map(|(own, partner, _)| (own, partner))
        .collect()
}

/// Rational play: best equilibrium by joint score, else the dominance chain,
/// else maximin. See [`RationalBasis`] for which steps are reachable.
pub fn rational_action(matrix: &PayoffMatrix) -> (Action, RationalBasis) {
    let mut chosen: Option<(Action, Action, f64)> = None;
    for (own, partner) in pure_equilibria(matrix) {
        let joint = matrix.cell(own, partner).joint();
        if chosen.map_or(true, |(_, _, best)| joint > best) {
            chosen = Some((own, partner, joint));
        }
    }
    if let Some((own, partner, _)) = chosen {
        return (own, RationalBasis::Equilibrium { partner });
    }

    if let Some(own) = own_dominant(matrix) {
        return (own, RationalBasis::Dominant);
    }
    if let Some(partner) = partner_dominant(matrix) {
        return (own_best_response(matrix, partner), RationalBasis::PartnerDominant { partner });
    }

    let worst = |own: Action| -> f64 {
        Action::ALL
            .iter()
            .map(|p| matrix.cell(own, *p).own())
            .fold(f64::INFINITY, f64::min)
    };
    let action = if worst(Action::Flee) > worst(Action::Attack) {
        Action::Flee
    } else {
        Action::Attack
    };
    (action, RationalBasis::Maximin)
}

fn own_dominant(matrix: &PayoffMatrix) -> Option<Action> {
    Action::ALL.into_iter().find(|own| {
        Action::ALL
            .iter()
            .all(|p| matrix.cell(*own, *p).own() > matrix.cell(own.other(), *p).own())
    })
}

fn partner_dominant(matrix: &PayoffMatrix) -> Option<Action> {
    Action::ALL.into_iter().find(|partner| {
        Action::ALL.iter().all(|own| {
            matrix.cell(*own, *partner).partner() > matrix.cell(*own, partner.other()).partner()
        })
    })
}

fn own_best_response(matrix: &PayoffMatrix, partner: Action) -> Action {
    if matrix.cell(Action::Flee, partner).own() > matrix.cell(Action::Attack, partner).own() {
        Action::Flee
    } else {
        Action::Attack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_types_ignore_the_matrix() {
        let matrix = PayoffMatrix::from_scores([
            [[-9.0, -9.0], [-9.0, -9.0]],
            [[9.0, 9.0], [9.0, 9.0]],
        ]);
        assert_eq!(choose_action(StrategyType::Attacker, &matrix), Action::Attack);
        assert_eq!(
            choose_action(StrategyType::Runner, &PayoffMatrix::default()),
            Action::Flee
        );
    }

    #[test]
    fn strategy_names_parse_case_insensitively() {
        assert_eq!("rational".parse::<StrategyType>(), Ok(StrategyType::Rational));
        assert_eq!(" Altruistic ".parse::<StrategyType>(), Ok(StrategyType::Altruistic));
        assert!("coward".parse::<StrategyType>().is_err());
    }

    #[test]
    fn empty_matrix_defaults_to_attack() {
        let matrix = PayoffMatrix::template();
        for kind in [
            StrategyType::Greedy,
            StrategyType::Altruistic,
            StrategyType::Rational,
        ] {
            assert_eq!(choose_action(kind, &matrix), Action::Attack, "{kind}");
        }
    }

    #[test]
    fn dominance_steps_are_shadowed_by_equilibria() {
        let values = [-1.0, 0.0, 1.0];
        let mut maximin = 0;
        for code in 0..3usize.pow(8) {
            let mut digits = code;
            let mut next = || {
                let value = values[digits % 3];
                digits /= 3;
                value
            };
            let scores = [
                [[next(), next()], [next(), next()]],
                [[next(), next()], [next(), next()]],
            ];
            let matrix = PayoffMatrix::from_scores(scores);
            let (_, basis) = rational_action(&matrix);
            assert!(
                matches!(basis, RationalBasis::Equilibrium { .. } | RationalBasis::Maximin),
                "{scores:?} reached {basis:?}"
            );
            if own_dominant(&matrix).is_some() || partner_dominant(&matrix).is_some() {
                assert!(!pure_equilibria(&matrix).is_empty(), "{scores:?}");
            }
            if basis == RationalBasis::Maximin {
                maximin += 1;
            }
        }
        assert!(maximin > 0);
    }
}
