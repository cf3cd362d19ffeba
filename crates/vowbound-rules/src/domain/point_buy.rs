//! Point-buy attribute editor used during character creation.
//!
//! Every attribute starts at 10 with a 27-point budget. Scores stay within
//! [8, 15]. A step that lands above 13 costs 2 points, any other step costs
//! 1; stepping down from above 13 refunds 2, otherwise 1. Costs are always
//! summed step by step because 12→13 and 13→14 are priced differently.

use thiserror::Error;
use tracing::debug;

use super::attributes::{Attribute, Attributes};

/// Points available to a new character.
pub const POINT_BUY_BUDGET: i32 = 27;
/// Lowest score reachable during creation.
pub const MIN_SCORE: i32 = 8;
/// Highest score reachable during creation.
pub const MAX_SCORE: i32 = 15;
/// Scores above this cost double.
pub const PREMIUM_THRESHOLD: i32 = 13;
/// Score every attribute starts at.
pub const BASELINE_SCORE: i32 = 10;

/// Why a point-buy adjustment was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointBuyError {
    /// The adjusted score would leave [8, 15].
    #[error("{attribute} would become {value}, outside [{MIN_SCORE}, {MAX_SCORE}]")]
    OutOfRange { attribute: Attribute, value: i32 },

    /// Raising the score costs more than the remaining budget.
    #[error("raising {attribute} costs {cost} points but only {remaining} remain")]
    InsufficientPoints {
        attribute: Attribute,
        cost: i32,
        remaining: i32,
    },

    /// A finished attribute set spends more than the budget.
    #[error("attributes spend {spent} points, budget is {POINT_BUY_BUDGET}")]
    OverBudget { spent: i32 },
}

/// Cost of raising a score from `from` to `from + 1`.
#[must_use]
pub fn raise_cost(from: i32) -> i32 {
    if from + 1 > PREMIUM_THRESHOLD { 2 } else { 1 }
}

/// Points refunded by lowering a score from `from` to `from - 1`.
#[must_use]
pub fn lower_refund(from: i32) -> i32 {
    if from > PREMIUM_THRESHOLD { 2 } else { 1 }
}

/// Net cost of moving one score from `from` to `to`, summed per step.
/// Negative when the move refunds points.
#[must_use]
pub fn step_cost(from: i32, to: i32) -> i32 {
    if to >= from {
        (from..to).map(raise_cost).sum()
    } else {
        -((to + 1..=from).map(lower_refund).sum::<i32>())
    }
}

/// Total points an attribute set spends relative to the all-10 baseline.
#[must_use]
pub fn points_spent(attributes: &Attributes) -> i32 {
    attributes
        .iter()
        .map(|(_, value)| step_cost(BASELINE_SCORE, value))
        .sum()
}

/// Checks a finished attribute set against the creation rules.
///
/// # Errors
///
/// Returns `PointBuyError::OutOfRange` for the first score outside [8, 15]
/// and `PointBuyError::OverBudget` if the set spends more than 27 points.
pub fn validate(attributes: &Attributes) -> Result<(), PointBuyError> {
    if let Some((attribute, value)) = attributes
        .iter()
        .find(|(_, v)| !(MIN_SCORE..=MAX_SCORE).contains(v))
    {
        return Err(PointBuyError::OutOfRange { attribute, value });
    }
    let spent = points_spent(attributes);
    if spent > POINT_BUY_BUDGET {
        return Err(PointBuyError::OverBudget { spent });
    }
    Ok(())
}

/// Attribute set plus remaining budget, as edited by the character builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointBuy {
    pub attributes: Attributes,
    pub budget_remaining: i32,
}

impl Default for PointBuy {
    fn default() -> Self {
        Self {
            attributes: Attributes::default(),
            budget_remaining: POINT_BUY_BUDGET,
        }
    }
}

impl PointBuy {
    /// Moves `attribute` by `delta` steps.
    ///
    /// # Errors
    ///
    /// Returns `PointBuyError::OutOfRange` if the new score leaves [8, 15],
    /// or `PointBuyError::InsufficientPoints` if a raise costs more than the
    /// remaining budget. `self` is untouched either way.
    pub fn try_adjust(&self, attribute: Attribute, delta: i32) -> Result<Self, PointBuyError> {
        let from = self.attributes.get(attribute);
        let to = from.saturating_add(delta);
        if !(MIN_SCORE..=MAX_SCORE).contains(&to) {
            return Err(PointBuyError::OutOfRange {
                attribute,
                value: to,
            });
        }

        let cost = step_cost(from, to);
        if delta > 0 && cost > self.budget_remaining {
            return Err(PointBuyError::InsufficientPoints {
                attribute,
                cost,
                remaining: self.budget_remaining,
            });
        }

        Ok(Self {
            attributes: self.attributes.with(attribute, to),
            budget_remaining: self.budget_remaining - cost,
        })
    }

    /// Moves `attribute` by `delta` steps; a rejected move leaves the editor
    /// unchanged.
    #[must_use]
    pub fn adjust(&self, attribute: Attribute, delta: i32) -> Self {
        self.try_adjust(attribute, delta).unwrap_or_else(|e| {
            debug!(%attribute, delta, reason = %e, "point-buy adjustment rejected");
            *self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raising_ten_to_fourteen_costs_five_points() {
        let editor = PointBuy::default().adjust(Attribute::Strength, 4);

        assert_eq!(editor.attributes.strength, 14);
        assert_eq!(editor.budget_remaining, POINT_BUY_BUDGET - 5);
    }

    #[test]
    fn test_stepwise_and_lump_adjustments_agree() {
        let lump = PointBuy::default().adjust(Attribute::Magic, 5);
        let stepwise = (0..5).fold(PointBuy::default(), |e, _| e.adjust(Attribute::Magic, 1));

        assert_eq!(lump, stepwise);
        assert_eq!(lump.budget_remaining, POINT_BUY_BUDGET - (1 + 1 + 1 + 2 + 2));
    }

    #[test]
    fn test_thirteen_to_fourteen_costs_more_than_twelve_to_thirteen() {
        assert_eq!(raise_cost(12), 1);
        assert_eq!(raise_cost(13), 2);
        assert_eq!(lower_refund(14), 2);
        assert_eq!(lower_refund(13), 1);
    }

    #[test]
    fn test_lowering_refunds_points() {
        let editor = PointBuy::default().adjust(Attribute::Charisma, -2);

        assert_eq!(editor.attributes.charisma, 8);
        assert_eq!(editor.budget_remaining, POINT_BUY_BUDGET + 2);
    }

    #[test]
    fn test_raise_then_lower_restores_budget() {
        let editor = PointBuy::default()
            .adjust(Attribute::Wisdom, 5)
            .adjust(Attribute::Wisdom, -5);

        assert_eq!(editor, PointBuy::default());
    }

    #[test]
    fn test_leaving_range_is_a_no_op() {
        let start = PointBuy::default();

        assert_eq!(start.adjust(Attribute::Innate, 6), start);
        assert_eq!(start.adjust(Attribute::Innate, -3), start);
        assert!(matches!(
            start.try_adjust(Attribute::Innate, 6),
            Err(PointBuyError::OutOfRange { value: 16, .. })
        ));
    }

    #[test]
    fn test_extreme_deltas_are_no_ops() {
        let start = PointBuy::default();

        assert_eq!(start.adjust(Attribute::Strength, i32::MAX), start);
        assert_eq!(start.adjust(Attribute::Strength, i32::MIN), start);
        assert!(matches!(
            start.try_adjust(Attribute::Wisdom, i32::MAX),
            Err(PointBuyError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_raise_beyond_budget_is_a_no_op() {
        let editor = PointBuy {
            attributes: Attributes::default().with(Attribute::Dexterity, 13),
            budget_remaining: 1,
        };

        assert_eq!(editor.adjust(Attribute::Dexterity, 1), editor);
        assert_eq!(
            editor.try_adjust(Attribute::Dexterity, 1),
            Err(PointBuyError::InsufficientPoints {
                attribute: Attribute::Dexterity,
                cost: 2,
                remaining: 1,
            })
        );
    }

    #[test]
    fn test_lowering_is_allowed_with_empty_budget() {
        let editor = PointBuy {
            attributes: Attributes::default(),
            budget_remaining: 0,
        };

        let lowered = editor.adjust(Attribute::Strength, -1);

        assert_eq!(lowered.attributes.strength, 9);
        assert_eq!(lowered.budget_remaining, 1);
    }

    #[test]
    fn test_budget_never_goes_negative_across_many_raises() {
        let mut editor = PointBuy::default();
        for attribute in Attribute::ALL {
            for _ in 0..5 {
                editor = editor.adjust(attribute, 1);
                assert!(editor.budget_remaining >= 0);
                assert!(
                    editor
                        .attributes
                        .iter()
                        .all(|(_, v)| (MIN_SCORE..=MAX_SCORE).contains(&v))
                );
            }
        }
        assert_eq!(points_spent(&editor.attributes), POINT_BUY_BUDGET - editor.budget_remaining);
    }

    #[test]
    fn test_validate_rejects_over_budget_and_out_of_range_sets() {
        assert!(validate(&Attributes::default()).is_ok());
        assert_eq!(
            validate(&Attributes::uniform(15)),
            Err(PointBuyError::OverBudget { spent: 9 * 7 })
        );
        assert!(matches!(
            validate(&Attributes::default().with(Attribute::Magic, 7)),
            Err(PointBuyError::OutOfRange {
                attribute: Attribute::Magic,
                value: 7
            })
        ));
    }
}
