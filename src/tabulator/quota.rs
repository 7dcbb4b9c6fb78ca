use super::numeric::{ArithmeticError, NumericModel, Votes};
use crate::config::{ElectionRules, WinnerElectionMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaRule {
    /// `total / (seats + 1)`
    Droop,
    /// `total / seats`
    Hare,
    /// `total × share`, for bottoms-up percentage counts.
    Percentage(Votes),
}

/// Computes the vote total a candidate must exceed to be elected.
#[derive(Debug, Clone)]
pub struct QuotaCalculator {
    rule: QuotaRule,
    model: NumericModel,
    non_integer: bool,
}

impl QuotaCalculator {
    pub fn new(rule: QuotaRule, model: NumericModel, non_integer: bool) -> QuotaCalculator {
        QuotaCalculator {
            rule,
            model,
            non_integer,
        }
    }

    pub fn from_rules(rules: &ElectionRules) -> QuotaCalculator {
        let rule = match (rules.winner_election_mode, rules.percentage_share()) {
            (WinnerElectionMode::BottomsUpUsingPercentageThreshold, Some(share)) => {
                QuotaRule::Percentage(share)
            }
            _ if rules.hare_quota => QuotaRule::Hare,
            _ => QuotaRule::Droop,
        };
        QuotaCalculator::new(
            rule,
            rules.numeric_model(),
            rules.non_integer_winning_threshold,
        )
    }

    pub fn rule(&self) -> &QuotaRule {
        &self.rule
    }

    pub fn threshold(
        &self,
        continuing_total: &Votes,
        remaining_seats: u32,
    ) -> Result<Votes, ArithmeticError> {
        let quota = match &self.rule {
            QuotaRule::Droop => self.model.div(
                continuing_total,
                &Votes::from_integer(u64::from(remaining_seats) + 1),
            )?,
            QuotaRule::Hare => self
                .model
                .div(continuing_total, &Votes::from_integer(u64::from(remaining_seats)))?,
            QuotaRule::Percentage(share) => return Ok(self.model.mul(continuing_total, share)),
        };

        if self.non_integer {
            Ok(quota)
        } else {
            Ok(quota.ceil())
        }
    }
}
