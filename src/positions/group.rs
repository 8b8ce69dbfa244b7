use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};

use crate::{
    positions::position::{Position, PositionId},
    prices::dto::AStr,
};

/// Running aggregates of a group. Size and swap are sums; open price and profit are
/// size-weighted means derived from the weighted sums kept here. All sums are decimal, so
/// folding a member out restores the totals it was folded into exactly.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct GroupTotals {
    size: Decimal,
    swap: Decimal,
    weighted_open_price: Decimal,
    weighted_profit: Decimal,
}

impl GroupTotals {
    /// Totals of `positions` folded into an empty group.
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a Position>) -> GroupTotals {
        positions
            .into_iter()
            .fold(GroupTotals::default(), GroupTotals::fold_in)
    }

    pub fn fold_in(self, position: &Position) -> GroupTotals {
        self.apply(position, Decimal::ONE)
    }

    /// Inverse of [`GroupTotals::fold_in`]. Returns `None` when nothing is left of the group
    /// size; the weighted means have no value at zero size.
    pub fn fold_out(self, position: &Position) -> Option<GroupTotals> {
        let totals = self.apply(position, Decimal::NEGATIVE_ONE);

        if totals.size <= Decimal::ZERO {
            return None;
        }

        Some(totals)
    }

    pub fn size(&self) -> f64 {
        as_f64(self.size)
    }

    pub fn swap(&self) -> f64 {
        as_f64(self.swap)
    }

    pub fn open_price(&self) -> f64 {
        self.weighted_mean(self.weighted_open_price)
    }

    pub fn profit(&self) -> f64 {
        self.weighted_mean(self.weighted_profit)
    }

    fn weighted_mean(&self, weighted: Decimal) -> f64 {
        weighted
            .checked_div(self.size)
            .map(as_f64)
            .unwrap_or_default()
    }

    fn reweigh_profit(&mut self, positions: &[Position]) {
        self.weighted_profit = positions
            .iter()
            .map(|x| as_decimal(x.size) * as_decimal(x.profit))
            .sum();
    }

    fn apply(self, position: &Position, delta: Decimal) -> GroupTotals {
        let size = as_decimal(position.size) * delta;

        GroupTotals {
            size: self.size + size,
            swap: self.swap + as_decimal(position.swap) * delta,
            weighted_open_price: self.weighted_open_price + as_decimal(position.open_price) * size,
            weighted_profit: self.weighted_profit + as_decimal(position.profit) * size,
        }
    }
}

fn as_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

fn as_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionGroup {
    pub symbol: AStr,
    pub totals: GroupTotals,
    pub positions: Vec<Position>,
}

impl PositionGroup {
    pub fn new(symbol: AStr) -> Self {
        Self {
            symbol,
            totals: GroupTotals::default(),
            positions: vec![],
        }
    }

    pub fn get_position(&self, id: PositionId) -> Option<&Position> {
        self.positions.iter().find(|x| x.id == id)
    }

    pub fn position_ids(&self) -> Vec<PositionId> {
        self.positions.iter().map(|x| x.id).collect()
    }

    pub(crate) fn push(&mut self, position: Position) {
        self.totals = self.totals.fold_in(&position);
        self.positions.push(position);
    }

    /// Removes the member and folds it out. Returns the removed position and whether the
    /// group has no members left, in which case the totals are reset and the group must go.
    pub(crate) fn take(&mut self, id: PositionId) -> Option<(Position, bool)> {
        let index = self.positions.iter().position(|x| x.id == id)?;
        let position = self.positions.remove(index);

        if self.positions.is_empty() {
            self.totals = GroupTotals::default();
            return Some((position, true));
        }

        self.totals = match self.totals.fold_out(&position) {
            Some(totals) => totals,
            None => GroupTotals::from_positions(&self.positions),
        };

        Some((position, false))
    }

    /// Size-weighted mean of the members' cached profits, computed from scratch.
    pub(crate) fn recalculate_profit(&mut self) {
        self.totals.reweigh_profit(&self.positions);
    }
}
