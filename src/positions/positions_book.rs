use ahash::AHashMap;

use crate::{
    AggregatorError,
    positions::{
        group::PositionGroup,
        position::{Position, PositionId},
    },
    prices::dto::AStr,
    settings::ContractSettingsCache,
};

#[derive(Debug, Clone)]
pub struct RemovedPosition {
    pub position: Position,
    pub group_emptied: bool,
}

/// Open positions grouped by symbol. Groups keep the order their symbol was first seen in.
#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    symbols: Vec<AStr>,
    groups: AHashMap<AStr, PositionGroup>,
}

impl PositionBook {
    pub fn load_snapshot(
        positions: Vec<impl Into<Position>>,
        settings: &ContractSettingsCache,
    ) -> Result<Self, AggregatorError> {
        let mut book = Self::default();

        for position in positions {
            let mut position: Position = position.into();
            Position::validate_size(position.id, position.size)?;
            position.profit = position.calculate_profit(None, settings)?;

            book.add_position(position);
        }

        Ok(book)
    }

    pub fn add_position(&mut self, position: Position) {
        let symbol = position.symbol.clone();

        let group = self.groups.entry(symbol.clone()).or_insert_with(|| {
            self.symbols.push(symbol.clone());
            PositionGroup::new(symbol)
        });

        group.push(position);
    }

    pub fn get_group(&self, symbol: &str) -> Option<&PositionGroup> {
        self.groups.get(symbol)
    }

    pub fn get_position(&self, symbol: &str, id: PositionId) -> Option<&Position> {
        self.groups.get(symbol)?.get_position(id)
    }

    pub fn symbols(&self) -> &[AStr] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn groups(&self) -> impl Iterator<Item = &PositionGroup> {
        self.symbols.iter().filter_map(|x| self.groups.get(x))
    }

    pub fn snapshot(&self) -> Vec<PositionGroup> {
        self.groups().cloned().collect()
    }

    /// Revalues every member of the `symbol` group at `price` and recomputes the group profit.
    /// Returns `Ok(false)` when no group exists for `symbol`.
    pub fn apply_price_tick(
        &mut self,
        symbol: &str,
        price: f64,
        settings: &ContractSettingsCache,
    ) -> Result<bool, AggregatorError> {
        let Some(group) = self.groups.get_mut(symbol) else {
            return Ok(false);
        };

        let multiplier = settings.resolve_multiplier(symbol)?;

        for position in group.positions.iter_mut() {
            position.profit = position.calculate_profit_with_multiplier(Some(price), multiplier);
        }

        group.recalculate_profit();

        Ok(true)
    }

    pub fn remove_position(&mut self, symbol: &str, id: PositionId) -> Option<RemovedPosition> {
        let group = self.groups.get_mut(symbol)?;
        let (position, group_emptied) = group.take(id)?;

        Some(RemovedPosition {
            position,
            group_emptied,
        })
    }

    pub fn remove_group(&mut self, symbol: &str) -> Option<PositionGroup> {
        let removed = self.groups.remove(symbol)?;
        self.symbols.retain(|x| &**x != symbol);

        Some(removed)
    }
}
