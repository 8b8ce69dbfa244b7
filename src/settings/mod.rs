use ahash::AHashMap;

use crate::{AggregatorError, prices::dto::AStr};

#[derive(Debug, Clone)]
pub struct InstrumentContractSettings {
    pub symbol: AStr,
    pub multiplier_exponent: i32,
}

impl InstrumentContractSettings {
    pub fn new(symbol: impl Into<AStr>, multiplier_exponent: i32) -> Self {
        Self {
            symbol: symbol.into(),
            multiplier_exponent,
        }
    }

    pub fn contract_multiplier(&self) -> f64 {
        10f64.powi(self.multiplier_exponent)
    }
}

/// Per-instrument contract multipliers used by the profit formula.
#[derive(Debug, Clone)]
pub struct ContractSettingsCache {
    instruments: AHashMap<AStr, InstrumentContractSettings>,
}

impl ContractSettingsCache {
    pub fn new(settings: Vec<impl Into<InstrumentContractSettings>>) -> Self {
        let mut instruments = AHashMap::with_capacity(settings.len());

        for instrument in settings {
            let instrument: InstrumentContractSettings = instrument.into();
            instruments.insert(instrument.symbol.clone(), instrument);
        }

        Self { instruments }
    }

    pub fn get(&self, symbol: &str) -> Option<&InstrumentContractSettings> {
        self.instruments.get(symbol)
    }

    pub fn resolve_multiplier(&self, symbol: &str) -> Result<f64, AggregatorError> {
        self.get(symbol)
            .map(|x| x.contract_multiplier())
            .ok_or_else(|| AggregatorError::UnknownSymbolConfiguration(AStr::from(symbol)))
    }

    pub fn insert_or_replace(&mut self, settings: InstrumentContractSettings) {
        self.instruments.insert(settings.symbol.clone(), settings);
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

impl Default for ContractSettingsCache {
    fn default() -> Self {
        Self::new(vec![
            InstrumentContractSettings::new("BTCUSD", 2),
            InstrumentContractSettings::new("ETHUSD", 3),
            InstrumentContractSettings::new("TTWO.US", 1),
        ])
    }
}

impl From<(&str, i32)> for InstrumentContractSettings {
    fn from((symbol, multiplier_exponent): (&str, i32)) -> Self {
        Self::new(symbol, multiplier_exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_multipliers() {
        let cache = ContractSettingsCache::default();

        assert_eq!(cache.resolve_multiplier("BTCUSD").unwrap(), 100.0);
        assert_eq!(cache.resolve_multiplier("ETHUSD").unwrap(), 1000.0);
        assert_eq!(cache.resolve_multiplier("TTWO.US").unwrap(), 10.0);
    }

    #[test]
    fn test_unknown_symbol_is_configuration_error() {
        let cache = ContractSettingsCache::default();

        let result = cache.resolve_multiplier("XAUUSD");

        assert!(matches!(
            result,
            Err(AggregatorError::UnknownSymbolConfiguration(symbol)) if &*symbol == "XAUUSD"
        ));
    }

    #[test]
    fn test_insert_or_replace() {
        let mut cache = ContractSettingsCache::new(vec![("EURUSD", 4)]);
        assert_eq!(cache.resolve_multiplier("EURUSD").unwrap(), 10000.0);

        cache.insert_or_replace(InstrumentContractSettings::new("EURUSD", 5));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.resolve_multiplier("EURUSD").unwrap(), 100000.0);
    }
}
