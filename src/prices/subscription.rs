use ahash::AHashSet;

use crate::prices::dto::AStr;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubscriptionChanges {
    pub to_subscribe: Vec<AStr>,
    pub to_unsubscribe: Vec<AStr>,
}

impl SubscriptionChanges {
    pub fn is_empty(&self) -> bool {
        self.to_subscribe.is_empty() && self.to_unsubscribe.is_empty()
    }
}

/// Tracks which symbols are subscribed on the price feed.
#[derive(Debug, Default, Clone)]
pub struct PriceFeedSubscription {
    subscribed: Vec<AStr>,
}

impl PriceFeedSubscription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribed(&self) -> &[AStr] {
        &self.subscribed
    }

    /// Diffs the tracked set against `book_symbols` and adopts `book_symbols` as the new set.
    /// Both change lists keep the order symbols were first seen in.
    pub fn reconcile<'a>(
        &mut self,
        book_symbols: impl IntoIterator<Item = &'a AStr>,
    ) -> SubscriptionChanges {
        let target: Vec<AStr> = book_symbols.into_iter().cloned().collect();
        let target_set: AHashSet<&AStr> = target.iter().collect();
        let current_set: AHashSet<&AStr> = self.subscribed.iter().collect();

        let to_subscribe = target
            .iter()
            .filter(|x| !current_set.contains(x))
            .cloned()
            .collect();

        let to_unsubscribe = self
            .subscribed
            .iter()
            .filter(|x| !target_set.contains(x))
            .cloned()
            .collect();

        let changes = SubscriptionChanges {
            to_subscribe,
            to_unsubscribe,
        };

        self.subscribed = target;

        changes
    }
}
