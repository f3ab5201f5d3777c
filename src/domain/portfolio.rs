//! Portfolio holdings, cash and target weights.

use std::collections::BTreeMap;

/// A non-cash asset held on the venue, valued at its latest bid.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub asset: String,
    pub quantity: f64,
    pub price: f64,
}

impl Holding {
    pub fn value(&self) -> f64 {
        self.quantity * self.price
    }
}

/// Asset -> share of the basket. Weights sum to 1.0 across the basket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetWeights {
    weights: BTreeMap<String, f64>,
}

impl TargetWeights {
    /// Weight of `asset`, 0.0 when it is not in the basket.
    pub fn get(&self, asset: &str) -> f64 {
        self.weights.get(asset).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, asset: &str) -> bool {
        self.weights.contains_key(asset)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(a, &w)| (a.as_str(), w))
    }
}

impl FromIterator<(String, f64)> for TargetWeights {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            weights: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub holdings: BTreeMap<String, Holding>,
}

impl Portfolio {
    pub fn new(cash: f64) -> Self {
        Portfolio {
            cash,
            holdings: BTreeMap::new(),
        }
    }

    pub fn add_holding(&mut self, holding: Holding) {
        self.holdings.insert(holding.asset.clone(), holding);
    }

    pub fn get_holding(&self, asset: &str) -> Option<&Holding> {
        self.holdings.get(asset)
    }

    pub fn remove_holding(&mut self, asset: &str) -> Option<Holding> {
        self.holdings.remove(asset)
    }

    pub fn holding_value(&self, asset: &str) -> f64 {
        self.holdings.get(asset).map(Holding::value).unwrap_or(0.0)
    }

    /// Value of all non-cash holdings.
    pub fn holdings_value(&self) -> f64 {
        self.holdings.values().map(Holding::value).sum()
    }

    /// Holdings value plus `cash_share` of the cash reserve.
    pub fn value_with_cash_share(&self, cash_share: f64) -> f64 {
        self.holdings_value() + cash_share * self.cash
    }

    pub fn total_value(&self) -> f64 {
        self.value_with_cash_share(1.0)
    }

    /// Records a buy fill: spends `quantity * price` of cash.
    pub fn apply_buy(&mut self, asset: &str, quantity: f64, price: f64) {
        self.cash -= quantity * price;
        let holding = self
            .holdings
            .entry(asset.to_string())
            .or_insert_with(|| Holding {
                asset: asset.to_string(),
                quantity: 0.0,
                price,
            });
        holding.quantity += quantity;
    }

    /// Records a sell fill. Returns the proceeds added to cash.
    pub fn apply_sell(&mut self, asset: &str, quantity: f64, price: f64) -> f64 {
        let proceeds = quantity * price;
        self.cash += proceeds;
        if let Some(holding) = self.holdings.get_mut(asset) {
            holding.quantity = (holding.quantity - quantity).max(0.0);
        }
        proceeds
    }
}
