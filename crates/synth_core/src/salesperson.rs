use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::apportion::{apportion_evenly, check_conserved};
use crate::calendar::HourWindow;
use crate::error::{ConfigError, InvariantViolation};
use crate::ids::{ProductId, RecipientId};

/// A sales recipient: decides when it can take sales and how its share is
/// spread across products.
pub trait AvailabilityAssigner: Send + Sync + std::fmt::Debug {
    fn id(&self) -> RecipientId;

    /// Relative share of a locale's sales while available. Always positive.
    fn performance_weight(&self) -> f64;

    /// Products this recipient sells, in ascending id order.
    fn products(&self) -> &BTreeSet<ProductId>;

    fn is_available(&self, ts: DateTime<Utc>) -> bool;

    /// Split `quantity` across products. The shares always sum to `quantity`.
    fn split_over_products(
        &self,
        quantity: u64,
    ) -> Result<BTreeMap<ProductId, u64>, InvariantViolation>;
}

/// Salesperson with a fixed daily availability window and a uniform product
/// split.
///
/// Availability is `start <= hour < end` within one day and depends only on
/// the hour; the owning locale decides which days are worked. When the split leaves a remainder, the lowest
/// product ids receive one extra unit each.
#[derive(Clone, Debug, PartialEq)]
pub struct SimpleSalesperson {
    id: RecipientId,
    availability: HourWindow,
    performance_weight: f64,
    products: BTreeSet<ProductId>,
}

impl SimpleSalesperson {
    pub fn new(
        id: RecipientId,
        availability: HourWindow,
        performance_weight: f64,
        products: impl IntoIterator<Item = ProductId>,
    ) -> Result<Self, ConfigError> {
        if !performance_weight.is_finite() || performance_weight <= 0.0 {
            return Err(ConfigError::NonPositivePerformanceWeight {
                recipient: id,
                weight: performance_weight,
            });
        }
        if availability.wraps_midnight() {
            return Err(ConfigError::WrappingAvailability {
                recipient: id,
                start: availability.start(),
                end: availability.end(),
            });
        }
        let mut set = BTreeSet::new();
        for product in products {
            if !set.insert(product) {
                return Err(ConfigError::DuplicateProduct {
                    recipient: id,
                    product,
                });
            }
        }
        if set.is_empty() {
            return Err(ConfigError::EmptyProductSet { recipient: id });
        }
        Ok(Self {
            id,
            availability,
            performance_weight,
            products: set,
        })
    }

    pub fn availability(&self) -> HourWindow {
        self.availability
    }
}

impl AvailabilityAssigner for SimpleSalesperson {
    fn id(&self) -> RecipientId {
        self.id
    }

    fn performance_weight(&self) -> f64 {
        self.performance_weight
    }

    fn products(&self) -> &BTreeSet<ProductId> {
        &self.products
    }

    fn is_available(&self, ts: DateTime<Utc>) -> bool {
        self.availability.contains(ts)
    }

    fn split_over_products(
        &self,
        quantity: u64,
    ) -> Result<BTreeMap<ProductId, u64>, InvariantViolation> {
        let shares = apportion_evenly(quantity, self.products.len())?;
        check_conserved("product split", quantity, &shares)?;
        Ok(self.products.iter().copied().zip(shares).collect())
    }
}
