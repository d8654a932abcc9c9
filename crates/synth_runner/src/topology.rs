//! Topology as dimension tables.
//!
//! Sales and weather rows only carry ids; these tables give the reporting
//! layer the locations, products and salespeople behind them. Each table has
//! a natural key (noted per row type) so repeated exports can be merged.

use std::collections::BTreeSet;

use chrono::Datelike;
use serde::Serialize;

use crate::config::TopologyConfig;
use crate::error::ConfigLoadError;

/// Keyed by `locale_id`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LocationRow {
    pub locale_id: u32,
    pub location: String,
    pub baseline_rate: f64,
    /// Weekday indices, Monday = 0, comma separated.
    pub open_days: String,
    pub open_start: u8,
    pub open_end: u8,
}

/// Keyed by `product_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ProductRow {
    pub product_id: u32,
}

/// Keyed by `(product_id, locale_id)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ProductLocationRow {
    pub product_id: u32,
    pub locale_id: u32,
}

/// Keyed by `recipient_id`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SalespersonRow {
    pub recipient_id: u32,
    pub locale_id: u32,
    pub hours_start: u8,
    pub hours_end: u8,
    pub performance_weight: f64,
}

/// Keyed by `(recipient_id, product_id)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SalespersonProductRow {
    pub recipient_id: u32,
    pub product_id: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TopologyTables {
    pub locations: Vec<LocationRow>,
    pub products: Vec<ProductRow>,
    pub product_locations: Vec<ProductLocationRow>,
    pub salespeople: Vec<SalespersonRow>,
    pub salesperson_products: Vec<SalespersonProductRow>,
}

impl TopologyTables {
    /// Flatten a topology. The topology is validated first, so the tables
    /// only ever describe something the generator would accept.
    ///
    /// A product belongs to a location when the locale lists it or one of
    /// its salespeople sells it.
    pub fn from_config(topology: &TopologyConfig) -> Result<Self, ConfigLoadError> {
        topology.build_locales()?;

        let mut tables = Self::default();
        let mut products = BTreeSet::new();
        let mut product_locations = BTreeSet::new();
        let mut salesperson_products = BTreeSet::new();

        for locale in &topology.locales {
            let open_days = locale
                .open_days
                .build()?
                .iter()
                .map(|day| day.num_days_from_monday().to_string())
                .collect::<Vec<_>>()
                .join(",");
            tables.locations.push(LocationRow {
                locale_id: locale.id,
                location: locale.location.clone(),
                baseline_rate: locale.baseline_rate,
                open_days,
                open_start: locale.open_hours.start,
                open_end: locale.open_hours.end,
            });

            for product in &locale.products {
                products.insert(*product);
                product_locations.insert((*product, locale.id));
            }
            for recipient in &locale.recipients {
                tables.salespeople.push(SalespersonRow {
                    recipient_id: recipient.id,
                    locale_id: locale.id,
                    hours_start: recipient.hours.start,
                    hours_end: recipient.hours.end,
                    performance_weight: recipient.performance_weight,
                });
                let sold = recipient.products.as_ref().unwrap_or(&locale.products);
                for product in sold {
                    products.insert(*product);
                    product_locations.insert((*product, locale.id));
                    salesperson_products.insert((recipient.id, *product));
                }
            }
        }

        tables.locations.sort_by_key(|row| row.locale_id);
        tables.salespeople.sort_by_key(|row| row.recipient_id);
        tables.products = products
            .into_iter()
            .map(|product_id| ProductRow { product_id })
            .collect();
        tables.product_locations = product_locations
            .into_iter()
            .map(|(product_id, locale_id)| ProductLocationRow {
                product_id,
                locale_id,
            })
            .collect();
        tables.salesperson_products = salesperson_products
            .into_iter()
            .map(|(recipient_id, product_id)| SalespersonProductRow {
                recipient_id,
                product_id,
            })
            .collect();
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synth_core::ConfigError;

    const TOPOLOGY: &str = r#"{
        "locales": [
            {
                "id": 2,
                "location": "Oulu",
                "open_days": [0, 2, 4],
                "baseline_rate": 12.0,
                "products": [4],
                "recipients": [{ "id": 21, "products": [4, 9] }]
            },
            {
                "id": 1,
                "location": "Helsinki",
                "baseline_rate": 30.0,
                "products": [1, 2],
                "recipients": [
                    { "id": 11, "hours": { "start": 12, "end": 20 }, "performance_weight": 2.0 },
                    { "id": 10 }
                ]
            }
        ]
    }"#;

    #[test]
    fn tables_are_sorted_and_deduplicated() {
        let topology = TopologyConfig::from_json(TOPOLOGY).unwrap();
        let tables = TopologyTables::from_config(&topology).unwrap();

        let locales: Vec<_> = tables.locations.iter().map(|l| l.locale_id).collect();
        assert_eq!(locales, vec![1, 2]);
        assert_eq!(tables.locations[0].open_days, "0,1,2,3,4,5");
        assert_eq!(tables.locations[1].open_days, "0,2,4");

        let products: Vec<_> = tables.products.iter().map(|p| p.product_id).collect();
        assert_eq!(products, vec![1, 2, 4, 9]);

        let salespeople: Vec<_> = tables.salespeople.iter().map(|s| s.recipient_id).collect();
        assert_eq!(salespeople, vec![10, 11, 21]);
        assert_eq!(tables.salespeople[0].hours_start, 8);
        assert_eq!(tables.salespeople[0].hours_end, 16);
    }

    #[test]
    fn salesperson_products_extend_product_locations() {
        let topology = TopologyConfig::from_json(TOPOLOGY).unwrap();
        let tables = TopologyTables::from_config(&topology).unwrap();

        assert!(tables.product_locations.contains(&ProductLocationRow {
            product_id: 9,
            locale_id: 2
        }));
        let inherited: Vec<_> = tables
            .salesperson_products
            .iter()
            .filter(|row| row.recipient_id == 10)
            .map(|row| row.product_id)
            .collect();
        assert_eq!(inherited, vec![1, 2]);
    }

    #[test]
    fn invalid_topology_is_not_flattened() {
        let json = r#"{ "locales": [{ "id": 1, "location": "X", "baseline_rate": -1.0 }] }"#;
        let topology = TopologyConfig::from_json(json).unwrap();
        assert!(matches!(
            TopologyTables::from_config(&topology),
            Err(ConfigLoadError::Invalid(ConfigError::NonPositiveBaselineRate { .. }))
        ));
    }
}
