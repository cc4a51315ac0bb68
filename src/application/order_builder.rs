use log::debug;

use crate::domain::errors::DomainError;
use crate::domain::intent::ParsedIntent;
use crate::domain::order::{DomainOrder, OrderLine, OrderStatus, OrderType, RoomState};
use crate::domain::ports::CatalogStore;
use crate::matching::resolve_product;

/// Assembles a validated `DomainOrder` from a parsed intent and a fresh
/// catalog snapshot.
///
/// Building never fails on unresolved products or rooms; those recover to
/// null references and the order proceeds. The only error path is the
/// lookup store itself being unreachable.
pub struct OrderBuilder<C> {
    catalog: C,
}

impl<C: CatalogStore> OrderBuilder<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    pub fn build(&self, parsed: &ParsedIntent, user_id: i64) -> Result<DomainOrder, DomainError> {
        let products = self.catalog.products(user_id)?;

        // One line per requested product, resolved or not. Never drop an
        // item the customer asked for.
        let lines: Vec<OrderLine> = parsed
            .products
            .iter()
            .map(|p| {
                let matched = resolve_product(&p.name, &products);
                if matched.is_none() {
                    debug!("no catalog match for '{}' (user {})", p.name, user_id);
                }
                OrderLine {
                    product_id: matched.map(|m| m.id),
                    quantity: if p.quantity >= 1 { p.quantity } else { 1 },
                    price: if p.price > 0 {
                        p.price
                    } else {
                        matched.map(|m| m.retail_cost).unwrap_or(0)
                    },
                }
            })
            .collect();

        let mut room_id = None;
        if let Some(room_name) = &parsed.room {
            let rooms = self.catalog.rooms_by_name(room_name, user_id)?;
            room_id = rooms.first().map(|r| r.id);
            if room_id.is_none() {
                debug!("no room match for '{}' (user {})", room_name, user_id);
            }
        }

        Ok(DomainOrder {
            order_type: OrderType::Sale,
            room_id,
            room_state: RoomState::InUse,
            note: parsed.note.clone(),
            discount: parsed.discount,
            discount_type: parsed.discount_type,
            status: OrderStatus::Unpaid,
            payment: None,
            lines,
            user_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{CatalogEntry, RoomEntry};
    use crate::domain::intent::{DiscountType, ProductIntent};

    struct FakeCatalog {
        products: Vec<CatalogEntry>,
        rooms: Vec<RoomEntry>,
    }

    impl CatalogStore for FakeCatalog {
        fn products(&self, _user_id: i64) -> Result<Vec<CatalogEntry>, DomainError> {
            Ok(self.products.clone())
        }

        fn rooms_by_name(
            &self,
            partial_name: &str,
            _user_id: i64,
        ) -> Result<Vec<RoomEntry>, DomainError> {
            Ok(self
                .rooms
                .iter()
                .filter(|r| r.name.contains(partial_name))
                .cloned()
                .collect())
        }
    }

    struct DownCatalog;

    impl CatalogStore for DownCatalog {
        fn products(&self, _user_id: i64) -> Result<Vec<CatalogEntry>, DomainError> {
            Err(DomainError::LookupUnavailable("connection refused".into()))
        }

        fn rooms_by_name(
            &self,
            _partial_name: &str,
            _user_id: i64,
        ) -> Result<Vec<RoomEntry>, DomainError> {
            Err(DomainError::LookupUnavailable("connection refused".into()))
        }
    }

    fn catalog() -> FakeCatalog {
        FakeCatalog {
            products: vec![
                CatalogEntry {
                    id: 1,
                    name: "phở bò".into(),
                    retail_cost: 50000,
                    unit: Some("bát".into()),
                },
                CatalogEntry {
                    id: 2,
                    name: "chả giò".into(),
                    retail_cost: 30000,
                    unit: None,
                },
            ],
            rooms: vec![RoomEntry {
                id: 9,
                name: "bàn 3".into(),
            }],
        }
    }

    fn intent(products: Vec<ProductIntent>, room: Option<&str>) -> ParsedIntent {
        ParsedIntent {
            products,
            room: room.map(str::to_string),
            note: None,
            discount: 0,
            discount_type: DiscountType::Absolute,
        }
    }

    #[test]
    fn resolves_product_and_takes_catalog_price() {
        let builder = OrderBuilder::new(catalog());
        let parsed = intent(
            vec![ProductIntent {
                name: "pho bo".into(),
                quantity: 1,
                price: 0,
            }],
            None,
        );

        let order = builder.build(&parsed, 3).unwrap();
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].product_id, Some(1));
        assert_eq!(order.lines[0].quantity, 1);
        assert_eq!(order.lines[0].price, 50000);
        assert_eq!(order.user_id, 3);
    }

    #[test]
    fn explicit_price_beats_catalog_price() {
        let builder = OrderBuilder::new(catalog());
        let parsed = intent(
            vec![ProductIntent {
                name: "chả giò".into(),
                quantity: 3,
                price: 25000,
            }],
            None,
        );

        let order = builder.build(&parsed, 3).unwrap();
        assert_eq!(order.lines[0].price, 25000);
        assert_eq!(order.lines[0].quantity, 3);
    }

    #[test]
    fn unresolved_product_keeps_its_line() {
        let builder = OrderBuilder::new(catalog());
        let parsed = intent(
            vec![
                ProductIntent {
                    name: "pho bo".into(),
                    quantity: 1,
                    price: 0,
                },
                ProductIntent {
                    name: "spaghetti carbonara".into(),
                    quantity: 2,
                    price: 0,
                },
            ],
            None,
        );

        let order = builder.build(&parsed, 3).unwrap();
        assert_eq!(order.lines.len(), parsed.products.len());
        assert_eq!(order.lines[1].product_id, None);
        assert_eq!(order.lines[1].price, 0);
        assert_eq!(order.lines[1].quantity, 2);
    }

    #[test]
    fn zero_quantity_defaults_to_one() {
        let builder = OrderBuilder::new(catalog());
        let parsed = intent(
            vec![ProductIntent {
                name: "pho bo".into(),
                quantity: 0,
                price: 0,
            }],
            None,
        );

        let order = builder.build(&parsed, 3).unwrap();
        assert_eq!(order.lines[0].quantity, 1);
    }

    #[test]
    fn partial_room_match_assigns_room() {
        let builder = OrderBuilder::new(catalog());
        let parsed = intent(vec![], Some("bàn 3"));

        let order = builder.build(&parsed, 3).unwrap();
        assert_eq!(order.room_id, Some(9));
    }

    #[test]
    fn missing_room_is_not_an_error() {
        let builder = OrderBuilder::new(catalog());
        let parsed = intent(vec![], Some("phòng VIP"));

        let order = builder.build(&parsed, 3).unwrap();
        assert_eq!(order.room_id, None);
    }

    #[test]
    fn unreachable_lookup_propagates() {
        let builder = OrderBuilder::new(DownCatalog);
        let parsed = intent(vec![], None);

        let err = builder.build(&parsed, 3).unwrap_err();
        assert!(matches!(err, DomainError::LookupUnavailable(_)));
    }
}
