//! Demo data for a fresh server: a small menu, a floor of tables and stock.

use common::{RestaurantId, Sku};
use domain::{Money, StockItem};
use engine::{Engine, InMemoryMenuCatalog, MenuItem, NewTable};

/// Menu served by the demo catalog.
pub fn demo_menu() -> InMemoryMenuCatalog {
    let menu = InMemoryMenuCatalog::new();
    menu.insert(
        MenuItem::new("burger", "Classic Burger", "mains", "grill", Money::from_cents(800), 12)
            .with_component("BEEF-PATTY", 1)
            .with_component("BUN", 1),
    );
    menu.insert(
        MenuItem::new("fries", "Fries", "sides", "fryer", Money::from_cents(350), 5)
            .with_component("POTATO", 2),
    );
    menu.insert(
        MenuItem::new("salad", "Garden Salad", "starters", "cold", Money::from_cents(650), 4)
            .with_component("LETTUCE", 1),
    );
    menu.insert(MenuItem::new(
        "lemonade",
        "Lemonade",
        "drinks",
        "bar",
        Money::from_cents(300),
        1,
    ));
    menu
}

/// Creates tables 1 to 8 and stocks every ingredient the demo menu uses.
#[tracing::instrument(skip(engine), fields(restaurant_id = %restaurant_id))]
pub async fn demo_floor(engine: &Engine, restaurant_id: RestaurantId) -> engine::Result<()> {
    for number in 1..=8 {
        engine
            .create_table(
                restaurant_id,
                NewTable {
                    number,
                    name: None,
                    capacity: if number <= 4 { 2 } else { 6 },
                    location: Some(if number <= 4 { "window" } else { "main hall" }.into()),
                },
            )
            .await?;
    }

    let stock = [
        ("BEEF-PATTY", "Beef patty", "pcs", 60),
        ("BUN", "Burger bun", "pcs", 60),
        ("POTATO", "Potato", "pcs", 200),
        ("LETTUCE", "Lettuce head", "pcs", 30),
    ];
    for (sku, name, unit, quantity) in stock {
        engine
            .add_stock_item(
                restaurant_id,
                StockItem {
                    sku: Sku::new(sku),
                    restaurant_id,
                    name: name.into(),
                    unit: unit.into(),
                    current_stock: quantity,
                    minimum_stock: quantity / 10,
                    reorder_level: quantity / 4,
                },
            )
            .await?;
    }

    tracing::info!("demo floor seeded");
    Ok(())
}
