//! `oakline products`.

use oakline_cart::api::ProductCatalog;
use oakline_core::{CategoryId, Price};

use super::{App, CliError};

/// List catalog products, optionally filtered by category.
#[allow(clippy::print_stdout)]
pub async fn list(app: &App, category: Option<CategoryId>) -> Result<(), CliError> {
    let products = app.client.products(category).await?;

    if app.json {
        println!("{}", serde_json::to_string_pretty(&products)?);
        return Ok(());
    }

    if products.is_empty() {
        println!("No products found");
        return Ok(());
    }

    for product in &products {
        let price = if product.has_discount() {
            format!(
                "{} (was {})",
                Price::usd(product.discounted_price()).display(),
                product.unit_price().display()
            )
        } else {
            product.unit_price().display()
        };
        println!(
            "  #{:<6} {:<32} {:>10}  {} in stock",
            product.id, product.name, price, product.available_quantity
        );
    }
    Ok(())
}
