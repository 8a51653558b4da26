//! `oakline cart` subcommands.

use oakline_cart::api::ProductCatalog;
use oakline_cart::reconcile::ReconcileReport;
use oakline_cart::view::CartView;
use oakline_core::ProductId;
use tracing::info;

use super::{App, CliError};

/// Print the cart.
pub async fn show(app: &mut App) -> Result<(), CliError> {
    app.store.load().await?;
    render(app)
}

/// Add `quantity` of a product, looked up in the catalog first.
pub async fn add(app: &mut App, product_id: ProductId, quantity: u32) -> Result<(), CliError> {
    let product = app.client.product(product_id).await?;
    app.store.load().await?;
    app.store.add_line(&product, quantity).await?;
    info!(product_id = %product_id, quantity, "Added to cart");
    render(app)
}

pub async fn remove(app: &mut App, product_id: ProductId) -> Result<(), CliError> {
    app.store.load().await?;
    app.store.remove_line(product_id).await?;
    render(app)
}

pub async fn set(app: &mut App, product_id: ProductId, quantity: i64) -> Result<(), CliError> {
    app.store.load().await?;
    app.store.update_line_quantity(product_id, quantity).await?;
    render(app)
}

pub async fn clear(app: &mut App) -> Result<(), CliError> {
    app.store.load().await?;
    app.store.clear().await?;
    render(app)
}

/// Bring the store in line with the current credentials.
///
/// With a token and a saved local cart this merges the local lines into the
/// account cart; a failed merge can simply be retried.
pub async fn sync(app: &mut App) -> Result<(), CliError> {
    let report = app.store.refresh_session().await?;
    if !app.json {
        print_report(report.as_ref());
    }
    render(app)
}

#[allow(clippy::print_stdout)]
fn print_report(report: Option<&ReconcileReport>) {
    match report {
        Some(report) if !report.is_empty() => println!(
            "Merged {} item(s) into your account: {} new line(s), {} increased",
            report.merged_quantity(),
            report.inserted(),
            report.increased()
        ),
        _ => println!("Nothing to merge"),
    }
}

#[allow(clippy::print_stdout)]
fn render(app: &App) -> Result<(), CliError> {
    let view = app.store.cart().map_or_else(CartView::empty, CartView::from);

    if app.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("Cart ({})", app.store.phase());
    if view.is_empty() {
        println!("  (empty)");
    }
    for item in &view.items {
        let discount = item
            .discount
            .as_deref()
            .map(|d| format!(" [{d}]"))
            .unwrap_or_default();
        println!(
            "  #{:<6} {:<32} {:>3} x {:>10} = {:>10}{discount}",
            item.product_id, item.title, item.quantity, item.price, item.line_price
        );
    }
    println!("Items: {}  Subtotal: {}", view.item_count, view.subtotal);
    Ok(())
}
