//! Cart commands.

use comfycube_core::ProductId;
use comfycube_storefront::cart::SyncState;
use comfycube_storefront::session::AuthBackend;
use comfycube_storefront::sync::Reconciled;
use comfycube_storefront::{Result, Storefront};

/// `comfycube cart show`
pub fn show<A: AuthBackend>(storefront: &Storefront<A>) {
    let cart = storefront.cart();
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    for line in cart.lines() {
        let marker = match line.sync {
            SyncState::Pending(_) => " (syncing)",
            SyncState::Local | SyncState::Confirmed => "",
        };
        println!(
            "{:<8} {:<36} {:>3} x {:>10} = {:>10}{marker}",
            line.product_id.as_str(),
            line.name,
            line.quantity,
            line.price.to_string(),
            line.subtotal().to_string()
        );
    }
    println!();
    println!("Items: {}", cart.item_count());
    println!("Total: {}", cart.total());
}

/// `comfycube cart add`
pub async fn add<A: AuthBackend>(
    storefront: &mut Storefront<A>,
    id: &str,
    quantity: u32,
) -> Result<()> {
    let product = storefront.catalog().get_product(&ProductId::new(id)).await?;
    let outcome = storefront.add_to_cart(&product, quantity).await?;

    let in_cart = storefront
        .cart()
        .get(&product.id)
        .map_or(0, |line| line.quantity);
    println!("{} x {} in your cart{}", in_cart, product.name, suffix(outcome));
    Ok(())
}

/// `comfycube cart update`
pub async fn update<A: AuthBackend>(
    storefront: &mut Storefront<A>,
    id: &str,
    quantity: i64,
) -> Result<()> {
    let id = ProductId::new(id);
    if storefront.cart().get(&id).is_none() {
        println!("{id} is not in your cart.");
        return Ok(());
    }

    let outcome = storefront.update_cart_quantity(&id, quantity).await?;
    match storefront.cart().get(&id) {
        Some(line) => println!("{} x {}{}", line.quantity, line.name, suffix(outcome)),
        None => println!("Removed {id}{}", suffix(outcome)),
    }
    Ok(())
}

/// `comfycube cart remove`
pub async fn remove<A: AuthBackend>(storefront: &mut Storefront<A>, id: &str) -> Result<()> {
    let id = ProductId::new(id);
    let outcome = storefront.remove_from_cart(&id).await?;
    println!("Removed {id}{}", suffix(outcome));
    Ok(())
}

/// `comfycube cart clear`
pub async fn clear<A: AuthBackend>(storefront: &mut Storefront<A>) -> Result<()> {
    storefront.clear_cart().await?;
    println!("Your cart is empty.");
    Ok(())
}

fn suffix(outcome: Reconciled) -> &'static str {
    match outcome {
        Reconciled::Confirmed => " (saved to your account)",
        Reconciled::Discarded | Reconciled::LocalOnly => "",
    }
}
