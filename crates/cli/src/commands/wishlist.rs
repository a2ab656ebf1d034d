//! Wishlist commands.

use comfycube_core::ProductId;
use comfycube_storefront::session::AuthBackend;
use comfycube_storefront::wishlist::WishlistEntry;
use comfycube_storefront::{Result, Storefront};

/// `comfycube wishlist show`
pub fn show<A: AuthBackend>(storefront: &Storefront<A>) {
    let wishlist = storefront.wishlist();
    if wishlist.is_empty() {
        println!("Your wishlist is empty.");
        return;
    }
    for entry in wishlist.entries() {
        let category = entry.category_name.as_deref().unwrap_or("");
        println!(
            "{:<8} {:<36} {:>10}  {category}",
            entry.product_id.as_str(),
            entry.name,
            entry.price.to_string()
        );
    }
}

/// `comfycube wishlist toggle`
pub async fn toggle<A: AuthBackend>(storefront: &mut Storefront<A>, id: &str) -> Result<()> {
    let id = ProductId::new(id);

    // Unsaving works offline from the stored snapshot
    let entry = match storefront.wishlist().get(&id).cloned() {
        Some(entry) => entry,
        None => WishlistEntry::from(&storefront.catalog().get_product(&id).await?),
    };
    let name = entry.name.clone();

    if storefront.toggle_wishlist(entry).await? {
        println!("Saved {name} to your wishlist.");
    } else {
        println!("Removed {name} from your wishlist.");
    }
    Ok(())
}

/// `comfycube wishlist remove`
pub async fn remove<A: AuthBackend>(storefront: &mut Storefront<A>, id: &str) -> Result<()> {
    storefront
        .remove_from_wishlist(&ProductId::new(id))
        .await?;
    println!("Removed {id} from your wishlist.");
    Ok(())
}
