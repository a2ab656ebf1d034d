//! Catalog browsing and reviews.

use comfycube_core::{CategoryId, ProductId};
use comfycube_storefront::catalog::FEATURED_PRODUCTS_LIMIT;
use comfycube_storefront::models::{Product, Review};
use comfycube_storefront::session::AuthBackend;
use comfycube_storefront::view::ProductView;
use comfycube_storefront::{Result, Storefront};

/// `comfycube products`
pub async fn products<A: AuthBackend>(
    storefront: &Storefront<A>,
    category: Option<&str>,
    featured: bool,
) -> Result<()> {
    let catalog = storefront.catalog();
    let mut products = if featured {
        catalog.featured(FEATURED_PRODUCTS_LIMIT).await?
    } else {
        catalog.list_products().await?
    };

    if let Some(category) = category {
        let category = CategoryId::new(category);
        products.retain(|p| p.category_id == category);
    }

    if products.is_empty() {
        println!("No products found.");
        return Ok(());
    }
    for product in &products {
        println!("{}", product_row(product));
    }
    Ok(())
}

/// `comfycube categories`
pub async fn categories<A: AuthBackend>(storefront: &Storefront<A>) -> Result<()> {
    let catalog = storefront.catalog();
    let categories = catalog.list_categories().await?;
    let counts = catalog.category_counts().await?;

    for category in &categories {
        let count = counts.get(&category.id).copied().unwrap_or(0);
        let noun = if count == 1 { "product" } else { "products" };
        println!("{:<12} {} ({count} {noun})", category.id.as_str(), category.name);
    }
    Ok(())
}

/// `comfycube product <id>`
pub async fn product<A: AuthBackend>(storefront: &Storefront<A>, id: &str) -> Result<()> {
    let id = ProductId::new(id);
    let mut view = ProductView::new();
    storefront.load_product_view(&mut view, &id).await?;

    let Some(product) = view.product() else {
        return Ok(());
    };

    println!("{}", product.name);
    if let Some(category) = &product.category_name {
        println!("Category: {category}");
    }
    println!("Price: {}", product.price);
    if !product.in_stock() {
        println!("Out of stock");
    } else if let Some(left) = view.low_stock() {
        println!("Only {left} left");
    }
    if let Some(measurements) = &product.measurements {
        println!("Measurements: {measurements}");
    }
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }

    if let Some(line) = storefront.cart().get(&id) {
        println!();
        println!("In your cart: {}", line.quantity);
    }
    if storefront.wishlist().is_in_wishlist(&id) {
        println!("Saved to your wishlist");
    }

    print_reviews(view.reviews());

    if !view.similar().is_empty() {
        println!();
        println!("You may also like:");
        for similar in view.similar() {
            println!("  {}", product_row(similar));
        }
    }
    Ok(())
}

/// `comfycube review <id>`
pub async fn review<A: AuthBackend>(
    storefront: &Storefront<A>,
    id: &str,
    rating: i64,
    comment: &str,
) -> Result<()> {
    let review = storefront
        .submit_review(&ProductId::new(id), rating, comment)
        .await?;
    println!("Thanks! Your {} review was posted.", review.rating);
    Ok(())
}

fn print_reviews(reviews: &[Review]) {
    println!();
    if reviews.is_empty() {
        println!("No reviews yet.");
        return;
    }

    let total: u32 = reviews.iter().map(|r| u32::from(r.rating.value())).sum();
    let count = u32::try_from(reviews.len()).unwrap_or(u32::MAX);
    println!(
        "Reviews ({count}, average {:.1}/5):",
        f64::from(total) / f64::from(count)
    );
    for review in reviews {
        println!(
            "  {} {} - {}",
            review.created_at.format("%Y-%m-%d"),
            review.rating,
            review.comment
        );
    }
}

fn product_row(product: &Product) -> String {
    let stock = match product.quantity_available {
        0 => "Out of stock".to_string(),
        n if product.low_stock().is_some() => format!("Only {n} left"),
        _ => String::new(),
    };
    format!(
        "{:<8} {:<36} {:>10}  {stock}",
        product.id.as_str(),
        product.name,
        product.price.to_string()
    )
    .trim_end()
    .to_string()
}
