//! Sign-in, sign-up and sign-out.

use comfycube_core::Role;
use comfycube_storefront::session::{AuthBackend, full_name};
use comfycube_storefront::{Result, Storefront};

/// `comfycube signin`
pub async fn sign_in<A: AuthBackend>(
    storefront: &mut Storefront<A>,
    email: &str,
    password: &str,
) -> Result<()> {
    let user = storefront.sign_in(email, password).await?;
    println!("Signed in as {} <{}>", user.name, user.email);
    Ok(())
}

/// `comfycube signup`
pub async fn sign_up<A: AuthBackend>(
    storefront: &mut Storefront<A>,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
    admin: bool,
) -> Result<()> {
    let role = if admin { Role::Admin } else { Role::User };
    let user = storefront
        .sign_up(&full_name(first_name, last_name), email, password, role)
        .await?;
    println!("Welcome, {}! Your account is ready.", user.name);
    Ok(())
}

/// `comfycube signout`
pub fn sign_out<A: AuthBackend>(storefront: &mut Storefront<A>) -> Result<()> {
    storefront.sign_out()?;
    println!("Signed out.");
    Ok(())
}

/// `comfycube whoami`
pub fn whoami<A: AuthBackend>(storefront: &Storefront<A>) {
    match storefront.user() {
        Some(user) => {
            println!("{} <{}>", user.name, user.email);
            println!("Role: {}", user.role);
        }
        None => println!("Not signed in."),
    }
}
