//! Cart views.

use std::io::Write;

use clap::Subcommand;
use stns_core::{Cart, CartItem, ProductId, Route};

use super::{CliError, Context, out};

#[derive(Subcommand)]
pub enum CartAction {
    /// Add a product to the cart
    Add {
        id: ProductId,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product from the cart
    Remove { id: ProductId },
    /// Empty the cart
    Clear,
    /// Show the cart and its total
    Show,
    /// Place the order and empty the cart
    Checkout,
}

pub async fn run(ctx: &Context, action: CartAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        CartAction::Add { id, quantity } => add(ctx, id, quantity).await,
        CartAction::Remove { id } => remove(ctx, id),
        CartAction::Clear => clear(ctx),
        CartAction::Show => show(ctx),
        CartAction::Checkout => checkout(ctx),
    }
}

/// Products are added from the product list, so this needs a session.
async fn add(
    ctx: &Context,
    id: ProductId,
    quantity: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    ctx.open(Route::Products)?;
    let products = ctx.scope.run(ctx.app.products().all()).await??;
    let product = products
        .into_iter()
        .find(|p| p.id == id)
        .ok_or(CliError::UnknownProduct(id))?;

    let mut cart = ctx.app.cart().load();
    cart.add(CartItem {
        id: product.id,
        name: product.name,
        quantity,
        price: product.price,
    });
    ctx.app.cart().save(&cart)?;

    ctx.app.open(Route::Cart);
    write_cart(&mut out(), &cart)?;
    Ok(())
}

fn remove(ctx: &Context, id: ProductId) -> Result<(), Box<dyn std::error::Error>> {
    ctx.open(Route::Cart)?;
    let mut cart = ctx.app.cart().load();
    if !cart.remove(id) {
        return Err(CliError::UnknownProduct(id).into());
    }
    ctx.app.cart().save(&cart)?;
    write_cart(&mut out(), &cart)?;
    Ok(())
}

fn clear(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    ctx.open(Route::Cart)?;
    ctx.app.cart().clear()?;
    writeln!(out(), "Cart cleared.")?;
    Ok(())
}

fn show(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    ctx.open(Route::Cart)?;
    write_cart(&mut out(), &ctx.app.cart().load())?;
    Ok(())
}

fn checkout(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let ordered = ctx.app.checkout()?;
    let mut out = out();
    if ordered.is_empty() {
        writeln!(out, "Your cart is empty.")?;
        return Ok(());
    }
    write_cart(&mut out, &ordered)?;
    writeln!(out, "Thank you for your order!")?;
    Ok(())
}

fn write_cart(out: &mut impl Write, cart: &Cart) -> std::io::Result<()> {
    if cart.is_empty() {
        return writeln!(out, "Your cart is empty.");
    }
    for item in cart.items() {
        writeln!(
            out,
            "{:>6}  {:<30}  {:>3} x {:>10}",
            item.id.as_i64(),
            item.name,
            item.quantity,
            item.price
        )?;
    }
    writeln!(out, "Total: {}", cart.total_display())
}
