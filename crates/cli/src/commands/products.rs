//! Product views.

use std::io::Write;

use clap::Subcommand;
use stns_core::catalog::filter_by_name;
use stns_core::forms::{ProductForm, ProductUpdateForm};
use stns_core::pagination::{PRODUCT_PAGE_SIZES, Pager};
use stns_core::{Product, ProductId, Route};

use super::{CliError, Context, out, write_empty};

#[derive(Subcommand)]
pub enum ProductAction {
    /// List products, a page at a time
    List {
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Products per page (5, 12, 24, 35 or 48; default from `STNS_PAGE_SIZE`)
        #[arg(short, long)]
        size: Option<u32>,

        /// Only show products on this page whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Search all products by name
    Search { name: String },
    /// Create a product
    Create {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        price: String,

        #[arg(short, long)]
        quantity: String,

        /// Category name or id
        #[arg(short, long)]
        category: String,
    },
    /// Change a product's name, price and quantity
    Update {
        id: ProductId,

        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        price: String,

        #[arg(short, long)]
        quantity: String,
    },
    /// Delete a product
    Delete {
        id: ProductId,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

pub async fn run(ctx: &Context, action: ProductAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ProductAction::List { page, size, filter } => {
            list(ctx, page, size, filter.as_deref()).await
        }
        ProductAction::Search { name } => search(ctx, &name).await,
        ProductAction::Create {
            name,
            price,
            quantity,
            category,
        } => {
            let form = ProductForm {
                name: &name,
                price: &price,
                quantity: &quantity,
                category: &category,
            };
            create(ctx, form).await
        }
        ProductAction::Update {
            id,
            name,
            price,
            quantity,
        } => {
            let form = ProductUpdateForm {
                id,
                name: &name,
                price: &price,
                quantity: &quantity,
            };
            update(ctx, form).await
        }
        ProductAction::Delete { id, yes } => delete(ctx, id, yes).await,
    }
}

async fn list(
    ctx: &Context,
    page: u32,
    size: Option<u32>,
    filter: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    ctx.open(Route::Products)?;

    let size = size.unwrap_or(ctx.app.client().config().page_size);
    if !PRODUCT_PAGE_SIZES.contains(&size) {
        tracing::warn!(size, choices = ?PRODUCT_PAGE_SIZES, "Unusual page size");
    }
    let mut pager = Pager::new(size);
    let listing = ctx
        .scope
        .run(ctx.app.products().list(page.max(1), pager.size()))
        .await??;
    pager.set_total_pages(listing.total_pages);
    pager.go_to(page);

    let shown = filter_by_name(&listing.content, filter.unwrap_or_default());
    let mut out = out();
    if !write_empty(&mut out, shown.is_empty(), "products")? {
        for product in shown {
            write_product(&mut out, product)?;
        }
    }
    writeln!(out, "Page {}", pager.label())?;
    Ok(())
}

async fn search(ctx: &Context, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    ctx.open(Route::Products)?;
    let found = ctx.scope.run(ctx.app.products().search(name.trim())).await??;

    let mut out = out();
    if !write_empty(&mut out, found.is_empty(), "products")? {
        for product in &found {
            write_product(&mut out, product)?;
        }
    }
    Ok(())
}

async fn create(ctx: &Context, form: ProductForm<'_>) -> Result<(), Box<dyn std::error::Error>> {
    ctx.open(Route::NewProduct)?;

    // The category field takes a name, so resolve it against the live list.
    let categories = ctx.scope.run(ctx.app.categories().all()).await??;
    let product = form.validate(&categories)?;

    let created = ctx.scope.run(ctx.app.products().create(&product)).await??;
    writeln!(out(), "Created product {} ({})", created.name, created.id)?;
    Ok(())
}

async fn update(
    ctx: &Context,
    form: ProductUpdateForm<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    ctx.open(Route::Products)?;
    let update = form.validate()?;

    let updated = ctx.scope.run(ctx.app.products().update(&update)).await??;
    let mut out = out();
    write!(out, "Updated ")?;
    write_product(&mut out, &updated)?;
    Ok(())
}

async fn delete(
    ctx: &Context,
    id: ProductId,
    confirmed: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    ctx.open(Route::Products)?;
    if !confirmed {
        return Err(CliError::NotConfirmed("delete a product").into());
    }

    let deleted = ctx.scope.run(ctx.app.products().delete(id)).await??;
    match deleted {
        Some(product) => writeln!(out(), "Deleted product {} ({id})", product.name)?,
        None => writeln!(out(), "Deleted product {id}")?,
    }
    Ok(())
}

fn write_product(out: &mut impl Write, product: &Product) -> std::io::Result<()> {
    writeln!(
        out,
        "{:>6}  {:<30}  {:>10}  qty {}",
        product.id.as_i64(),
        product.name,
        product.price,
        product.quantity
    )
}
