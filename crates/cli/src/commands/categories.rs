//! Category views.

use std::io::Write;

use clap::Subcommand;
use stns_client::FailureKind;
use stns_core::catalog::filter_by_name;
use stns_core::forms::CategoryForm;
use stns_core::pagination::{CATEGORY_PAGE_SIZE, Pager};
use stns_core::{Category, Route};

use super::{CliError, Context, out, write_empty};

/// Shown when creating a category fails on the server side.
const SUBMIT_FAILED_MESSAGE: &str =
    "An error occurred while submitting the category. Please try again.";

#[derive(Subcommand)]
pub enum CategoryAction {
    /// List categories, a page at a time
    List {
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        #[arg(short, long, default_value_t = CATEGORY_PAGE_SIZE)]
        size: u32,

        /// Only show categories whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Create a category
    Create { name: String },
}

pub async fn run(ctx: &Context, action: CategoryAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        CategoryAction::List { page, size, filter } => {
            list(ctx, page, size, filter.as_deref()).await
        }
        CategoryAction::Create { name } => create(ctx, &name).await,
    }
}

async fn list(
    ctx: &Context,
    page: u32,
    size: u32,
    filter: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    ctx.open(Route::Categories)?;

    if let Some(query) = filter {
        let all = ctx.scope.run(ctx.app.categories().all()).await??;
        let matches = filter_by_name(&all, query);
        let mut out = out();
        if !write_empty(&mut out, matches.is_empty(), "categories")? {
            for category in matches {
                write_category(&mut out, category)?;
            }
        }
        return Ok(());
    }

    let mut pager = Pager::new(size);
    let listing = ctx
        .scope
        .run(ctx.app.categories().list(page.max(1), pager.size()))
        .await??;
    pager.set_total_pages(listing.total_pages);
    pager.go_to(page);

    let mut out = out();
    if !write_empty(&mut out, listing.content.is_empty(), "categories")? {
        for category in &listing.content {
            write_category(&mut out, category)?;
        }
    }
    writeln!(out, "Page {}", pager.label())?;
    Ok(())
}

async fn create(ctx: &Context, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    ctx.open(Route::NewCategory)?;
    let request = CategoryForm { name }.validate()?;

    match ctx.scope.run(ctx.app.categories().create(&request)).await? {
        Ok(category) => {
            writeln!(out(), "Created category {} ({})", category.name, category.id)?;
            Ok(())
        }
        Err(e) if matches!(e.kind(), FailureKind::Server | FailureKind::Network) => {
            tracing::debug!(error = %e, "Category submission failed");
            Err(CliError::Submit(SUBMIT_FAILED_MESSAGE).into())
        }
        Err(e) => Err(e.into()),
    }
}

fn write_category(out: &mut impl Write, category: &Category) -> std::io::Result<()> {
    writeln!(
        out,
        "{:>6}  {}  ({} products)",
        category.id.as_i64(),
        category.name,
        category.products.len()
    )
}
