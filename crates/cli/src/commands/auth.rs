//! Session commands: login, logout, register and status.

use std::io::{self, BufRead, Write};

use clap::Args;
use secrecy::SecretString;
use stns_client::Registration;
use stns_core::forms::{LoginForm, RegistrationForm};

use super::{CliError, Context, out};

/// Arguments of `stns register`.
#[derive(Args)]
pub struct RegisterArgs {
    #[arg(short, long)]
    name: String,

    #[arg(short, long)]
    email: String,

    #[arg(short, long)]
    password: String,

    #[arg(long)]
    confirm_password: String,

    /// Comma-separated roles, e.g. `ADMIN`
    #[arg(short, long)]
    roles: String,
}

/// Log in and land on the new-category view.
pub async fn login(
    ctx: &Context,
    username: &str,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    ctx.app.open(stns_core::Route::Login);

    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };
    LoginForm {
        username,
        password: &password,
    }
    .validate()?;

    let password = SecretString::from(password);
    let navigation = ctx.scope.run(ctx.app.login(username.trim(), &password)).await??;
    writeln!(out(), "Logged in as {}. Next: {}", username.trim(), navigation.target())?;
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    ctx.app.logout();
    writeln!(out(), "Logged out.")?;
    Ok(())
}

pub async fn register(ctx: &Context, args: RegisterArgs) -> Result<(), Box<dyn std::error::Error>> {
    ctx.app.open(stns_core::Route::Register);

    let email = RegistrationForm {
        name: &args.name,
        email: &args.email,
        password: &args.password,
        confirm_password: &args.confirm_password,
        roles: &args.roles,
    }
    .validate()?;

    let password = SecretString::from(args.password);
    let confirm_password = SecretString::from(args.confirm_password);
    let registration = Registration {
        name: args.name.trim(),
        email: &email,
        password: &password,
        confirm_password: &confirm_password,
        roles: args.roles.trim(),
    };

    let account = ctx.scope.run(ctx.app.register(&registration)).await??;
    let name = if account.name.is_empty() {
        registration.name
    } else {
        &account.name
    };
    writeln!(out(), "Registered {name} <{email}>. Run `stns login` to continue.")?;
    Ok(())
}

pub fn status(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let session = ctx.app.session();
    let mut out = out();
    writeln!(out, "Session: {}", session.state())?;
    if let Some(tokens) = session.tokens() {
        writeln!(out, "Token issued: {}", tokens.issued_at.to_rfc3339())?;
        writeln!(
            out,
            "Refresh token: {}",
            if tokens.refresh_token.is_some() { "present" } else { "absent" }
        )?;
    }
    writeln!(out, "Backend: {}", ctx.app.client().config().base_url)?;
    Ok(())
}

fn read_password() -> Result<String, CliError> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(CliError::Password)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
