//! One-time initializer for a PV sponsorship deployment.
//!
//! Writes a generated session secret into the config file and creates the
//! `admin` account with a generated password, which is reported once.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use pv_core::Config;
use pv_core::config::MIN_SECRET_LEN;
use pv_server::auth::Role;
use pv_server::auth::password::hash_password;
use pv_server::storage::{Store, UserRepository};
use rand::RngExt;
use tracing::info;

/// Name of the account created on first setup.
pub const ADMIN_NAME: &str = "admin";

/// Length of the generated admin password.
pub const ADMIN_PASSWORD_LEN: usize = 20;

/// Length of the generated session secret.
pub const SECRET_LEN: usize = 64;

#[derive(Debug, Args)]
pub struct SetupArgs {
    /// Config file to create or update.
    #[arg(
        long,
        env = "PV_CONFIG",
        default_value = pv_core::config::DEFAULT_CONFIG_FILE
    )]
    pub config: PathBuf,

    /// Generate a new session secret even if one is configured. Signs out
    /// every user.
    #[arg(long)]
    pub force_secret: bool,
}

/// What a setup run did.
#[derive(Debug)]
pub struct SetupReport {
    pub config_path: PathBuf,
    pub database_path: PathBuf,
    /// Whether a new session secret was written.
    pub secret_written: bool,
    /// Password of the freshly created admin account.
    pub admin_password: Option<String>,
}

fn generate_secret(len: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Read the config file if it exists, defaults otherwise. Environment
/// overrides are not applied so they never end up in the written file.
fn read_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    Ok(Config::from_toml(&content)?)
}

/// Initialize the deployment described by `args`.
///
/// Refuses to create an admin when any account exists. With
/// `force_secret` an existing deployment only gets its secret rotated.
pub async fn run(args: &SetupArgs) -> Result<SetupReport> {
    let mut config = read_config(&args.config)?;

    let store = Store::open(&config.database)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.path.display()))?;
    let users = UserRepository::new(store);

    let initialized = users.has_users().await?;
    if initialized && !args.force_secret {
        bail!(
            "{} already has user accounts; refusing to create another admin",
            config.database.path.display()
        );
    }

    let secret_written = args.force_secret || config.session.secret.len() < MIN_SECRET_LEN;
    if secret_written {
        config.session.secret = generate_secret(SECRET_LEN);
        config.save(&args.config)?;
        info!(path = %args.config.display(), "Session secret written");
    }

    let admin_password = if initialized {
        None
    } else {
        let password = generate_secret(ADMIN_PASSWORD_LEN);
        let hash = hash_password(&password)
            .map_err(|e| anyhow::anyhow!("Password hashing failed: {e}"))?;
        let uid = users.create(ADMIN_NAME, &hash, Role::Admin).await?;
        info!(uid, "Admin account created");
        Some(password)
    };

    Ok(SetupReport {
        config_path: args.config.clone(),
        database_path: config.database.path,
        secret_written,
        admin_password,
    })
}
