use anyhow::Result;
use clap::Parser;

use pv_core::tracing_init::{default_filter, init_tracing};
use pv_setup::{ADMIN_NAME, SetupArgs};

/// PV sponsorship one-time initializer.
#[derive(Debug, Parser)]
#[command(name = "pv-setup", version, about)]
struct Cli {
    #[command(flatten)]
    setup: SetupArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = default_filter("info", &["pv_setup", "pv_server", "pv_core"]);
    init_tracing(&filter, false);

    let cli = Cli::parse();
    let report = pv_setup::run(&cli.setup).await?;

    #[allow(clippy::print_stdout)]
    {
        if report.secret_written {
            let config = report.config_path.display();
            println!("Session secret written to {config}");
        }
        if let Some(password) = &report.admin_password {
            println!();
            let database = report.database_path.display();
            println!("Admin account created in {database}");
            println!("  name:     {ADMIN_NAME}");
            println!("  password: {password}");
            println!();
            println!("Store this password now. It is not shown again.");
        }
    }

    Ok(())
}
