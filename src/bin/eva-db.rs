//! Database maintenance tool for the eva application database.
//!
//! One subcommand per procedure; each opens a single connection, runs its
//! fixed queries, prints a report to stdout, and closes the connection.
//!
//! Failures are reported, not propagated: any error during connect, query,
//! or commit is printed as `Error: ...` and the process exits with status 0.
//! These are best-effort operator tools, not pipeline stages.
//!
//! # Examples
//!
//! ```sh
//! eva-db show
//! eva-db check-malformed
//! eva-db fix-urls --base-url https://eva.example.com
//! ```

use clap::{Args as ClapArgs, Parser, Subcommand};
use eva_services::db::{fix, report, ConnectParams};
use sqlx::Connection;

#[derive(Parser, Debug)]
#[command(
    name = "eva-db",
    about = "eva database maintenance: inspect and patch URL columns"
)]
struct Args {
    #[command(flatten)]
    connect: ConnectArgs,

    #[command(subcommand)]
    command: Command,
}

/// Connection flags, defaulting to the development database.
#[derive(ClapArgs, Debug)]
struct ConnectArgs {
    /// Database host.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Database port.
    #[arg(long, default_value_t = 5432)]
    port: u16,

    /// Database user.
    #[arg(long, default_value = "postgres")]
    user: String,

    /// Database password.
    #[arg(long, default_value = "password")]
    password: String,

    /// Database name.
    #[arg(long, default_value = "eva_db")]
    dbname: String,
}

impl ConnectArgs {
    fn params(&self) -> ConnectParams {
        ConnectParams {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.dbname.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dump users, girls, recent conversations, and recent transactions.
    Show,
    /// List girls with a non-empty avatar URL.
    Avatars,
    /// Show the first few avatar and media URLs.
    CheckUrls,
    /// List up to ten girls with avatar URLs set.
    CheckGirls,
    /// List girls whose avatar is still a relative /uploads/ path.
    CheckLocal,
    /// List conversations whose media is still a relative /uploads/ path.
    CheckConvLocal,
    /// List girls whose avatar URL is missing the scheme colon (https//).
    CheckMalformed,
    /// Prefix the base URL onto relative /uploads/ paths, then report counts.
    FixUrls {
        /// Base URL to prepend (production runs pass the public origin).
        #[arg(long, default_value = fix::DEFAULT_BASE_URL)]
        base_url: String,
    },
}

async fn run(params: ConnectParams, command: Command) -> eva_services::Result<()> {
    let mut conn = params.connect().await?;

    match command {
        Command::Show => report::show(&mut conn).await?,
        Command::Avatars => report::avatars(&mut conn).await?,
        Command::CheckUrls => report::check_urls(&mut conn).await?,
        Command::CheckGirls => report::check_girls(&mut conn).await?,
        Command::CheckLocal => report::check_local(&mut conn).await?,
        Command::CheckConvLocal => report::check_conv_local(&mut conn).await?,
        Command::CheckMalformed => report::check_malformed(&mut conn).await?,
        Command::FixUrls { base_url } => {
            let outcome = fix::fix_urls(&mut conn, &base_url).await?;
            fix::print_report(&outcome);
        }
    }

    conn.close().await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    // Catch-all boundary: report the failure and exit cleanly.
    if let Err(error) = run(args.connect.params(), args.command).await {
        println!("Error: {error}");
    }
}
