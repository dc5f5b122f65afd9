use clap::Parser;
use dotenvy::dotenv;
use upload_timing_server::utils::auth::{create_jwt, lifetime_hours};

/// Issue a signed bearer token accepted by the upload timing server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Value of the `sub` claim, e.g. the client name
    #[arg(short, long)]
    subject: String,

    /// Token lifetime in hours
    #[arg(short, long, default_value_t = 24)]
    ttl_hours: i64,

    /// Signing secret; must match the server's JWT_SECRET
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    secret: String,
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    if args.secret.is_empty() {
        anyhow::bail!("JWT_SECRET is empty");
    }
    let ttl = lifetime_hours(args.ttl_hours)?;

    let token = create_jwt(&args.subject, &args.secret, ttl)?;
    println!("{}", token);
    Ok(())
}
