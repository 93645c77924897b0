use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use walletpass::{
    credential::{load_issuer_identity, CREDENTIALS_ENV_VAR},
    demo::{random_suffix, DemoFlow},
    object_store::RestObjectStore,
    pass::PassType,
    WalletConfig,
};

#[derive(Parser)]
#[command(author, version, about = "Issue wallet passes and mint save links", long_about = None)]
struct Args {
    /// Service-account key file
    #[arg(long, env = CREDENTIALS_ENV_VAR)]
    credentials: PathBuf,

    /// Issuer account id
    #[arg(long, env = "WALLET_ISSUER_ID")]
    issuer_id: String,

    /// Pass vertical, e.g. `loyalty` or `event-ticket`
    #[arg(long, default_value = "generic")]
    pass_type: PassType,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a class and object, expire the object, mint links and batch-create objects
    Run,
    /// Print a save link for a new class and object without calling the API
    SaveLink {
        #[arg(long)]
        class_suffix: Option<String>,
        #[arg(long)]
        object_suffix: Option<String>,
    },
    /// Batch-create objects of an existing class
    Batch {
        #[arg(long)]
        class_suffix: String,
        #[arg(long, default_value_t = 3)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let identity = load_issuer_identity(&args.credentials)
        .with_context(|| format!("loading credentials from {}", args.credentials.display()))?;
    let config = WalletConfig::from_env();
    let store = RestObjectStore::new(identity.clone(), config.clone());
    let flow = DemoFlow::new(store, identity, config);

    match args.cmd {
        Command::Run => {
            let report = flow.run(args.pass_type, &args.issuer_id).await?;
            println!("class:          {}", report.class_id);
            println!("object:         {}", report.object_id);
            println!("new objects:    {}", report.new_objects_link);
            println!("existing:       {}", report.existing_objects_link);
            println!("batch response: {}", report.batch_response);
        }
        Command::SaveLink {
            class_suffix,
            object_suffix,
        } => {
            let class_suffix = class_suffix.unwrap_or_else(random_suffix);
            let object_suffix = object_suffix.unwrap_or_else(random_suffix);
            let link =
                flow.save_link_new(args.pass_type, &args.issuer_id, &class_suffix, &object_suffix)?;
            println!("{link}");
        }
        Command::Batch {
            class_suffix,
            count,
        } => {
            let response = flow
                .batch_create_objects(args.pass_type, &args.issuer_id, &class_suffix, count)
                .await?;
            println!("{response}");
        }
    }

    Ok(())
}
