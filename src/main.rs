use anyhow::Result;
use clap::Parser;
use rs_limits::admin::{self, GroupClassArgs};
use rs_limits::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let args = GroupClassArgs::parse();

    let config = Config::from_file(&args.config)
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    let level = if args.debug {
        "debug"
    } else {
        config.logging.level.as_str()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("rs_limits={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!(
        config = %args.config.display(),
        redis_url = %config.redis.url,
        group = %args.group,
        "Running group_class"
    );

    let output = admin::run(&args, &config)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    print!("{}", output);

    Ok(())
}
