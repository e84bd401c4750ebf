//! Operator tooling for the group to rate-limit class mappings.

use clap::Parser;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::error::{LimitsError, LimitsResult};
use crate::redis::RedisClient;
use crate::store::{group_key, ClassStore};

/// Set up or query limit classes associated with groups.
#[derive(Debug, Clone, Parser)]
#[command(name = "group_class", version, about)]
pub struct GroupClassArgs {
    /// Name of the configuration file, for connecting to the Redis database.
    pub config: PathBuf,

    /// Name of the group.
    pub group: String,

    /// Run the tool in debug mode.
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Delete the group from the database.
    #[arg(short = 'D', long)]
    pub delete: bool,

    /// If specified, sets the class associated with the given group.
    /// Cannot be combined with `--delete`.
    #[arg(short = 'c', long = "class", value_name = "CLASS")]
    pub klass: Option<String>,
}

impl GroupClassArgs {
    /// Reject `--class` combined with `--delete`.
    pub fn check(&self) -> LimitsResult<()> {
        if self.klass.as_deref().is_some_and(|k| !k.is_empty()) && self.delete {
            return Err(LimitsError::ConflictingOptions);
        }
        Ok(())
    }
}

/// Query, set or delete the class mapped to `group`.
///
/// Returns the class mapped before the call. A set to the current value does
/// not write, and a delete of an unmapped group does not touch the database.
pub async fn set_class(
    store: &dyn ClassStore,
    group: &str,
    klass: Option<&str>,
    delete: bool,
) -> LimitsResult<Option<String>> {
    let klass = klass.filter(|k| !k.is_empty());
    if klass.is_some() && delete {
        return Err(LimitsError::ConflictingOptions);
    }

    let key = group_key(group);
    let old_klass = store.get(&key).await?;

    if delete {
        if old_klass.is_some() {
            store.delete(&key).await?;
            info!(group = %group, "Deleted rate-limit class mapping");
        }
    } else if let Some(klass) = klass {
        if old_klass.as_deref() != Some(klass) {
            store.set(&key, klass).await?;
            info!(group = %group, class = %klass, "Updated rate-limit class mapping");
        }
    }

    Ok(old_klass)
}

/// Human-readable summary of a [`set_class`] call.
pub fn report(args: &GroupClassArgs, result: Option<&str>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Group {}:", args.group);

    let klass = args.klass.as_deref().filter(|k| !k.is_empty());

    if klass.is_some() || args.delete {
        if let Some(previous) = result {
            let _ = writeln!(out, "  Previous rate-limit class: {}", previous);
        }
        if args.delete {
            let _ = writeln!(out, "  Deleted from database");
        } else if let Some(klass) = klass {
            let _ = writeln!(out, "  New rate-limit class: {}", klass);
        }
    } else if let Some(configured) = result {
        let _ = writeln!(out, "  Configured rate-limit class: {}", configured);
    } else {
        let _ = writeln!(out, "  Not currently configured in database.");
    }

    out
}

/// Run the `group_class` command against the Redis database named in the config.
pub async fn run(args: &GroupClassArgs, config: &Config) -> LimitsResult<String> {
    args.check()?;

    let client = RedisClient::connect_to(&config.redis.url).await?;
    let previous = set_class(&client, &args.group, args.klass.as_deref(), args.delete).await?;

    Ok(report(args, previous.as_deref()))
}
