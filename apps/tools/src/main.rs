use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use order_form::capture_name;
use serde::Deserialize;
use shared::domain::{FruitOption, NormalizationRule};
use storage::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/smoothies.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the fruit reference table, from a TOML file or the built-in list.
    SeedFruitOptions {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    ListOrders {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    VerifyOrders {
        name_on_order: String,
        #[arg(long, value_enum, default_value_t = NameRule::Upper)]
        rule: NameRule,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum NameRule {
    Upper,
    Trim,
    Capitalize,
}

impl From<NameRule> for NormalizationRule {
    fn from(value: NameRule) -> Self {
        match value {
            NameRule::Upper => Self::Upper,
            NameRule::Trim => Self::Trim,
            NameRule::Capitalize => Self::Capitalize,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    fruit: Vec<SeedFruit>,
}

#[derive(Debug, Deserialize)]
struct SeedFruit {
    name: String,
    search_on: String,
}

const DEFAULT_FRUIT: &[(&str, &str)] = &[
    ("Apples", "Apple"),
    ("Blueberries", "Blueberry"),
    ("Cantaloupe", "Cantaloupe"),
    ("Dragon Fruit", "Dragonfruit"),
    ("Elderberries", "Elderberry"),
    ("Figs", "Fig"),
    ("Guava", "Guava"),
    ("Honeydew", "Honeydew"),
    ("Jackfruit", "Jackfruit"),
    ("Kiwi", "Kiwi"),
    ("Lime", "Lime"),
    ("Mango", "Mango"),
    ("Raspberries", "Raspberry"),
    ("Strawberries", "Strawberry"),
    ("Watermelon", "Watermelon"),
];

fn parse_seed(raw: &str) -> Result<Vec<FruitOption>> {
    let seed: SeedFile = toml::from_str(raw).context("invalid seed file")?;
    Ok(seed
        .fruit
        .into_iter()
        .map(|fruit| FruitOption::new(fruit.name.trim(), fruit.search_on.trim()))
        .filter(|option| !option.name.is_empty() && !option.search_key.is_empty())
        .collect())
}

fn default_seed() -> Vec<FruitOption> {
    DEFAULT_FRUIT
        .iter()
        .map(|(name, key)| FruitOption::new(*name, *key))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::SeedFruitOptions { file } => {
            let options = match file {
                Some(path) => {
                    let raw = fs::read_to_string(&path)
                        .with_context(|| format!("failed to read '{}'", path.display()))?;
                    parse_seed(&raw)?
                }
                None => default_seed(),
            };
            for option in &options {
                storage
                    .upsert_fruit_option(&option.name, &option.search_key)
                    .await?;
            }
            info!(count = options.len(), "seeded fruit options");
        }
        Command::ListOrders { limit } => {
            for order in storage.list_orders(limit).await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    order.order_id.0,
                    order.created_at.to_rfc3339(),
                    order.name_on_order,
                    order.ingredients
                );
            }
        }
        Command::VerifyOrders {
            name_on_order,
            rule,
        } => {
            let name_on_order = capture_name(&name_on_order, rule.into());
            let rows = storage.verify_orders(&name_on_order).await?;
            if rows.is_empty() {
                println!("no orders for {name_on_order}");
            }
            for row in rows {
                println!(
                    "{}\t{}\t{}",
                    row.ingredients, row.ingredients_hash, row.name_hash
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seed_file_and_skips_blank_rows() {
        let options = parse_seed(
            r#"
[[fruit]]
name = " Mango "
search_on = "mango"

[[fruit]]
name = "Ghost"
search_on = "  "
"#,
        )
        .expect("seed");
        assert_eq!(options, vec![FruitOption::new("Mango", "mango")]);
    }

    #[test]
    fn default_seed_names_are_unique() {
        let seed = default_seed();
        let mut names: Vec<_> = seed.iter().map(|o| o.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), seed.len());
    }

    #[test]
    fn cli_parses_verify_with_rule() {
        let cli = Cli::try_parse_from(["tools", "verify-orders", " jo ", "--rule", "trim"])
            .expect("cli");
        let Command::VerifyOrders { name_on_order, rule } = cli.command else {
            panic!("expected verify command");
        };
        assert_eq!(capture_name(&name_on_order, rule.into()), "jo");
    }
}
