use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing::info;

use shopbot_store::config;
use shopbot_store::db::{Database, Repo};
use shopbot_store::model::User;

#[derive(Debug, Parser)]
#[command(author, version, about = "Query and update the shop database")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply schema migrations and exit
    Migrate,
    /// Insert a user, or update name and username if the id exists
    AddUser {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        full_name: String,
        #[arg(long, default_value = "en")]
        lang: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        referrer: Option<i64>,
    },
    /// Show one user and their language
    User { id: i64 },
    /// List users, newest first
    Users {
        /// Only the ten newest users
        #[arg(long)]
        last_ten: bool,
    },
    AddOrder {
        #[arg(long)]
        user: i64,
    },
    AddProduct {
        #[arg(long)]
        title: String,
        #[arg(long)]
        price: Decimal,
        #[arg(long)]
        description: Option<String>,
    },
    /// Link a product to an order (no-op if already linked)
    AddToOrder {
        #[arg(long)]
        order: i64,
        #[arg(long)]
        product: i64,
        #[arg(long, default_value_t = 1)]
        quantity: i64,
    },
    /// Print every referrer with the users they invited
    Invited,
    /// Print the order lines of one user
    Orders { user: i64 },
    /// Print order and product totals per user
    Stats {
        /// Only the order count of this user
        #[arg(long)]
        user: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let db = Database::connect(&cfg.database).await?;
    db.run_migrations().await?;
    let mut session = db.session().await?;
    let mut repo = Repo::new(&mut session);

    match args.command {
        Command::Migrate => info!("schema is up to date"),
        Command::AddUser {
            id,
            full_name,
            lang,
            username,
            referrer,
        } => {
            let user = repo
                .add_user(id, &full_name, &lang, username.as_deref(), referrer)
                .await?;
            print_user(&user);
        }
        Command::User { id } => match repo.get_user_by_id(id).await? {
            Some(user) => {
                print_user(&user);
                let lang = repo.get_user_language(id).await?.unwrap_or_default();
                println!("  language: {lang}");
            }
            None => println!("no user with id {id}"),
        },
        Command::Users { last_ten } => {
            let users = if last_ten {
                repo.get_last_ten_users().await?
            } else {
                repo.get_all_users().await?
            };
            for user in &users {
                print_user(user);
            }
        }
        Command::AddOrder { user } => {
            let order = repo.add_order(user).await?;
            println!(
                "order #{} for user {} at {}",
                order.order_id,
                user,
                order.timestamps.created_at
            );
        }
        Command::AddProduct {
            title,
            price,
            description,
        } => {
            let product = repo
                .add_product(&title, price, description.as_deref())
                .await?;
            println!(
                "product #{} {} ({})",
                product.product_id, product.title, product.price
            );
        }
        Command::AddToOrder {
            order,
            product,
            quantity,
        } => {
            repo.add_product_to_order(product, order, quantity)
                .await
                .context("linking product to order")?;
            println!("order #{order}: product #{product} x{quantity}");
        }
        Command::Invited => {
            for pair in repo.select_all_invited_users().await? {
                println!("{} invited {}", pair.referrer_name, pair.invited_name);
            }
        }
        Command::Orders { user } => {
            for line in repo.get_all_user_orders(user).await? {
                println!(
                    "order #{} @{}: {} x{} ({} each)",
                    line.order.order_id,
                    line.username.as_deref().unwrap_or("-"),
                    line.product.title,
                    line.quantity,
                    line.product.price
                );
            }
        }
        Command::Stats { user: Some(user) } => {
            let total = repo.get_total_of_orders(user).await?;
            println!("user {user}: {total} orders");
        }
        Command::Stats { user: None } => {
            println!("orders per user:");
            for row in repo.get_total_of_orders_per_user().await? {
                println!("  {:>6}  {}", row.total, row.full_name);
            }
            println!("ordered products per user:");
            for row in repo.get_total_of_ordered_products_per_user().await? {
                println!("  {:>6}  {}", row.quantity_sum, row.full_name);
            }
        }
    }

    drop(session);
    db.close().await;
    Ok(())
}

fn print_user(user: &User) {
    println!(
        "{} {} @{} [{}] referrer={} created={}",
        user.telegram_id,
        user.full_name,
        user.username.as_deref().unwrap_or("-"),
        user.language_code,
        user.referrer_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".into()),
        user.timestamps.created_at
    );
}
