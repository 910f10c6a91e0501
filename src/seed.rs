//! Fill the store with randomized sample rows through the repository.
//!
//! Every repository call commits on its own, so a failure part way through
//! leaves whatever was written up to that point.

use crate::config::SeedConfig;
use crate::db::Repo;
use crate::model::{Order, Product, User};
use anyhow::{bail, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::SqliteConnection;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

const FIRST_NAMES: &[&str] = &[
    "Adam", "Alice", "Boris", "Chloe", "Daniel", "Elena", "Farid", "Grace", "Hugo", "Irina",
    "Jonas", "Keiko", "Liam", "Maya", "Nikolai", "Olivia", "Pablo", "Quinn", "Rosa", "Samuel",
    "Tara", "Umar", "Vera", "Wendy", "Yusuf", "Zoe",
];

const LAST_NAMES: &[&str] = &[
    "Anderson", "Brown", "Castillo", "Dubois", "Evans", "Fischer", "Garcia", "Hansen", "Ito",
    "Jensen", "Kowalski", "Lopez", "Moreau", "Nguyen", "Olsen", "Petrov", "Rossi", "Schmidt",
    "Tanaka", "Weber",
];

const LANGUAGE_CODES: &[&str] = &[
    "en", "fr", "de", "es", "it", "pt", "nl", "pl", "uk", "ru", "ja", "ko", "zh", "vi", "tr", "ar",
];

const WORDS: &[&str] = &[
    "apple", "blanket", "candle", "drum", "engine", "feather", "garden", "hammer", "island",
    "jacket", "kettle", "lamp", "mirror", "notebook", "orange", "pencil", "quilt", "radio",
    "saddle", "teapot", "umbrella", "violin", "wallet", "yarn", "zipper", "simple", "bright",
    "quiet", "rapid", "useful", "daily", "modern",
];

/// Largest id, price and quantity the generator produces.
const MAX_INT: i64 = 9999;

/// Number of distinct user ids the generator can draw from.
pub const USER_ID_SPACE: usize = MAX_INT as usize + 1;

/// Counts of what a seeding run created. `links` counts link inserts issued,
/// including duplicate picks that were ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub users: usize,
    pub orders: usize,
    pub products: usize,
    pub links: usize,
}

/// Clear users, orders and products (unless `keep_existing`), then create
/// users, orders, products and order links in that order.
#[instrument(skip_all, fields(users = cfg.users, orders = cfg.orders, products = cfg.products))]
pub async fn seed_fake_data<R: Rng + ?Sized>(
    db: &mut SqliteConnection,
    rng: &mut R,
    cfg: &SeedConfig,
) -> Result<SeedReport> {
    let mut repo = Repo::new(db);
    if !cfg.keep_existing {
        repo.delete_records().await?;
    }

    // ids already in the store are off limits, or the upsert would rename
    // an existing user instead of adding one
    let mut taken: HashSet<i64> = if cfg.keep_existing {
        repo.get_all_users()
            .await?
            .into_iter()
            .map(|u| u.telegram_id)
            .collect()
    } else {
        HashSet::new()
    };
    let free_ids = (0..=MAX_INT).filter(|id| !taken.contains(id)).count();
    if cfg.users > free_ids {
        bail!(
            "cannot create {} users: only {} unused ids in 0..={}",
            cfg.users,
            free_ids,
            MAX_INT
        );
    }

    let mut users: Vec<User> = Vec::with_capacity(cfg.users);
    for _ in 0..cfg.users {
        let telegram_id = loop {
            let id = rng.gen_range(0..=MAX_INT);
            if taken.insert(id) {
                break id;
            }
        };
        let (first, last) = (pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES));
        let full_name = format!("{first} {last}");
        let username = fake_username(rng, first, last);
        let lang = pick(rng, LANGUAGE_CODES);
        // each new user is invited by the one created just before
        let referrer_id = users.last().map(|u| u.telegram_id);
        let user = repo
            .add_user(telegram_id, &full_name, lang, Some(&username), referrer_id)
            .await?;
        users.push(user);
    }

    let mut orders: Vec<Order> = Vec::with_capacity(cfg.orders);
    if users.is_empty() && cfg.orders > 0 {
        warn!("no users to place orders for; skipping orders");
    } else {
        for _ in 0..cfg.orders {
            let Some(user) = users.choose(rng) else { break };
            orders.push(repo.add_order(user.telegram_id).await?);
        }
    }

    let mut products: Vec<Product> = Vec::with_capacity(cfg.products);
    for _ in 0..cfg.products {
        let title = pick(rng, WORDS);
        let description = fake_sentence(rng);
        let price = Decimal::from(rng.gen_range(0..=MAX_INT));
        products.push(repo.add_product(title, price, Some(&description)).await?);
    }

    let mut links = 0;
    if products.is_empty() && !orders.is_empty() {
        warn!("no products to link; skipping order links");
    } else {
        for order in &orders {
            for _ in 0..cfg.products_per_order {
                let Some(product) = products.choose(rng) else { break };
                let quantity = rng.gen_range(0..=MAX_INT);
                repo.add_product_to_order(product.product_id, order.order_id, quantity)
                    .await?;
                links += 1;
            }
        }
    }

    let report = SeedReport {
        users: users.len(),
        orders: orders.len(),
        products: products.len(),
        links,
    };
    info!(?report, "seeding finished");
    Ok(report)
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn fake_username<R: Rng + ?Sized>(rng: &mut R, first: &str, last: &str) -> String {
    let suffix: u16 = rng.gen_range(0..1000);
    match rng.gen_range(0..3) {
        0 => format!("{}{}", first.to_lowercase(), suffix),
        1 => format!("{}.{}", first.to_lowercase(), last.to_lowercase()),
        _ => format!("{}{}{}", &first[..1].to_lowercase(), last.to_lowercase(), suffix),
    }
}

fn fake_sentence<R: Rng + ?Sized>(rng: &mut R) -> String {
    let len = rng.gen_range(4..=9);
    let words: Vec<&str> = (0..len).map(|_| pick(rng, WORDS)).collect();
    let mut sentence = String::new();
    if let Some(first) = words.first() {
        let mut chars = first.chars();
        if let Some(c) = chars.next() {
            sentence.push(c.to_ascii_uppercase());
            sentence.push_str(chars.as_str());
        }
    }
    for word in words.iter().skip(1) {
        sentence.push(' ');
        sentence.push_str(word);
    }
    sentence.push('.');
    sentence
}
