use rand::rngs::StdRng;
use rand::SeedableRng;
use shopbot_store::config::{DatabaseConfig, SeedConfig};
use shopbot_store::db::{Database, Repo, Session};
use shopbot_store::seed::{seed_fake_data, SeedReport, USER_ID_SPACE};

async fn setup() -> (Database, Session) {
    let mut cfg = DatabaseConfig::new("sqlite::memory:");
    cfg.max_connections = 1;
    let db = Database::connect(&cfg).await.unwrap();
    db.run_migrations().await.unwrap();
    let session = db.session().await.unwrap();
    (db, session)
}

async fn count(session: &mut Session, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&mut **session)
        .await
        .unwrap()
}

#[tokio::test]
async fn default_seed_creates_linked_rows() {
    let (_db, mut session) = setup().await;
    let mut rng = StdRng::seed_from_u64(0);

    let report = seed_fake_data(&mut session, &mut rng, &SeedConfig::default())
        .await
        .unwrap();
    assert_eq!(
        report,
        SeedReport {
            users: 10,
            orders: 10,
            products: 10,
            links: 30,
        }
    );

    assert_eq!(count(&mut session, "users").await, 10);
    assert_eq!(count(&mut session, "orders").await, 10);
    assert_eq!(count(&mut session, "products").await, 10);

    // Duplicate product picks collapse into one link.
    let per_order: Vec<i64> = sqlx::query_scalar(
        "SELECT COUNT(op.product_id) FROM orders o \
         LEFT JOIN order_products op ON op.order_id = o.order_id \
         GROUP BY o.order_id",
    )
    .fetch_all(&mut *session)
    .await
    .unwrap();
    assert_eq!(per_order.len(), 10);
    assert!(per_order.iter().all(|n| (1..=3).contains(n)));

    let mut repo = Repo::new(&mut session);
    let invited = repo.select_all_invited_users().await.unwrap();
    assert_eq!(invited.len(), 9);
}

#[tokio::test]
async fn reseeding_replaces_previous_data() {
    let (_db, mut session) = setup().await;
    let cfg = SeedConfig::default();

    let mut rng = StdRng::seed_from_u64(0);
    seed_fake_data(&mut session, &mut rng, &cfg).await.unwrap();
    let first_names: Vec<String> = sqlx::query_scalar("SELECT full_name FROM users ORDER BY rowid")
        .fetch_all(&mut *session)
        .await
        .unwrap();

    let mut rng = StdRng::seed_from_u64(0);
    seed_fake_data(&mut session, &mut rng, &cfg).await.unwrap();
    let second_names: Vec<String> =
        sqlx::query_scalar("SELECT full_name FROM users ORDER BY rowid")
            .fetch_all(&mut *session)
            .await
            .unwrap();

    assert_eq!(count(&mut session, "users").await, 10);
    assert_eq!(count(&mut session, "orders").await, 10);
    assert_eq!(count(&mut session, "products").await, 10);
    assert_eq!(first_names, second_names);
}

#[tokio::test]
async fn keep_existing_accumulates() {
    let (_db, mut session) = setup().await;
    let cfg = SeedConfig {
        users: 2,
        orders: 1,
        products: 1,
        products_per_order: 1,
        rng_seed: 0,
        keep_existing: true,
    };

    let mut rng = StdRng::seed_from_u64(1);
    seed_fake_data(&mut session, &mut rng, &cfg).await.unwrap();
    seed_fake_data(&mut session, &mut rng, &cfg).await.unwrap();

    assert_eq!(count(&mut session, "users").await, 4);
    assert_eq!(count(&mut session, "orders").await, 2);
    assert_eq!(count(&mut session, "products").await, 2);
    assert_eq!(count(&mut session, "order_products").await, 2);
}

#[tokio::test]
async fn keep_existing_never_overwrites_users() {
    let (_db, mut session) = setup().await;
    let cfg = SeedConfig {
        users: 5,
        orders: 0,
        products: 0,
        keep_existing: true,
        ..SeedConfig::default()
    };

    // Same rng seed twice draws the same ids first.
    let mut rng = StdRng::seed_from_u64(9);
    seed_fake_data(&mut session, &mut rng, &cfg).await.unwrap();
    let before: Vec<(i64, String)> =
        sqlx::query_as("SELECT telegram_id, full_name FROM users ORDER BY telegram_id")
            .fetch_all(&mut *session)
            .await
            .unwrap();

    let mut rng = StdRng::seed_from_u64(9);
    let report = seed_fake_data(&mut session, &mut rng, &cfg).await.unwrap();
    assert_eq!(report.users, 5);
    assert_eq!(count(&mut session, "users").await, 10);

    for (id, name) in before {
        let current: String = sqlx::query_scalar("SELECT full_name FROM users WHERE telegram_id = ?")
            .bind(id)
            .fetch_one(&mut *session)
            .await
            .unwrap();
        assert_eq!(current, name);
    }
}

#[tokio::test]
async fn more_users_than_ids_is_an_error() {
    let (_db, mut session) = setup().await;
    let cfg = SeedConfig {
        users: USER_ID_SPACE + 1,
        orders: 0,
        products: 0,
        ..SeedConfig::default()
    };
    let mut rng = StdRng::seed_from_u64(0);
    let err = seed_fake_data(&mut session, &mut rng, &cfg)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("unused ids"), "{err}");
    assert_eq!(count(&mut session, "users").await, 0);
}

#[tokio::test]
async fn orders_without_users_are_skipped() {
    let (_db, mut session) = setup().await;
    let cfg = SeedConfig {
        users: 0,
        orders: 5,
        products: 2,
        ..SeedConfig::default()
    };
    let mut rng = StdRng::seed_from_u64(3);
    let report = seed_fake_data(&mut session, &mut rng, &cfg).await.unwrap();
    assert_eq!(report.orders, 0);
    assert_eq!(report.links, 0);
    assert_eq!(report.products, 2);
}
