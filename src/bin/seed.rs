//! Seed script for development — populates a fresh database with sample data.
//!
//! Usage: `cargo run --bin seed`
//!
//! Requires `DATABASE_URL` (reads .env).

use sqlx::PgPool;
use uuid::Uuid;

const DEMO_EMAIL: &str = "demo@safarx.local";
const DEMO_PASSWORD: &str = "Travel123!";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    // Run migrations first
    sqlx::migrate!("./migrations").run(&pool).await?;

    println!("=== SafarX Seed Script ===");

    let user_id = seed_demo_user(&pool).await?;
    seed_journeys(&pool, user_id).await?;

    println!("\n=== Seed complete! ===");
    println!("Demo login: {DEMO_EMAIL} / {DEMO_PASSWORD}");

    Ok(())
}

async fn seed_demo_user(pool: &PgPool) -> anyhow::Result<Uuid> {
    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(DEMO_EMAIL)
        .fetch_optional(pool)
        .await?;

    let hash = safarx::services::auth::hash_password(DEMO_PASSWORD)?;

    if let Some(id) = existing {
        // Update password for the existing demo user
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(&hash)
            .bind(id)
            .execute(pool)
            .await?;
        println!("[done] Updated demo user password");
        return Ok(id);
    }

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, display_name)
         VALUES ($1, $2, 'Demo Traveller')
         RETURNING id",
    )
    .bind(DEMO_EMAIL)
    .bind(&hash)
    .fetch_one(pool)
    .await?;

    println!("[done] Created demo user");
    Ok(id)
}

async fn seed_journeys(pool: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM journeys WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    if count > 0 {
        println!("[skip] Journeys already exist ({count})");
        return Ok(());
    }

    let journeys = vec![
        (
            "Tokyo Spring Trip",
            "Cherry blossoms, temples, and far too much ramen.",
            Some("2026-03-25"),
            Some("2026-04-05"),
        ),
        (
            "Andes Crossing",
            "Overland from Santiago to Mendoza.",
            Some("2025-11-10"),
            Some("2025-11-24"),
        ),
        ("Weekend in Lisbon", "", None, None),
    ];

    for (title, description, start, end) in journeys.iter().copied() {
        let journey_id: Uuid = sqlx::query_scalar(
            "INSERT INTO journeys (user_id, title, description, start_date, end_date)
             VALUES ($1, $2, $3, $4::date, $5::date)
             RETURNING id",
        )
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await?;

        let (places, memories): (Vec<(&str, &str)>, Vec<&str>) = match title {
            "Tokyo Spring Trip" => (
                vec![
                    ("Senso-ji", "Japan"),
                    ("Shinjuku Gyoen", "Japan"),
                    ("Fushimi Inari", "Japan"),
                ],
                vec!["First hanami picnic", "Night view from Shibuya Sky"],
            ),
            "Andes Crossing" => (
                vec![("Valparaíso", "Chile"), ("Mendoza", "Argentina")],
                vec!["Sunrise over Aconcagua"],
            ),
            _ => (vec![("Alfama", "Portugal")], vec![]),
        };

        for (name, country) in places {
            sqlx::query(
                "INSERT INTO places (user_id, journey_id, name, country)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(user_id)
            .bind(journey_id)
            .bind(name)
            .bind(country)
            .execute(pool)
            .await?;
        }

        for memory_title in memories {
            sqlx::query(
                "INSERT INTO memories (user_id, journey_id, title) VALUES ($1, $2, $3)",
            )
            .bind(user_id)
            .bind(journey_id)
            .bind(memory_title)
            .execute(pool)
            .await?;
        }
    }

    println!("[done] Created {} sample journeys", journeys.len());
    Ok(())
}
