use argon2::{
    Argon2, PasswordHasher,
    password_hash::{rand_core::OsRng, SaltString},
};
use axum_car_market_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, config.max_connections).await?;
    // Ensure migrations are applied.
    run_migrations(&pool).await?;

    let admin_id = ensure_user_with_role(&pool, "admin@example.com", "admin123", "admin").await?;
    let buyer_id = ensure_user_with_role(&pool, "buyer@example.com", "buyer123", "buyer").await?;
    seed_car_models(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, Buyer ID: {buyer_id}");
    Ok(())
}

async fn ensure_user_with_role(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    // If user already exists, fetch id
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_car_models(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let catalog = vec![
        ("Toyota", "Corolla"),
        ("Toyota", "RAV4"),
        ("Honda", "Civic"),
        ("Honda", "CR-V"),
        ("Ford", "Mustang"),
        ("Ford", "F-150"),
        ("BMW", "3 Series"),
        ("Mercedes-Benz", "C-Class"),
        ("Volkswagen", "Golf"),
        ("Tesla", "Model 3"),
        ("Hyundai", "Elantra"),
        ("Kia", "Sportage"),
    ];

    for (brand, model) in catalog {
        sqlx::query(
            r#"
            INSERT INTO car_models (id, brand, model)
            VALUES ($1, $2, $3)
            ON CONFLICT (brand, model) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(brand)
        .bind(model)
        .execute(pool)
        .await?;
    }

    println!("Seeded car model catalog");
    Ok(())
}
