#[cfg(feature = "mysql")]
use zorm::{MySqlConfig, args, op};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "mysql")]
    {
        println!("=== zorm MySQL - Transactions ===\n");

        // e.g. ZORM_ADDRESS=127.0.0.1:3306 ZORM_USERNAME=root ZORM_DATABASE=test
        let config = MySqlConfig::from_env()?;
        let mut db = zorm::connect_mysql(&config).await?;

        db.exec(
            "CREATE TABLE IF NOT EXISTS accounts (
                id BIGINT AUTO_INCREMENT PRIMARY KEY,
                owner VARCHAR(64) NOT NULL,
                balance BIGINT NOT NULL
            )",
            args![],
        )
        .await?;

        let mut alice = std::collections::BTreeMap::new();
        alice.insert("owner", zorm::Value::from("alice"));
        alice.insert("balance", zorm::Value::from(100));
        let alice_id = db.table("accounts").insert(alice).await?;

        let mut bob = std::collections::BTreeMap::new();
        bob.insert("owner", zorm::Value::from("bob"));
        bob.insert("balance", zorm::Value::from(0));
        let bob_id = db.table("accounts").insert(bob).await?;

        // 1. Transfer that commits
        db.begin().await?;
        db.exec("UPDATE accounts SET balance = balance - ? WHERE id = ?", args![40, alice_id])
            .await?;
        db.exec("UPDATE accounts SET balance = balance + ? WHERE id = ?", args![40, bob_id])
            .await?;
        db.commit().await?;
        println!("1. Committed transfer: {}", db.get_last_sql());

        // 2. Transfer that is rolled back when the guard fails
        db.begin().await?;
        db.exec("UPDATE accounts SET balance = balance - ? WHERE id = ?", args![500, alice_id])
            .await?;
        let overdrawn = db
            .table("accounts")
            .where_(("id", alice_id))
            .and_where(("balance", op::LT, 0))
            .count()
            .await?;
        if overdrawn > 0 {
            db.rollback().await?;
            println!("2. Rolled back overdraft");
        } else {
            db.commit().await?;
        }

        let rows = db
            .table("accounts")
            .fields(["owner", "balance"])
            .where_(("id", op::IN, vec![alice_id, bob_id]))
            .order("id")
            .select()
            .await?;
        println!("\n3. Balances:");
        for row in rows {
            println!("   {} = {}", row["owner"], row["balance"]);
        }
    }

    #[cfg(not(feature = "mysql"))]
    {
        println!("Run with: cargo run --example mysql_transactions --features mysql");
    }

    Ok(())
}
