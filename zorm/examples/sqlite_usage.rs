#[cfg(all(feature = "sqlite", feature = "derive"))]
use zorm::{Record, SortDirection, op};

#[cfg(all(feature = "sqlite", feature = "derive"))]
#[derive(Debug, Default, Record)]
struct UserInfo {
    #[sql = "uid,auto_increment"]
    pub uid: i64,
    #[sql = "username"]
    pub username: String,
    #[sql = "departname"]
    pub departname: String,
    pub status: i32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(all(feature = "sqlite", feature = "derive"))]
    {
        println!("=== zorm SQLite - Usage Example ===\n");

        let mut db = zorm::new_sqlite("sqlite::memory:", 1).await?;
        db.exec(
            "CREATE TABLE userinfo (
                uid INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                departname TEXT NOT NULL,
                status INTEGER NOT NULL DEFAULT 0
            )",
            vec![],
        )
        .await?;

        // INSERT one record, then a batch
        let id = db
            .table("userinfo")
            .insert(&UserInfo {
                username: "ann".into(),
                departname: "ops".into(),
                status: 1,
                ..Default::default()
            })
            .await?;
        println!("1. Inserted uid {id}");

        let batch: Vec<UserInfo> = ["bob", "cid", "dee"]
            .iter()
            .map(|name| UserInfo {
                username: name.to_string(),
                departname: "dev".into(),
                ..Default::default()
            })
            .collect();
        db.table("userinfo").insert(&batch).await?;
        println!("2. Batch insert: {}\n", db.get_last_sql());

        // UPDATE inside a transaction
        db.begin().await?;
        let affected = db
            .table("userinfo")
            .where_(("departname", "dev"))
            .and_where(("username", op::NEQ, "dee"))
            .update(("status", 2))
            .await?;
        db.commit().await?;
        println!("3. Updated {affected} rows: {}\n", db.get_last_sql());

        // SELECT into records
        let mut users: Vec<UserInfo> = Vec::new();
        db.table("userinfo")
            .where_(("status", op::GT, 0))
            .order_by("uid", SortDirection::Desc)
            .find(&mut users)
            .await?;
        println!("4. Found:");
        for user in &users {
            println!("   {user:?}");
        }
        println!();

        // Aggregates
        let total = db.table("userinfo").count().await?;
        let status_sum = db.sum("status").await?;
        println!("5. count = {total}, sum(status) = {status_sum}\n");

        // Raw rows
        let rows = db
            .query("SELECT username FROM userinfo WHERE uid = ?", zorm::args![id])
            .await?;
        println!("6. Raw query: {rows:?}");
    }

    #[cfg(not(all(feature = "sqlite", feature = "derive")))]
    {
        println!("Run with: cargo run --example sqlite_usage --features sqlite,derive");
    }

    Ok(())
}
