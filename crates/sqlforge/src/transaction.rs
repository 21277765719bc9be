//! Transaction helper macro.
//!
//! # Example
//!
//! ```ignore
//! use sqlforge::prelude::*;
//!
//! # async fn demo(forge: &mut QueryForge) -> ForgeResult<()> {
//! sqlforge::transaction!(forge, {
//!     forge
//!         .table("accounts")
//!         .update(record! { "balance" => 0 })
//!         .and_where("id", Op::Eq, 1);
//!     forge.execute().await?;
//!     forge.table("audit").insert(record! { "account_id" => 1 });
//!     forge.execute().await?;
//!     Ok(())
//! })?;
//! # Ok(()) }
//! ```

/// Runs the given block inside a transaction on a [`QueryForge`](crate::QueryForge).
///
/// - Begins a transaction via `$forge.begin_transaction().await`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `sqlforge::ForgeResult<T>`, and so does the
/// macro. A failing rollback is reported as [`ForgeError::Other`](crate::ForgeError::Other)
/// carrying both messages.
#[macro_export]
macro_rules! transaction {
    ($forge:expr, $body:block) => {{
        match ($forge).begin_transaction().await {
            Err(error) => Err(error),
            Ok(()) => {
                let __sqlforge_tx_body_result: $crate::ForgeResult<_> = async { $body }.await;
                match __sqlforge_tx_body_result {
                    Ok(value) => ($forge).commit().await.map(|()| value),
                    Err(error) => match ($forge).rollback().await {
                        Ok(()) => Err(error),
                        Err(rollback_err) => Err($crate::ForgeError::Other(format!(
                            "{error} (rollback failed: {rollback_err})"
                        ))),
                    },
                }
            }
        }
    }};
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use crate::prelude::*;

    async fn forge() -> QueryForge {
        let mut forge = QueryForge::new(&DatabaseConfig::sqlite(":memory:")).unwrap();
        forge.connect().await.unwrap();
        forge
            .manager_mut()
            .query("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT)", &[])
            .await
            .unwrap();
        forge
    }

    async fn count(forge: &mut QueryForge) -> usize {
        forge.table("items").select_all().execute().await.unwrap().len()
    }

    #[tokio::test]
    async fn commits_on_ok() {
        let mut forge = forge().await;

        let inserted = crate::transaction!(forge, {
            forge.table("items").insert(record! { "name" => "a" });
            forge.execute().await?;
            forge.table("items").insert(record! { "name" => "b" });
            forge.execute().await?;
            Ok(2)
        })
        .unwrap();

        assert_eq!(inserted, 2);
        assert!(!forge.in_transaction());
        assert_eq!(count(&mut forge).await, 2);
    }

    #[tokio::test]
    async fn rolls_back_on_err() {
        let mut forge = forge().await;

        let result: ForgeResult<()> = crate::transaction!(forge, {
            forge.table("items").insert(record! { "name" => "a" });
            forge.execute().await?;
            Err(ForgeError::validation("abort"))
        });

        assert_eq!(result.unwrap_err().to_string(), "Validation error: abort");
        assert!(!forge.in_transaction());
        assert_eq!(count(&mut forge).await, 0);
    }

    #[tokio::test]
    async fn failed_statement_rolls_back() {
        let mut forge = forge().await;

        let result: ForgeResult<()> = crate::transaction!(forge, {
            forge.table("items").insert(record! { "name" => "a" });
            forge.execute().await?;
            forge.table("missing").insert(record! { "name" => "b" });
            forge.execute().await?;
            Ok(())
        });

        assert!(matches!(result, Err(ForgeError::Execution(_))));
        assert_eq!(count(&mut forge).await, 0);
    }

    #[tokio::test]
    async fn nested_begin_fails_without_running_body() {
        let mut forge = forge().await;
        forge.begin_transaction().await.unwrap();

        let mut ran = false;
        let result: ForgeResult<()> = crate::transaction!(forge, {
            ran = true;
            Ok(())
        });

        assert!(result.unwrap_err().is_state());
        assert!(!ran);
        assert!(forge.in_transaction());
        forge.rollback().await.unwrap();
    }
}
