//! Redb Client Storage

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use shopkit_common::database::{self, ClientStorage};
use shopkit_common::{LineItem, Session};
use tracing::instrument;

use crate::error::Error;

// <Product_id, LineItem>
const CART_TABLE: TableDefinition<i64, &str> = TableDefinition::new("cart");
// <Key, Value>
const SESSION_TABLE: TableDefinition<&str, &str> = TableDefinition::new("session");
const CONFIG_TABLE: TableDefinition<&str, &str> = TableDefinition::new("config");

const DATABASE_VERSION: u32 = 1;

const USER_KEY: &str = "user";
const TOKEN_KEY: &str = "token";

/// Client Redb Storage
#[derive(Debug, Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Create new [`RedbStorage`]
    pub fn new(path: &Path) -> Result<Self, Error> {
        // Check if parent directory exists before attempting to create database
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Parent directory does not exist: {parent:?}"),
                )));
            }
        }

        let db = Database::create(path)?;

        let db_version: Option<String>;
        {
            // Check database version
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(CONFIG_TABLE);

            db_version = match table {
                Ok(table) => table.get("db_version")?.map(|v| v.value().to_string()),
                Err(_) => None,
            };
        }

        match db_version {
            Some(db_version) => {
                let current_file_version = u32::from_str(&db_version)?;

                if current_file_version != DATABASE_VERSION {
                    tracing::warn!(
                        "Unknown database version {} expected {}",
                        current_file_version,
                        DATABASE_VERSION
                    );
                    return Err(Error::UnknownDatabaseVersion);
                }
            }
            None => {
                let write_txn = db.begin_write()?;
                {
                    let mut table = write_txn.open_table(CONFIG_TABLE)?;
                    // Open all tables to init a new db
                    let _ = write_txn.open_table(CART_TABLE)?;
                    let _ = write_txn.open_table(SESSION_TABLE)?;
                    table.insert("db_version", DATABASE_VERSION.to_string().as_str())?;
                }

                write_txn.commit()?;
            }
        }

        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl ClientStorage for RedbStorage {
    type Err = database::Error;

    #[instrument(skip_all)]
    async fn save_cart(&self, items: &[LineItem]) -> Result<(), Self::Err> {
        let write_txn = self.db.begin_write().map_err(Error::from)?;
        {
            // Replace the stored snapshot so removed lines do not linger
            write_txn.delete_table(CART_TABLE).map_err(Error::from)?;
            let mut table = write_txn.open_table(CART_TABLE).map_err(Error::from)?;

            for item in items {
                table
                    .insert(
                        item.product_id,
                        serde_json::to_string(item).map_err(Error::from)?.as_str(),
                    )
                    .map_err(Error::from)?;
            }
        }
        write_txn.commit().map_err(Error::from)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_cart(&self) -> Result<Option<Vec<LineItem>>, Self::Err> {
        let read_txn = self.db.begin_read().map_err(Error::from)?;
        let table = read_txn.open_table(CART_TABLE).map_err(Error::from)?;

        let mut items = Vec::new();

        for row in table.iter().map_err(Error::from)? {
            let (_, value) = row.map_err(Error::from)?;
            items.push(serde_json::from_str(value.value()).map_err(Error::from)?);
        }

        if items.is_empty() {
            return Ok(None);
        }

        Ok(Some(items))
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), Self::Err> {
        let write_txn = self.db.begin_write().map_err(Error::from)?;
        {
            write_txn.delete_table(CART_TABLE).map_err(Error::from)?;
            let _ = write_txn.open_table(CART_TABLE).map_err(Error::from)?;
        }
        write_txn.commit().map_err(Error::from)?;

        Ok(())
    }

    #[instrument(skip_all)]
    async fn save_session(&self, session: &Session) -> Result<(), Self::Err> {
        let write_txn = self.db.begin_write().map_err(Error::from)?;
        {
            let mut table = write_txn.open_table(SESSION_TABLE).map_err(Error::from)?;
            table
                .insert(
                    USER_KEY,
                    serde_json::to_string(&session.user)
                        .map_err(Error::from)?
                        .as_str(),
                )
                .map_err(Error::from)?;
            table
                .insert(TOKEN_KEY, session.token.as_str())
                .map_err(Error::from)?;
        }
        write_txn.commit().map_err(Error::from)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_session(&self) -> Result<Option<Session>, Self::Err> {
        let read_txn = self.db.begin_read().map_err(Error::from)?;
        let table = read_txn.open_table(SESSION_TABLE).map_err(Error::from)?;

        let user = table.get(USER_KEY).map_err(Error::from)?;
        let token = table.get(TOKEN_KEY).map_err(Error::from)?;

        match (user, token) {
            (Some(user), Some(token)) => {
                let user = serde_json::from_str(user.value()).map_err(Error::from)?;

                Ok(Some(Session {
                    user,
                    token: token.value().to_string(),
                }))
            }
            _ => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn clear_session(&self) -> Result<(), Self::Err> {
        let write_txn = self.db.begin_write().map_err(Error::from)?;
        {
            let mut table = write_txn.open_table(SESSION_TABLE).map_err(Error::from)?;
            table.remove(USER_KEY).map_err(Error::from)?;
            table.remove(TOKEN_KEY).map_err(Error::from)?;
        }
        write_txn.commit().map_err(Error::from)?;

        Ok(())
    }
}
