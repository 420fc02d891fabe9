use sea_query::{ColumnDef, Expr as SeaExpr, Func as SeaFunc, Iden, Order as SeaOrder, PostgresQueryBuilder, Query as SeaQuery, Table};
use sea_query_binder::{SqlxBinder, SqlxValues};
use sqlx::{Error as DbError, Row, postgres::PgRow};
use tracing::trace;

use crate::{
    ChatflowError, Result,
    store::{
        DbCollection, data,
        db::postgres::{DbInit, DbRow},
        map_db_err,
    },
};

use super::DbConnection;

#[derive(Debug)]
pub struct FlowCollection {
    conn: DbConnection,
}

#[derive(Iden)]
#[iden = "flows"]
enum CollectionIden {
    Table,

    Id,
    Data,
    /// list metadata as JSON, null when never set
    Meta,
    CreateTime,
    UpdateTime,
}

const COLUMNS: [CollectionIden; 5] = [CollectionIden::Id, CollectionIden::Data, CollectionIden::Meta, CollectionIden::CreateTime, CollectionIden::UpdateTime];

fn meta_json(flow: &data::Flow) -> Result<Option<String>> {
    Ok(flow.meta.as_ref().map(serde_json::to_string).transpose()?)
}

fn select_by_id(id: &str) -> (String, SqlxValues) {
    SeaQuery::select().from(CollectionIden::Table).columns(COLUMNS).and_where(SeaExpr::col(CollectionIden::Id).eq(id)).build_sqlx(PostgresQueryBuilder)
}

fn insert(flow: &data::Flow) -> Result<(String, SqlxValues)> {
    let meta = meta_json(flow)?;
    Ok(SeaQuery::insert()
        .into_table(CollectionIden::Table)
        .columns(COLUMNS)
        .values([flow.id.clone().into(), flow.data.clone().into(), meta.into(), flow.create_time.into(), flow.update_time.into()])
        .map_err(map_db_err)?
        .build_sqlx(PostgresQueryBuilder))
}

fn update_by_id(flow: &data::Flow) -> Result<(String, SqlxValues)> {
    let meta = meta_json(flow)?;
    Ok(SeaQuery::update()
        .table(CollectionIden::Table)
        .values([
            (CollectionIden::Data, flow.data.clone().into()),
            (CollectionIden::Meta, meta.into()),
            (CollectionIden::CreateTime, flow.create_time.into()),
            (CollectionIden::UpdateTime, flow.update_time.into()),
        ])
        .and_where(SeaExpr::col(CollectionIden::Id).eq(flow.id()))
        .build_sqlx(PostgresQueryBuilder))
}

/// Creates the table, and adds columns missing from tables created by
/// earlier versions.
fn create_table() -> Vec<String> {
    vec![
        Table::create()
            .table(CollectionIden::Table)
            .if_not_exists()
            .col(ColumnDef::new(CollectionIden::Id).string().not_null().primary_key())
            .col(ColumnDef::new(CollectionIden::Data).text().not_null())
            .col(ColumnDef::new(CollectionIden::Meta).text().null())
            .col(ColumnDef::new(CollectionIden::CreateTime).big_integer().default(0))
            .col(ColumnDef::new(CollectionIden::UpdateTime).big_integer().default(0))
            .build(PostgresQueryBuilder),
        Table::alter().table(CollectionIden::Table).add_column_if_not_exists(ColumnDef::new(CollectionIden::Meta).text().null()).build(PostgresQueryBuilder),
    ]
}

impl DbCollection for FlowCollection {
    type Item = data::Flow;

    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        let (sql, values) = SeaQuery::select()
            .from(CollectionIden::Table)
            .expr(SeaFunc::count(SeaExpr::col(CollectionIden::Id)))
            .and_where(SeaExpr::col(CollectionIden::Id).eq(id))
            .build_sqlx(PostgresQueryBuilder);

        let count = self.conn.query_one(sql.as_str(), values).map(|row| row.get::<i64, usize>(0)).map_err(map_db_err)?;

        Ok(count > 0)
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item> {
        trace!("postgres::flows::find({})", id);
        let (sql, values) = select_by_id(id);
        match self.conn.query_optional(&sql, values).map_err(map_db_err)? {
            Some(row) => Self::Item::from_row(&row).map_err(map_db_err),
            None => Err(ChatflowError::Store(format!("flow '{}' not found", id))),
        }
    }

    fn list(&self) -> Result<Vec<Self::Item>> {
        let (sql, values) = SeaQuery::select().from(CollectionIden::Table).columns(COLUMNS).order_by(CollectionIden::Id, SeaOrder::Asc).build_sqlx(PostgresQueryBuilder);

        self.conn.query(&sql, values).map_err(map_db_err)?.iter().map(|row| Self::Item::from_row(row).map_err(map_db_err)).collect()
    }

    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        trace!("postgres::flows::create({})", data.id);
        let (sql, sql_values) = insert(data)?;
        let result = self.conn.execute(sql.as_str(), sql_values).map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }

    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        trace!("postgres::flows::update({})", data.id);
        let (sql, sql_values) = update_by_id(data)?;
        let result = self.conn.execute(sql.as_str(), sql_values).map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        trace!("postgres::flows::delete({})", id);
        let (sql, values) =
            SeaQuery::delete().from_table(CollectionIden::Table).and_where(SeaExpr::col(CollectionIden::Id).eq(id)).build_sqlx(PostgresQueryBuilder);

        let result = self.conn.execute(sql.as_str(), values).map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

impl DbRow for data::Flow {
    fn id(&self) -> &str {
        &self.id
    }

    fn from_row(row: &PgRow) -> std::result::Result<Self, DbError>
    where
        Self: Sized,
    {
        let meta: Option<String> = row.try_get("meta")?;
        Ok(Self {
            id: row.try_get("id")?,
            data: row.try_get("data")?,
            meta: meta.map(|text| serde_json::from_str(&text)).transpose().map_err(|e| DbError::Decode(Box::new(e)))?,
            create_time: row.try_get("create_time")?,
            update_time: row.try_get("update_time")?,
        })
    }
}

impl DbInit for FlowCollection {
    fn init(&self) -> Result<()> {
        let sql = create_table();
        self.conn.batch_execute(&sql).map_err(map_db_err)
    }
}

impl FlowCollection {
    pub fn new(conn: &DbConnection) -> Self {
        Self {
            conn: conn.clone(),
        }
    }
}
