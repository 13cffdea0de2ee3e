use super::{Page, PageRequest, TowerFilter, TowerStore};
use crate::{CellTower, Error, Result, TowerAttributes};
use async_trait::async_trait;
use sqlx::{postgres::PgArguments, query::QueryAs, PgExecutor, PgPool, Postgres, QueryBuilder};

const SELECT_TOWERS: &str = r#"
    select id, radio, mcc, net, area, cell, unit, lon, lat, "range", samples,
        changeable, created, updated, average_signal
    from cell_tower
"#;

const RETURNING_TOWER: &str = r#"
    returning id, radio, mcc, net, area, cell, unit, lon, lat, "range", samples,
        changeable, created, updated, average_signal
"#;

const INSERT_TOWERS: &str = r#"
    insert into cell_tower (
        radio, mcc, net, area, cell, unit, lon, lat, "range", samples,
        changeable, created, updated, average_signal
    )
"#;

const TOWER_COLUMNS: usize = 14;
// Postgres caps a statement at u16::MAX bind parameters
const INSERT_BATCH_SIZE: usize = u16::MAX as usize / TOWER_COLUMNS;

type TowerQuery<'q> = QueryAs<'q, Postgres, CellTower, PgArguments>;

/// Towers stored in the `cell_tower` table.
#[derive(Clone)]
pub struct PgTowerStore {
    pool: PgPool,
}

impl PgTowerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with `settings` and bring the schema up to date.
    pub async fn connect(settings: &db_store::Settings, app_name: &str) -> Result<Self> {
        let pool = settings.connect(app_name).await?;
        tracing::info!("running migrations");
        sqlx::migrate!().run(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_page(
        &self,
        filter: Option<&TowerFilter>,
        request: &PageRequest,
    ) -> Result<Vec<CellTower>> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_TOWERS);
        push_filter(&mut query, filter);
        query
            .push(format!(
                " order by {} {}, id asc limit ",
                request.sort().column(),
                request.direction().keyword()
            ))
            .push_bind(request.size() as i64)
            .push(" offset ")
            .push_bind(request.offset() as i64);
        let towers = query
            .build_query_as::<CellTower>()
            .fetch_all(&self.pool)
            .await?;
        Ok(towers)
    }

    async fn count_where(&self, filter: Option<&TowerFilter>) -> Result<u64> {
        let mut query = QueryBuilder::<Postgres>::new("select count(*) from cell_tower");
        push_filter(&mut query, filter);
        let count: i64 = query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

fn bind_attributes(query: TowerQuery<'_>, attributes: TowerAttributes) -> TowerQuery<'_> {
    query
        .bind(attributes.radio)
        .bind(attributes.mcc)
        .bind(attributes.net)
        .bind(attributes.area)
        .bind(attributes.cell)
        .bind(attributes.unit)
        .bind(attributes.lon)
        .bind(attributes.lat)
        .bind(attributes.range)
        .bind(attributes.samples)
        .bind(attributes.changeable)
        .bind(attributes.created)
        .bind(attributes.updated)
        .bind(attributes.average_signal)
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: Option<&TowerFilter>) {
    let Some(filter) = filter else {
        return;
    };
    query.push(" where ");
    match filter {
        TowerFilter::Radio(radio) => {
            query.push("radio = ").push_bind(radio.clone());
        }
        TowerFilter::Mcc(mcc) => {
            query.push("mcc = ").push_bind(*mcc);
        }
        TowerFilter::RadioAndMcc { radio, mcc } => {
            query
                .push("radio = ")
                .push_bind(radio.clone())
                .push(" and mcc = ")
                .push_bind(*mcc);
        }
        TowerFilter::Net(net) => {
            query.push("net = ").push_bind(*net);
        }
        TowerFilter::Area(area) => {
            query.push("area = ").push_bind(*area);
        }
        TowerFilter::Cell(cell) => {
            query.push("cell = ").push_bind(*cell);
        }
        TowerFilter::Changeable(flag) => {
            query.push("changeable = ").push_bind(*flag);
        }
        TowerFilter::WithinBounds(bounds) => {
            query
                .push("lon between ")
                .push_bind(bounds.min_lon)
                .push(" and ")
                .push_bind(bounds.max_lon)
                .push(" and lat between ")
                .push_bind(bounds.min_lat)
                .push(" and ")
                .push_bind(bounds.max_lat);
        }
        TowerFilter::SamplesGreaterThan(samples) => {
            query.push("samples > ").push_bind(*samples);
        }
        TowerFilter::SignalBetween { min, max } => {
            query
                .push("average_signal between ")
                .push_bind(*min)
                .push(" and ")
                .push_bind(*max);
        }
    }
}

async fn update_tower<'c, E>(executor: E, id: i64, attributes: TowerAttributes) -> Result<CellTower>
where
    E: PgExecutor<'c>,
{
    let sql = format!(
        r#"
        update cell_tower set
            radio = $2, mcc = $3, net = $4, area = $5, cell = $6, unit = $7,
            lon = $8, lat = $9, "range" = $10, samples = $11, changeable = $12,
            created = $13, updated = $14, average_signal = $15
        where id = $1
        {RETURNING_TOWER}
        "#
    );
    let query = sqlx::query_as::<_, CellTower>(&sql).bind(id);
    bind_attributes(query, attributes)
        .fetch_optional(executor)
        .await?
        .ok_or(Error::NotFound(id))
}

#[async_trait]
impl TowerStore for PgTowerStore {
    async fn insert(&self, attributes: TowerAttributes) -> Result<CellTower> {
        let sql = format!(
            "{INSERT_TOWERS} values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) {RETURNING_TOWER}"
        );
        let mut txn = self.pool.begin().await?;
        let tower = bind_attributes(sqlx::query_as::<_, CellTower>(&sql), attributes)
            .fetch_one(&mut *txn)
            .await?;
        txn.commit().await?;
        Ok(tower)
    }

    async fn insert_many(&self, towers: Vec<TowerAttributes>) -> Result<Vec<CellTower>> {
        if towers.is_empty() {
            return Ok(Vec::new());
        }

        let mut inserted = Vec::with_capacity(towers.len());
        let mut txn = self.pool.begin().await?;
        for chunk in towers.chunks(INSERT_BATCH_SIZE) {
            let mut query = QueryBuilder::<Postgres>::new(INSERT_TOWERS);
            query
                .push_values(chunk, |mut b, tower| {
                    b.push_bind(tower.radio.clone())
                        .push_bind(tower.mcc)
                        .push_bind(tower.net)
                        .push_bind(tower.area)
                        .push_bind(tower.cell)
                        .push_bind(tower.unit)
                        .push_bind(tower.lon)
                        .push_bind(tower.lat)
                        .push_bind(tower.range)
                        .push_bind(tower.samples)
                        .push_bind(tower.changeable)
                        .push_bind(tower.created)
                        .push_bind(tower.updated)
                        .push_bind(tower.average_signal);
                })
                .push(RETURNING_TOWER);
            let mut rows = query
                .build_query_as::<CellTower>()
                .fetch_all(&mut *txn)
                .await?;
            rows.sort_by_key(|tower| tower.id);
            inserted.append(&mut rows);
        }
        txn.commit().await?;

        tracing::debug!(count = inserted.len(), "inserted towers");
        Ok(inserted)
    }

    async fn find_all(&self) -> Result<Vec<CellTower>> {
        let sql = format!("{SELECT_TOWERS} order by id");
        let towers = sqlx::query_as::<_, CellTower>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(towers)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<CellTower>> {
        let sql = format!("{SELECT_TOWERS} where id = $1");
        let tower = sqlx::query_as::<_, CellTower>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tower)
    }

    async fn find_matching(&self, filter: &TowerFilter) -> Result<Vec<CellTower>> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_TOWERS);
        push_filter(&mut query, Some(filter));
        query.push(" order by id");
        let towers = query
            .build_query_as::<CellTower>()
            .fetch_all(&self.pool)
            .await?;
        Ok(towers)
    }

    async fn find_page(
        &self,
        filter: Option<&TowerFilter>,
        request: &PageRequest,
    ) -> Result<Page<CellTower>> {
        let total = self.count_where(filter).await?;
        let content = self.fetch_page(filter, request).await?;
        Ok(Page::new(content, request, total))
    }

    async fn find_first(&self, filter: &TowerFilter) -> Result<Option<CellTower>> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_TOWERS);
        push_filter(&mut query, Some(filter));
        query.push(" order by id limit 1");
        let tower = query
            .build_query_as::<CellTower>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(tower)
    }

    async fn count(&self) -> Result<u64> {
        self.count_where(None).await
    }

    async fn count_matching(&self, filter: &TowerFilter) -> Result<u64> {
        self.count_where(Some(filter)).await
    }

    async fn replace(&self, id: i64, attributes: TowerAttributes) -> Result<CellTower> {
        let mut txn = self.pool.begin().await?;
        let tower = update_tower(&mut *txn, id, attributes).await?;
        txn.commit().await?;
        Ok(tower)
    }

    async fn patch(&self, id: i64, patch: TowerAttributes) -> Result<CellTower> {
        let mut txn = self.pool.begin().await?;
        let sql = format!("{SELECT_TOWERS} where id = $1 for update");
        let mut tower = sqlx::query_as::<_, CellTower>(&sql)
            .bind(id)
            .fetch_optional(&mut *txn)
            .await?
            .ok_or(Error::NotFound(id))?;
        tower.attributes.merge(patch);
        let tower = update_tower(&mut *txn, id, tower.attributes).await?;
        txn.commit().await?;
        Ok(tower)
    }

    async fn delete(&self, id: i64) -> Result {
        let mut txn = self.pool.begin().await?;
        let deleted = sqlx::query("delete from cell_tower where id = $1")
            .bind(id)
            .execute(&mut *txn)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(Error::NotFound(id));
        }
        txn.commit().await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result {
        let mut txn = self.pool.begin().await?;
        let deleted = sqlx::query("delete from cell_tower")
            .execute(&mut *txn)
            .await?
            .rows_affected();
        txn.commit().await?;
        tracing::info!(deleted, "deleted all towers");
        Ok(())
    }
}
