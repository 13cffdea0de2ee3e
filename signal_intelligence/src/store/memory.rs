use super::{Page, PageRequest, TowerFilter, TowerStore};
use crate::{CellTower, Error, Result, TowerAttributes};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Towers held in process memory. Used when no database is configured and
/// by tests. Ids start at 1 and are never reused.
#[derive(Default)]
pub struct MemoryTowerStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    last_id: i64,
    towers: BTreeMap<i64, TowerAttributes>,
}

impl Inner {
    fn insert(&mut self, attributes: TowerAttributes) -> CellTower {
        self.last_id += 1;
        self.towers.insert(self.last_id, attributes.clone());
        CellTower::new(self.last_id, attributes)
    }

    fn matching<'a>(
        &'a self,
        filter: Option<&'a TowerFilter>,
    ) -> impl Iterator<Item = CellTower> + 'a {
        self.towers
            .iter()
            .filter(move |(_, tower)| filter.map_or(true, |filter| filter.matches(tower)))
            .map(|(id, tower)| CellTower::new(*id, tower.clone()))
    }
}

#[async_trait]
impl TowerStore for MemoryTowerStore {
    async fn insert(&self, attributes: TowerAttributes) -> Result<CellTower> {
        Ok(self.inner.write().await.insert(attributes))
    }

    async fn insert_many(&self, towers: Vec<TowerAttributes>) -> Result<Vec<CellTower>> {
        let mut inner = self.inner.write().await;
        Ok(towers
            .into_iter()
            .map(|attributes| inner.insert(attributes))
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<CellTower>> {
        Ok(self.inner.read().await.matching(None).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<CellTower>> {
        Ok(self
            .inner
            .read()
            .await
            .towers
            .get(&id)
            .map(|tower| CellTower::new(id, tower.clone())))
    }

    async fn find_matching(&self, filter: &TowerFilter) -> Result<Vec<CellTower>> {
        Ok(self.inner.read().await.matching(Some(filter)).collect())
    }

    async fn find_page(
        &self,
        filter: Option<&TowerFilter>,
        request: &PageRequest,
    ) -> Result<Page<CellTower>> {
        let mut towers: Vec<CellTower> = self.inner.read().await.matching(filter).collect();
        let total = towers.len() as u64;
        towers.sort_by(|a, b| request.compare(a, b));
        let content = towers
            .into_iter()
            .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
            .take(request.size() as usize)
            .collect();
        Ok(Page::new(content, request, total))
    }

    async fn find_first(&self, filter: &TowerFilter) -> Result<Option<CellTower>> {
        Ok(self.inner.read().await.matching(Some(filter)).next())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.inner.read().await.towers.len() as u64)
    }

    async fn count_matching(&self, filter: &TowerFilter) -> Result<u64> {
        Ok(self.inner.read().await.matching(Some(filter)).count() as u64)
    }

    async fn replace(&self, id: i64, attributes: TowerAttributes) -> Result<CellTower> {
        let mut inner = self.inner.write().await;
        let tower = inner.towers.get_mut(&id).ok_or(Error::NotFound(id))?;
        *tower = attributes;
        Ok(CellTower::new(id, tower.clone()))
    }

    async fn patch(&self, id: i64, patch: TowerAttributes) -> Result<CellTower> {
        let mut inner = self.inner.write().await;
        let tower = inner.towers.get_mut(&id).ok_or(Error::NotFound(id))?;
        tower.merge(patch);
        Ok(CellTower::new(id, tower.clone()))
    }

    async fn delete(&self, id: i64) -> Result {
        self.inner
            .write()
            .await
            .towers
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::NotFound(id))
    }

    async fn delete_all(&self) -> Result {
        self.inner.write().await.towers.clear();
        Ok(())
    }
}
