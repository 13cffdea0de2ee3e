pub mod memory;
pub mod postgres;

pub use memory::MemoryTowerStore;
pub use postgres::PgTowerStore;

use crate::{CellTower, Result, Settings, TowerAttributes};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, str::FromStr, sync::Arc};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 2000;

/// Persistence for tower records.
///
/// Lookups by id or predicate are side effect free. Mutations keyed by id
/// check for the record and apply the change atomically, failing with
/// [`crate::Error::NotFound`] if it is absent. All list results are ordered
/// by ascending id.
#[async_trait]
pub trait TowerStore: Send + Sync {
    async fn insert(&self, attributes: TowerAttributes) -> Result<CellTower>;

    async fn insert_many(&self, towers: Vec<TowerAttributes>) -> Result<Vec<CellTower>>;

    async fn find_all(&self) -> Result<Vec<CellTower>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<CellTower>>;

    async fn find_matching(&self, filter: &TowerFilter) -> Result<Vec<CellTower>>;

    /// One page of towers, optionally restricted to those matching `filter`.
    async fn find_page(
        &self,
        filter: Option<&TowerFilter>,
        request: &PageRequest,
    ) -> Result<Page<CellTower>>;

    /// First tower by id matching `filter`
    async fn find_first(&self, filter: &TowerFilter) -> Result<Option<CellTower>>;

    async fn count(&self) -> Result<u64>;

    async fn count_matching(&self, filter: &TowerFilter) -> Result<u64>;

    /// Replace every attribute of tower `id` with `attributes`.
    async fn replace(&self, id: i64, attributes: TowerAttributes) -> Result<CellTower>;

    /// Merge the fields set in `patch` into tower `id`, see
    /// [`TowerAttributes::merge`].
    async fn patch(&self, id: i64, patch: TowerAttributes) -> Result<CellTower>;

    async fn delete(&self, id: i64) -> Result;

    async fn delete_all(&self) -> Result;

    async fn find_by_cell(&self, cell: i32) -> Result<Option<CellTower>> {
        self.find_first(&TowerFilter::Cell(cell)).await
    }

    async fn find_by_radio(&self, radio: &str) -> Result<Vec<CellTower>> {
        self.find_matching(&TowerFilter::Radio(radio.to_string()))
            .await
    }

    async fn find_by_mcc(&self, mcc: i32) -> Result<Vec<CellTower>> {
        self.find_matching(&TowerFilter::Mcc(mcc)).await
    }

    async fn find_by_radio_page(&self, radio: &str, request: &PageRequest) -> Result<Page<CellTower>> {
        self.find_page(Some(&TowerFilter::Radio(radio.to_string())), request)
            .await
    }

    async fn find_by_mcc_page(&self, mcc: i32, request: &PageRequest) -> Result<Page<CellTower>> {
        self.find_page(Some(&TowerFilter::Mcc(mcc)), request).await
    }

    async fn find_by_net(&self, net: i32) -> Result<Vec<CellTower>> {
        self.find_matching(&TowerFilter::Net(net)).await
    }

    async fn find_by_area(&self, area: i32) -> Result<Vec<CellTower>> {
        self.find_matching(&TowerFilter::Area(area)).await
    }

    async fn find_by_changeable(&self, flag: i32) -> Result<Vec<CellTower>> {
        self.find_matching(&TowerFilter::Changeable(flag)).await
    }

    async fn find_by_radio_and_mcc(&self, radio: &str, mcc: i32) -> Result<Vec<CellTower>> {
        self.find_matching(&TowerFilter::RadioAndMcc {
            radio: radio.to_string(),
            mcc,
        })
        .await
    }

    async fn find_within_bounds(&self, bounds: Bounds) -> Result<Vec<CellTower>> {
        self.find_matching(&TowerFilter::WithinBounds(bounds)).await
    }

    async fn find_by_samples_greater_than(&self, samples: i32) -> Result<Vec<CellTower>> {
        self.find_matching(&TowerFilter::SamplesGreaterThan(samples))
            .await
    }

    async fn find_by_signal_between(&self, min: i32, max: i32) -> Result<Vec<CellTower>> {
        self.find_matching(&TowerFilter::SignalBetween { min, max })
            .await
    }

    async fn count_by_radio(&self, radio: &str) -> Result<u64> {
        self.count_matching(&TowerFilter::Radio(radio.to_string()))
            .await
    }
}

/// Open the store described by `settings`: Postgres when a database is
/// configured, otherwise an in-memory store that lives as long as the
/// process. Postgres pool gauges are reported until `shutdown` fires.
pub async fn open(
    settings: &Settings,
    shutdown: triggered::Listener,
) -> Result<Arc<dyn TowerStore>> {
    match &settings.database {
        Some(database) => {
            let app_name = env!("CARGO_PKG_NAME");
            let store = PgTowerStore::connect(database, app_name).await?;
            db_store::metric_tracker::start(app_name, store.pool().clone(), shutdown);
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("no database configured, towers are kept in memory");
            Ok(Arc::new(MemoryTowerStore::default()))
        }
    }
}

/// Inclusive longitude and latitude ranges.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl Bounds {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.min_lon..=self.max_lon).contains(&lon) && (self.min_lat..=self.max_lat).contains(&lat)
    }
}

/// Predicates the store can select towers by. A tower whose relevant field
/// is null never matches.
#[derive(Debug, Clone, PartialEq)]
pub enum TowerFilter {
    Radio(String),
    Mcc(i32),
    RadioAndMcc { radio: String, mcc: i32 },
    Net(i32),
    Area(i32),
    Cell(i32),
    Changeable(i32),
    WithinBounds(Bounds),
    /// Strictly more samples than the given count
    SamplesGreaterThan(i32),
    /// Average signal within the inclusive range
    SignalBetween { min: i32, max: i32 },
}

impl TowerFilter {
    pub fn matches(&self, tower: &TowerAttributes) -> bool {
        match self {
            Self::Radio(radio) => tower.radio.as_deref() == Some(radio.as_str()),
            Self::Mcc(mcc) => tower.mcc == Some(*mcc),
            Self::RadioAndMcc { radio, mcc } => {
                tower.radio.as_deref() == Some(radio.as_str()) && tower.mcc == Some(*mcc)
            }
            Self::Net(net) => tower.net == Some(*net),
            Self::Area(area) => tower.area == Some(*area),
            Self::Cell(cell) => tower.cell == Some(*cell),
            Self::Changeable(flag) => tower.changeable == Some(*flag),
            Self::WithinBounds(bounds) => match (tower.lon, tower.lat) {
                (Some(lon), Some(lat)) => bounds.contains(lon, lat),
                _ => false,
            },
            Self::SamplesGreaterThan(samples) => tower.samples.is_some_and(|s| s > *samples),
            Self::SignalBetween { min, max } => tower
                .average_signal
                .is_some_and(|signal| (*min..=*max).contains(&signal)),
        }
    }
}

/// Fields a page of towers may be sorted by, named as they appear in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    Id,
    Radio,
    Mcc,
    Net,
    Area,
    Cell,
    Unit,
    Lon,
    Lat,
    Range,
    Samples,
    Changeable,
    Created,
    Updated,
    AverageSignal,
}

impl SortField {
    const ALL: [SortField; 15] = [
        Self::Id,
        Self::Radio,
        Self::Mcc,
        Self::Net,
        Self::Area,
        Self::Cell,
        Self::Unit,
        Self::Lon,
        Self::Lat,
        Self::Range,
        Self::Samples,
        Self::Changeable,
        Self::Created,
        Self::Updated,
        Self::AverageSignal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Radio => "radio",
            Self::Mcc => "mcc",
            Self::Net => "net",
            Self::Area => "area",
            Self::Cell => "cell",
            Self::Unit => "unit",
            Self::Lon => "lon",
            Self::Lat => "lat",
            Self::Range => "range",
            Self::Samples => "samples",
            Self::Changeable => "changeable",
            Self::Created => "created",
            Self::Updated => "updated",
            Self::AverageSignal => "averageSignal",
        }
    }

    /// Column holding this field in the `cell_tower` table
    pub fn column(&self) -> &'static str {
        match self {
            Self::Range => "\"range\"",
            Self::AverageSignal => "average_signal",
            other => other.name(),
        }
    }

    /// Ascending order with nulls last. Ids are not compared here, the
    /// caller breaks ties.
    fn compare(&self, a: &CellTower, b: &CellTower) -> Ordering {
        let (a, b) = (&a.attributes, &b.attributes);
        match self {
            Self::Id => Ordering::Equal,
            Self::Radio => nulls_last(a.radio.as_ref(), b.radio.as_ref(), Ord::cmp),
            Self::Mcc => nulls_last(a.mcc, b.mcc, |a, b| a.cmp(&b)),
            Self::Net => nulls_last(a.net, b.net, |a, b| a.cmp(&b)),
            Self::Area => nulls_last(a.area, b.area, |a, b| a.cmp(&b)),
            Self::Cell => nulls_last(a.cell, b.cell, |a, b| a.cmp(&b)),
            Self::Unit => nulls_last(a.unit, b.unit, |a, b| a.cmp(&b)),
            Self::Lon => nulls_last(a.lon, b.lon, |a, b| a.total_cmp(&b)),
            Self::Lat => nulls_last(a.lat, b.lat, |a, b| a.total_cmp(&b)),
            Self::Range => nulls_last(a.range, b.range, |a, b| a.cmp(&b)),
            Self::Samples => nulls_last(a.samples, b.samples, |a, b| a.cmp(&b)),
            Self::Changeable => nulls_last(a.changeable, b.changeable, |a, b| a.cmp(&b)),
            Self::Created => nulls_last(a.created, b.created, |a, b| a.cmp(&b)),
            Self::Updated => nulls_last(a.updated, b.updated, |a, b| a.cmp(&b)),
            Self::AverageSignal => {
                nulls_last(a.average_signal, b.average_signal, |a, b| a.cmp(&b))
            }
        }
    }
}

fn nulls_last<T>(a: Option<T>, b: Option<T>, cmp: impl FnOnce(T, T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SortField {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| crate::Error::InvalidPage(format!("unknown sort field {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(crate::Error::InvalidPage(format!(
                "sort direction must be asc or desc, got {s}"
            )))
        }
    }
}

/// A validated request for one page of towers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
    sort: SortField,
    direction: SortDirection,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: SortField::Id,
            direction: SortDirection::Asc,
        }
    }
}

impl PageRequest {
    pub fn new(page: i64, size: i64, sort: SortField, direction: SortDirection) -> Result<Self> {
        let page = u32::try_from(page).map_err(|_| {
            crate::Error::InvalidPage(format!("page must be between 0 and {}", u32::MAX))
        })?;
        let size = u32::try_from(size)
            .ok()
            .filter(|size| (1..=MAX_PAGE_SIZE).contains(size))
            .ok_or_else(|| {
                crate::Error::InvalidPage(format!("size must be between 1 and {MAX_PAGE_SIZE}"))
            })?;
        Ok(Self {
            page,
            size,
            sort,
            direction,
        })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn sort(&self) -> SortField {
        self.sort
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn offset(&self) -> u64 {
        self.page as u64 * self.size as u64
    }

    /// Order towers by the requested field and direction, then by ascending
    /// id.
    pub fn compare(&self, a: &CellTower, b: &CellTower) -> Ordering {
        let ordering = self.sort.compare(a, b);
        let ordering = match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        match (self.sort, ordering) {
            (SortField::Id, _) => match self.direction {
                SortDirection::Asc => a.id.cmp(&b.id),
                SortDirection::Desc => b.id.cmp(&a.id),
            },
            (_, Ordering::Equal) => a.id.cmp(&b.id),
            (_, ordering) => ordering,
        }
    }
}

/// One page of results along with the totals needed to page through the
/// rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u64,
    pub number: u32,
    pub size: u32,
    pub number_of_elements: usize,
    pub first: bool,
    pub last: bool,
    pub empty: bool,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        let total_pages = total_elements.div_ceil(request.size as u64);
        Self {
            number_of_elements: content.len(),
            empty: content.is_empty(),
            first: request.page == 0,
            last: request.page as u64 + 1 >= total_pages,
            number: request.page,
            size: request.size,
            total_elements,
            total_pages,
            content,
        }
    }
}
