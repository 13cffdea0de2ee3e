use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every caller-settable field of a tower record. All of them are optional;
/// a tower with nothing but an id is a valid record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TowerAttributes {
    /// Radio access technology, e.g. GSM, UMTS, LTE
    pub radio: Option<String>,
    /// Mobile country code
    pub mcc: Option<i32>,
    pub net: Option<i32>,
    pub area: Option<i32>,
    pub cell: Option<i32>,
    pub unit: Option<i32>,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    /// Estimated coverage radius
    pub range: Option<i32>,
    /// Number of observations behind this record
    pub samples: Option<i32>,
    pub changeable: Option<i32>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub average_signal: Option<i32>,
}

/// A stored tower. The id is assigned by the store on insert and never
/// changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CellTower {
    pub id: i64,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub attributes: TowerAttributes,
}

impl CellTower {
    pub fn new(id: i64, attributes: TowerAttributes) -> Self {
        Self { id, attributes }
    }
}

macro_rules! merge_fields {
    ($target:ident, $patch:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $patch.$field {
                $target.$field = Some(value);
            }
        )+
    };
}

impl TowerAttributes {
    /// Overwrite every field that is set in `patch`. Fields left as `None`
    /// in the patch keep their current value, so a merge can never clear a
    /// field.
    pub fn merge(&mut self, patch: TowerAttributes) {
        let target = self;
        merge_fields!(
            target,
            patch,
            radio,
            mcc,
            net,
            area,
            cell,
            unit,
            lon,
            lat,
            range,
            samples,
            changeable,
            created,
            updated,
            average_signal,
        );
    }
}
