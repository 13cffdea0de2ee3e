use crate::{
    store::{PageRequest, SortDirection, SortField, DEFAULT_PAGE_SIZE},
    Error, Result,
};
use serde::Deserialize;

/// Paging query parameters. Missing values fall back to the first page of
/// twenty towers ordered by ascending id.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
}

impl TryFrom<PageParams> for PageRequest {
    type Error = Error;

    fn try_from(params: PageParams) -> Result<Self> {
        let sort = params
            .sort_by
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or(SortField::Id);
        let direction = params
            .sort_direction
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or(SortDirection::Asc);
        PageRequest::new(
            params.page.unwrap_or(0),
            params.size.unwrap_or(DEFAULT_PAGE_SIZE as i64),
            sort,
            direction,
        )
    }
}

/// Inclusive average signal range
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalParams {
    pub min_signal: i32,
    pub max_signal: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page_by_id() {
        let request = PageRequest::try_from(PageParams::default()).unwrap();
        assert_eq!(PageRequest::default(), request);
    }

    #[test]
    fn parses_sort_parameters() {
        let request = PageRequest::try_from(PageParams {
            page: Some(2),
            size: Some(50),
            sort_by: Some("averageSignal".to_string()),
            sort_direction: Some("DESC".to_string()),
        })
        .unwrap();
        assert_eq!(2, request.page());
        assert_eq!(50, request.size());
        assert_eq!(SortField::AverageSignal, request.sort());
        assert_eq!(SortDirection::Desc, request.direction());
    }

    #[test]
    fn rejects_unknown_sort_field() {
        let result = PageRequest::try_from(PageParams {
            sort_by: Some("password".to_string()),
            ..Default::default()
        });
        assert!(matches!(result, Err(Error::InvalidPage(_))));
    }
}
