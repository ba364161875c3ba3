use axum::{
    Extension, Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::Europe::London;
use db::models::{Paginated, user::User};
use serde::Deserialize;
use services::{activity::{self, FormattedLog}, policy};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

const DEFAULT_PER_PAGE: u64 = 10;
const DEFAULT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Formatted activity log over a date range. An invalid or missing range
/// falls back to the trailing week rather than erroring.
pub async fn get_logs(
    State(state): State<AppState>,
    Extension(acting): Extension<User>,
    Query(query): Query<LogsQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<FormattedLog>>>, ApiError> {
    if !policy::can_view_logs(&acting) {
        return Err(ApiError::Forbidden);
    }

    let (start, end) = resolve_range(&query);
    let page = activity::format_range(
        &state.db().pool,
        start,
        end,
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(DEFAULT_PER_PAGE),
    )
    .await?;

    Ok(ResponseJson(ApiResponse::success(page)))
}

fn resolve_range(query: &LogsQuery) -> (DateTime<Utc>, DateTime<Utc>) {
    let parsed = match (
        parse_date(query.start_date.as_deref()),
        parse_date(query.end_date.as_deref()),
    ) {
        (Some(start), Some(end)) if start <= end => Some((start, end)),
        _ => None,
    };

    parsed.unwrap_or_else(|| {
        // Trailing week, on local-day boundaries.
        let today = Utc::now().with_timezone(&London).date_naive();
        let end = today
            .and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN));
        let start = (today - Duration::days(DEFAULT_WINDOW_DAYS)).and_time(NaiveTime::MIN);
        (
            start
                .and_local_timezone(London)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now),
            end.and_local_timezone(London)
                .latest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now),
        )
    })
}

fn parse_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/logs", get(get_logs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_range_is_honored() {
        let query = LogsQuery {
            start_date: Some("2025-05-01T00:00:00Z".to_string()),
            end_date: Some("2025-05-02T00:00:00Z".to_string()),
            ..Default::default()
        };
        let (start, end) = resolve_range(&query);
        assert_eq!(start.to_rfc3339(), "2025-05-01T00:00:00+00:00");
        assert!(end > start);
    }

    #[test]
    fn inverted_or_missing_range_falls_back_to_trailing_week() {
        let query = LogsQuery {
            start_date: Some("2025-05-02T00:00:00Z".to_string()),
            end_date: Some("2025-05-01T00:00:00Z".to_string()),
            ..Default::default()
        };
        let (start, end) = resolve_range(&query);
        assert!(end > start);
        assert!(end - start >= Duration::days(DEFAULT_WINDOW_DAYS));

        let (start, end) = resolve_range(&LogsQuery::default());
        assert!(end > start);
    }
}
