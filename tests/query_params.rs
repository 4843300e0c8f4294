use axum_car_market_api::routes::params::{CarModelQuery, DateRange, Pagination, ReportQuery};
use chrono::NaiveDate;

#[test]
fn pagination_defaults_and_clamps() {
    let (page, per_page, offset) = Pagination {
        page: None,
        per_page: None,
    }
    .normalize();
    assert_eq!((page, per_page, offset), (1, 20, 0));

    let (page, per_page, offset) = Pagination {
        page: Some(0),
        per_page: Some(1000),
    }
    .normalize();
    assert_eq!((page, per_page, offset), (1, 100, 0));

    let (page, per_page, offset) = Pagination {
        page: Some(3),
        per_page: Some(10),
    }
    .normalize();
    assert_eq!((page, per_page, offset), (3, 10, 20));

    let (_, per_page, _) = Pagination {
        page: Some(1),
        per_page: Some(0),
    }
    .normalize();
    assert_eq!(per_page, 1);
}

#[test]
fn date_range_covers_the_full_last_day() {
    let range = DateRange::new(
        Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
        Some(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()),
    );
    let (from, to) = range.bounds();
    assert_eq!(from.unwrap().to_rfc3339(), "2024-03-01T00:00:00+00:00");
    // Upper bound is the start of the next day, so 23:59:59 on the 5th is in.
    assert_eq!(to.unwrap().to_rfc3339(), "2024-03-06T00:00:00+00:00");
}

#[test]
fn date_range_sides_are_independent() {
    let (from, to) = DateRange::new(None, None).bounds();
    assert!(from.is_none());
    assert!(to.is_none());

    let (from, to) =
        DateRange::new(None, Some(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())).bounds();
    assert!(from.is_none());
    assert_eq!(to.unwrap().to_rfc3339(), "2024-02-01T00:00:00+00:00");
}

#[test]
fn report_limit_defaults_and_clamps() {
    let query = ReportQuery {
        date_from: None,
        date_to: None,
        limit: None,
    };
    assert_eq!(query.normalized_limit(), 10);

    let query = ReportQuery {
        date_from: None,
        date_to: None,
        limit: Some(0),
    };
    assert_eq!(query.normalized_limit(), 1);

    let query = ReportQuery {
        date_from: None,
        date_to: None,
        limit: Some(500),
    };
    assert_eq!(query.normalized_limit(), 100);
}

#[test]
fn car_model_limit_defaults_and_clamps() {
    let query = CarModelQuery {
        q: None,
        limit: None,
    };
    assert_eq!(query.normalized_limit(), 20);

    let query = CarModelQuery {
        q: None,
        limit: Some(-5),
    };
    assert_eq!(query.normalized_limit(), 1);
}
