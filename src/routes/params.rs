use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

/// Inclusive calendar-day window. `date_to` covers its whole day: the upper
/// bound is the start of the following day, compared with `<`.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct DateRange {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(date_from: Option<NaiveDate>, date_to: Option<NaiveDate>) -> Self {
        Self { date_from, date_to }
    }

    pub fn bounds(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let from = self
            .date_from
            .map(|d| d.and_time(NaiveTime::MIN).and_utc());
        let to = self
            .date_to
            .and_then(|d| d.succ_opt())
            .map(|d| d.and_time(NaiveTime::MIN).and_utc());
        (from, to)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ListingSortBy {
    PriceAsc,
    PriceDesc,
    Newest,
}

// Pagination fields are inlined rather than flattened: flattened structs lose
// their field types in urlencoded form data and numeric params stop parsing.

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListingQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub agency_id: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: Option<ListingSortBy>,
}

impl ListingQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FavoriteListQuery {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub agency_id: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub is_used: Option<bool>,
}

impl InventoryListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaleListQuery {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub customer: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomerListQuery {
    pub q: Option<String>,
    pub min_purchases: Option<i64>,
    pub min_spent: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MyReviewQuery {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub min_rating: Option<i32>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CarModelQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
}

impl CarModelQuery {
    pub fn normalized_limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: Option<i64>,
}

impl ReportQuery {
    pub fn normalized_limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    pub fn range(&self) -> DateRange {
        DateRange::new(self.date_from, self.date_to)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminPurchaseQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub status: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl AdminPurchaseQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminReviewQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub min_rating: Option<i32>,
    pub max_rating: Option<i32>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl AdminReviewQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminFavoriteQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
}

impl AdminFavoriteQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminUserQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub role: Option<String>,
}

impl AdminUserQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}
