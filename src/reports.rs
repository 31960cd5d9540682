// src/reports.rs

use std::collections::BTreeMap;

use actix_web::{web, HttpResponse};
use chrono::{Datelike, NaiveDate};
use futures::stream::TryStreamExt;
use log::debug;
use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::db::{BOOKINGS, CUSTOMERS, EMAILS, GROUNDS, LEAGUES, REVIEWS, TEAMS};
use crate::error::{ApiError, ApiResult};
use crate::models::{Booking, BookingStatus, Ground, GroundSummary, Review};

// ─── DASHBOARD COUNTS ──────────────────────────────────────────────────────────

pub fn average_rating(ratings: &[u8]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let total: u32 = ratings.iter().map(|&r| r as u32).sum();
    (total as f64 / ratings.len() as f64 * 10.0).round() / 10.0
}

/// GET /admin/statistics
pub async fn get_statistics(data: web::Data<AppState>, _admin: AdminUser) -> ApiResult<HttpResponse> {
    let db = &data.mongodb.db;
    let count = |name: &'static str, filter: Document| async move {
        db.collection::<Document>(name).count_documents(filter).await
    };

    let reviews: Vec<Review> = data
        .mongodb
        .collection::<Review>(REVIEWS)
        .find(doc! {})
        .await?
        .try_collect()
        .await?;
    let ratings: Vec<u8> = reviews.iter().map(|r| r.rating).collect();

    let (users, emails, grounds, leagues, confirmed, completed, teams) = tokio::try_join!(
        count(CUSTOMERS, doc! {}),
        count(EMAILS, doc! {}),
        count(GROUNDS, doc! {}),
        count(LEAGUES, doc! {}),
        count(BOOKINGS, doc! { "bookingStatus": BookingStatus::Confirmed.as_str() }),
        count(BOOKINGS, doc! { "bookingStatus": BookingStatus::Completed.as_str() }),
        count(TEAMS, doc! {}),
    )?;

    Ok(HttpResponse::Ok().json(json!({
        "totalNumberOfUsers": users,
        "totalNumberOfEmails": emails,
        "totalNumberOfGrounds": grounds,
        "totalNumberOfLeagues": leagues,
        "totalNumberOfConfirmedBookings": confirmed,
        "totalNumberOfCompletedBookings": completed,
        "totalNumberOfTeams": teams,
        "averageRating": average_rating(&ratings),
    })))
}

// ─── FINANCIAL REPORT ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub bookings: u32,
    pub revenue: f64,
    pub hours: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroundReport {
    pub ground_id: String,
    pub ground_name: String,
    pub total_revenue: f64,
    pub total_bookings: u32,
    pub total_hours: f64,
    pub bookings_with_lights: u32,
    pub bookings_without_lights: u32,
    pub daily_data: Vec<DailyRow>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IncludedGround {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CombinedReport {
    pub total_revenue: f64,
    pub total_bookings: u32,
    pub total_hours: f64,
    pub bookings_with_lights: u32,
    pub bookings_without_lights: u32,
    pub daily_data: Vec<DailyRow>,
    pub included_grounds: Vec<IncludedGround>,
}

fn add_to_day(days: &mut BTreeMap<NaiveDate, DailyRow>, date: NaiveDate, bookings: u32, revenue: f64, hours: f64) {
    let row = days.entry(date).or_insert(DailyRow {
        date,
        bookings: 0,
        revenue: 0.0,
        hours: 0.0,
    });
    row.bookings += bookings;
    row.revenue += revenue;
    row.hours += hours;
}

/// Totals for one ground. Bookings that are neither confirmed nor completed are ignored.
pub fn ground_report(ground_id: &str, ground_name: &str, bookings: &[Booking]) -> GroundReport {
    let mut report = GroundReport {
        ground_id: ground_id.to_string(),
        ground_name: ground_name.to_string(),
        total_revenue: 0.0,
        total_bookings: 0,
        total_hours: 0.0,
        bookings_with_lights: 0,
        bookings_without_lights: 0,
        daily_data: Vec::new(),
    };
    let mut days = BTreeMap::new();

    for b in bookings.iter().filter(|b| b.booking_status.is_billable()) {
        report.total_revenue += b.booking_price;
        report.total_bookings += 1;
        report.total_hours += b.booking_duration;
        if b.with_lights {
            report.bookings_with_lights += 1;
        } else {
            report.bookings_without_lights += 1;
        }
        add_to_day(&mut days, b.booking_date, 1, b.booking_price, b.booking_duration);
    }

    report.daily_data = days.into_values().collect();
    report
}

pub fn combine_reports(reports: &[GroundReport]) -> CombinedReport {
    let mut combined = CombinedReport::default();
    let mut days = BTreeMap::new();

    for r in reports {
        combined.included_grounds.push(IncludedGround {
            id: r.ground_id.clone(),
            name: r.ground_name.clone(),
        });
        combined.total_revenue += r.total_revenue;
        combined.total_bookings += r.total_bookings;
        combined.total_hours += r.total_hours;
        combined.bookings_with_lights += r.bookings_with_lights;
        combined.bookings_without_lights += r.bookings_without_lights;
        for row in &r.daily_data {
            add_to_day(&mut days, row.date, row.bookings, row.revenue, row.hours);
        }
    }

    combined.daily_data = days.into_values().collect();
    combined
}

/// First and last day of a month; `month` is 1-based.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialReportQuery {
    pub ground_id: Option<String>,
    pub month: Option<String>,
    pub year: Option<String>,
}

async fn report_for_ground(data: &AppState, ground_id: &str, first: NaiveDate, last: NaiveDate) -> ApiResult<GroundReport> {
    let ground = data
        .mongodb
        .collection::<Ground>(GROUNDS)
        .find_one(doc! { "_id": ground_id })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Ground with ID {} not found", ground_id)))?;

    let filter = doc! {
        "ground": ground_id,
        "bookingDate": { "$gte": first.to_string(), "$lte": last.to_string() },
        "bookingStatus": { "$in": [BookingStatus::Confirmed.as_str(), BookingStatus::Completed.as_str()] },
    };
    let bookings: Vec<Booking> = data
        .mongodb
        .collection::<Booking>(BOOKINGS)
        .find(filter)
        .sort(doc! { "bookingDate": 1 })
        .await?
        .try_collect()
        .await?;

    debug!("{} billable bookings for ground {} in {}-{:02}", bookings.len(), ground_id, first.year(), first.month());
    Ok(ground_report(&ground.id, &ground.name, &bookings))
}

/// GET /admin/financial-report?groundId=a,b&month=M&year=Y
pub async fn get_financial_report(
    data: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<FinancialReportQuery>,
) -> ApiResult<HttpResponse> {
    let ground_ids: Vec<String> = query
        .ground_id
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect();
    if ground_ids.is_empty() {
        return Err(ApiError::bad_request("Ground ID is required"));
    }

    let month: Option<u32> = query.month.as_deref().and_then(|m| m.trim().parse().ok());
    let year: Option<i32> = query.year.as_deref().and_then(|y| y.trim().parse().ok());
    let (first, last) = month
        .zip(year)
        .and_then(|(m, y)| month_bounds(y, m))
        .ok_or_else(|| ApiError::bad_request("Invalid month or year format"))?;

    let mut reports = Vec::with_capacity(ground_ids.len());
    for id in &ground_ids {
        reports.push(report_for_ground(&data, id, first, last).await?);
    }

    if reports.len() == 1 {
        Ok(HttpResponse::Ok().json(&reports[0]))
    } else {
        Ok(HttpResponse::Ok().json(combine_reports(&reports)))
    }
}

/// GET /admin/report-grounds
pub async fn get_grounds_for_report(data: web::Data<AppState>, _admin: AdminUser) -> ApiResult<HttpResponse> {
    let grounds: Vec<GroundSummary> = data
        .mongodb
        .collection::<GroundSummary>(GROUNDS)
        .find(doc! {})
        .projection(doc! { "_id": 1, "name": 1, "city": 1, "rateWithLights": 1, "rateWithoutLights": 1 })
        .sort(doc! { "name": 1 })
        .await?
        .try_collect()
        .await?;
    Ok(HttpResponse::Ok().json(grounds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn booking(date: NaiveDate, price: f64, hours: f64, lights: bool, status: BookingStatus) -> Booking {
        Booking {
            id: crate::models::new_id(),
            customer: None,
            customer_name: Some("Walk-in".into()),
            team: None,
            booking_date: date,
            booking_time: "18:00".into(),
            booking_duration: hours,
            booking_price: price,
            booking_status: status,
            payment_method: "cash".into(),
            payment_status: "paid".into(),
            payment_date: None,
            ground: "g1".into(),
            team_required: false,
            with_lights: lights,
            tid: None,
            phone: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn average_rating_rounds_to_one_decimal() {
        assert_eq!(average_rating(&[]), 0.0);
        assert_eq!(average_rating(&[5, 4, 4]), 4.3);
        assert_eq!(average_rating(&[3]), 3.0);
    }

    #[test]
    fn month_bounds_cover_whole_month() {
        assert_eq!(month_bounds(2024, 2), Some((NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())));
        assert_eq!(month_bounds(2023, 12).unwrap().1, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(month_bounds(2024, 0), None);
        assert_eq!(month_bounds(2024, 13), None);
    }

    #[test]
    fn ground_report_totals_billable_bookings() {
        let bookings = vec![
            booking(day(3), 5000.0, 1.5, true, BookingStatus::Confirmed),
            booking(day(3), 4000.0, 1.0, false, BookingStatus::Completed),
            booking(day(1), 3000.0, 2.0, false, BookingStatus::Confirmed),
            booking(day(2), 9999.0, 1.0, true, BookingStatus::Cancelled),
            booking(day(2), 9999.0, 1.0, true, BookingStatus::Pending),
        ];
        let report = ground_report("g1", "Arena", &bookings);
        assert_eq!(report.total_bookings, 3);
        assert_eq!(report.total_revenue, 12000.0);
        assert_eq!(report.total_hours, 4.5);
        assert_eq!(report.bookings_with_lights, 1);
        assert_eq!(report.bookings_without_lights, 2);

        let dates: Vec<NaiveDate> = report.daily_data.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(1), day(3)]);
        assert_eq!(report.daily_data[1].bookings, 2);
        assert_eq!(report.daily_data[1].revenue, 9000.0);
    }

    #[test]
    fn combined_report_merges_days() {
        let a = ground_report("g1", "Arena", &[booking(day(4), 1000.0, 1.0, true, BookingStatus::Confirmed)]);
        let b = ground_report(
            "g2",
            "Dome",
            &[
                booking(day(4), 2000.0, 2.0, false, BookingStatus::Confirmed),
                booking(day(2), 1500.0, 1.5, false, BookingStatus::Completed),
            ],
        );
        let combined = combine_reports(&[a, b]);
        assert_eq!(combined.total_bookings, 3);
        assert_eq!(combined.total_revenue, 4500.0);
        assert_eq!(combined.included_grounds.len(), 2);
        assert_eq!(combined.included_grounds[1].name, "Dome");
        assert_eq!(combined.daily_data.len(), 2);
        assert_eq!(combined.daily_data[0].date, day(2));
        assert_eq!(combined.daily_data[1].bookings, 2);
        assert_eq!(combined.daily_data[1].hours, 3.0);
    }

    #[test]
    fn combining_nothing_is_empty() {
        assert_eq!(combine_reports(&[]), CombinedReport::default());
    }
}
