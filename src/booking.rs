// src/booking.rs

use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Local, NaiveDate, Utc};
use futures_util::TryStreamExt;
use log::{info, warn};
use mongodb::bson::{doc, to_bson, Bson, Document};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::db::{BOOKINGS, CUSTOMERS, GROUNDS, MATCH_REQUESTS, TEAMS, TEAM_REQUESTS};
use crate::error::{ApiError, ApiResult};
use crate::ground::find_ground;
use crate::mailer::{render_booking_confirmation, BookingConfirmation};
use crate::models::{
    new_id, Booking, BookingStatus, BookingView, Customer, CustomerProfile, Ground, MatchRequest,
    MatchRequestStatus, Team, TeamProfile, TeamRequest,
};
use crate::schedule::{validate_booking, ClockTime, OpeningHours, SlotRequest, TimeSlot};

const DEFAULT_PAYMENT_METHOD: &str = "cash";
const DEFAULT_PAYMENT_STATUS: &str = "pending";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub customer: Option<String>,
    pub customer_name: Option<String>,
    pub team: Option<String>,
    #[serde(default)]
    pub players_required: u32,
    pub booking_date: NaiveDate,
    pub booking_time: String,
    pub booking_duration: f64,
    pub booking_price: f64,
    pub booking_status: Option<BookingStatus>,
    pub payment_method: Option<String>,
    pub payment_status: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub ground: String,
    #[serde(default)]
    pub team_required: bool,
    #[serde(default)]
    pub with_lights: bool,
    pub tid: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    pub customer: Option<String>,
    pub customer_name: Option<String>,
    pub booking_date: Option<NaiveDate>,
    pub booking_time: Option<String>,
    pub booking_duration: Option<f64>,
    pub booking_price: Option<f64>,
    pub booking_status: Option<BookingStatus>,
    pub payment_method: Option<String>,
    pub payment_status: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub ground: Option<String>,
    pub with_lights: Option<bool>,
    pub tid: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub booking_status: BookingStatus,
}

/// Slots already occupied on `date`: live bookings plus the ground's reserved times.
/// Bookings on the day before or after are moved onto `date`'s clock so a slot
/// running past midnight still blocks the other day.
/// `skip` leaves one booking out so an edit is not compared with itself.
pub fn taken_slots(bookings: &[Booking], ground: &Ground, date: NaiveDate, skip: Option<&str>) -> Vec<TimeSlot> {
    let on_date = |other: NaiveDate, slot: TimeSlot| {
        let days = (other - date).num_days();
        if days.abs() > 1 {
            None
        } else {
            slot.relative_to_day(days)
        }
    };

    let booked = bookings
        .iter()
        .filter(|b| b.booking_status != BookingStatus::Cancelled)
        .filter(|b| skip != Some(b.id.as_str()))
        .filter_map(|b| {
            let start = ClockTime::parse(&b.booking_time).ok()?;
            on_date(b.booking_date, TimeSlot::starting_at(start, b.booking_duration))
        });

    let reserved = ground.reserved_times.iter().filter_map(|r| {
        let start = ClockTime::parse(&r.time[0]).ok()?;
        let end = ClockTime::parse(&r.time[1]).ok()?;
        on_date(r.date, TimeSlot::between(start, end))
    });

    booked.chain(reserved).collect()
}

/// A booking has to win its slot again when it moves, or when it comes back
/// from being cancelled, since cancelled bookings free their slot.
pub fn needs_recheck(current: BookingStatus, next: BookingStatus, slot_changed: bool) -> bool {
    next != BookingStatus::Cancelled && (slot_changed || current == BookingStatus::Cancelled)
}

/// `tid` only makes sense for non-cash payments.
fn effective_tid(payment_method: &str, tid: Option<String>) -> Option<String> {
    if payment_method.eq_ignore_ascii_case("cash") {
        None
    } else {
        tid
    }
}

async fn check_slot(
    data: &AppState,
    ground: &Ground,
    request: &SlotRequest<'_>,
    skip: Option<&str>,
) -> ApiResult<()> {
    let days: Vec<String> = [request.date.pred_opt(), Some(request.date), request.date.succ_opt()]
        .into_iter()
        .flatten()
        .map(|d| d.to_string())
        .collect();
    let nearby: Vec<Booking> = data
        .mongodb
        .collection::<Booking>(BOOKINGS)
        .find(doc! {
            "ground": &ground.id,
            "bookingDate": { "$in": days },
            "bookingStatus": { "$ne": BookingStatus::Cancelled.as_str() },
        })
        .await?
        .try_collect()
        .await?;

    let taken = taken_slots(&nearby, ground, request.date, skip);
    let hours = OpeningHours::parse(&ground.start_time, &ground.end_time)
        .map_err(|e| ApiError::Internal(format!("Ground {} has invalid opening hours: {}", ground.id, e)))?;
    validate_booking(request, Local::now().date_naive(), hours, &taken)?;
    Ok(())
}

async fn find_booking(data: &AppState, id: &str) -> ApiResult<Booking> {
    data.mongodb
        .collection::<Booking>(BOOKINGS)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| ApiError::not_found("Booking not found"))
}

async fn by_ids<T>(data: &AppState, collection: &str, ids: Vec<String>) -> ApiResult<Vec<T>>
where
    T: serde::Serialize + serde::de::DeserializeOwned + Send + Sync + Unpin,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let docs = data
        .mongodb
        .collection::<T>(collection)
        .find(doc! { "_id": { "$in": ids } })
        .await?
        .try_collect()
        .await?;
    Ok(docs)
}

fn distinct(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut ids: Vec<String> = ids.collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Resolves the customer, ground and team referenced by each booking.
async fn populate(data: &AppState, bookings: Vec<Booking>) -> ApiResult<Vec<BookingView>> {
    let customers: HashMap<String, CustomerProfile> = by_ids::<Customer>(
        data,
        CUSTOMERS,
        distinct(bookings.iter().filter_map(|b| b.customer.clone())),
    )
    .await?
    .into_iter()
    .map(|c| (c.id.clone(), CustomerProfile::from(c)))
    .collect();

    let grounds: HashMap<String, Ground> =
        by_ids::<Ground>(data, GROUNDS, distinct(bookings.iter().map(|b| b.ground.clone())))
            .await?
            .into_iter()
            .map(|g| (g.id.clone(), g))
            .collect();

    let teams: HashMap<String, TeamProfile> =
        by_ids::<Team>(data, TEAMS, distinct(bookings.iter().filter_map(|b| b.team.clone())))
            .await?
            .into_iter()
            .map(|t| (t.id.clone(), TeamProfile::from(t)))
            .collect();

    Ok(bookings
        .into_iter()
        .map(|booking| BookingView {
            customer_details: booking.customer.as_ref().and_then(|id| customers.get(id).cloned()),
            ground_details: grounds.get(&booking.ground).cloned(),
            team_details: booking.team.as_ref().and_then(|id| teams.get(id).cloned()),
            booking,
        })
        .collect())
}

/// GET /bookings, /teams/bookings
pub async fn get_bookings(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let bookings: Vec<Booking> = data
        .mongodb
        .collection::<Booking>(BOOKINGS)
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;
    let bookings = populate(&data, bookings).await?;
    Ok(HttpResponse::Ok().json(json!({ "bookings": bookings })))
}

/// POST /bookings, /teams/bookings
pub async fn add_booking(
    data: web::Data<AppState>,
    info: web::Json<CreateBookingRequest>,
) -> ApiResult<HttpResponse> {
    let info = info.into_inner();
    crate::schedule::validate_duration(info.booking_duration)?;
    let ground = find_ground(&data, &info.ground).await?;

    let slot = SlotRequest {
        date: info.booking_date,
        time: &info.booking_time,
        duration_hours: info.booking_duration,
    };
    check_slot(&data, &ground, &slot, None).await?;

    let payment_method = info
        .payment_method
        .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string());
    let now = Utc::now();
    let booking = Booking {
        id: new_id(),
        customer: info.customer.clone(),
        customer_name: info.customer_name,
        team: info.team.clone(),
        booking_date: info.booking_date,
        booking_time: ClockTime::parse(&info.booking_time)?.to_string(),
        booking_duration: info.booking_duration,
        booking_price: info.booking_price,
        booking_status: info.booking_status.unwrap_or_default(),
        tid: effective_tid(&payment_method, info.tid),
        payment_method,
        payment_status: info
            .payment_status
            .unwrap_or_else(|| DEFAULT_PAYMENT_STATUS.to_string()),
        payment_date: info.payment_date,
        ground: ground.id.clone(),
        team_required: info.team_required,
        with_lights: info.with_lights,
        phone: info.phone,
        created_at: now,
        updated_at: now,
    };
    data.mongodb.collection::<Booking>(BOOKINGS).insert_one(&booking).await?;
    info!(
        "Booking {} created on ground {} for {} {}",
        booking.id, ground.name, booking.booking_date, booking.booking_time
    );

    if info.players_required > 0 {
        let request = MatchRequest {
            id: new_id(),
            match_maker: info.customer,
            players_required: info.players_required,
            booking_id: booking.id.clone(),
            joined_players: Vec::new(),
            status: MatchRequestStatus::Open,
            created_at: now,
        };
        data.mongodb
            .collection::<MatchRequest>(MATCH_REQUESTS)
            .insert_one(&request)
            .await?;
        info!("Match request {} opened for {} players", request.id, request.players_required);
    }

    if info.team_required {
        let request = TeamRequest {
            id: new_id(),
            match_maker: info.team,
            booking_id: booking.id.clone(),
            interested_teams: Vec::new(),
            created_at: now,
        };
        data.mongodb
            .collection::<TeamRequest>(TEAM_REQUESTS)
            .insert_one(&request)
            .await?;
        info!("Team request {} opened", request.id);
    }

    Ok(HttpResponse::Created().json(json!({ "message": "Booking added successfully" })))
}

/// PUT /bookings/{id}
pub async fn update_booking(
    data: web::Data<AppState>,
    _admin: AdminUser,
    booking_id: web::Path<String>,
    info: web::Json<UpdateBookingRequest>,
) -> ApiResult<HttpResponse> {
    let booking_id = booking_id.into_inner();
    let info = info.into_inner();
    let current = find_booking(&data, &booking_id).await?;

    let date = info.booking_date.unwrap_or(current.booking_date);
    let time = info.booking_time.unwrap_or_else(|| current.booking_time.clone());
    let duration = info.booking_duration.unwrap_or(current.booking_duration);
    let ground_id = info.ground.unwrap_or_else(|| current.ground.clone());

    let status = info.booking_status.unwrap_or(current.booking_status);

    let slot_changed = date != current.booking_date
        || time != current.booking_time
        || duration != current.booking_duration
        || ground_id != current.ground;
    if needs_recheck(current.booking_status, status, slot_changed) {
        crate::schedule::validate_duration(duration)?;
        let ground = find_ground(&data, &ground_id).await?;
        let slot = SlotRequest {
            date,
            time: &time,
            duration_hours: duration,
        };
        check_slot(&data, &ground, &slot, Some(&booking_id)).await?;
    }

    let payment_method = info.payment_method.unwrap_or(current.payment_method);
    let tid = effective_tid(&payment_method, info.tid.or(current.tid));

    let mut update = Document::new();
    update.insert("bookingDate", date.to_string());
    update.insert("bookingTime", ClockTime::parse(&time)?.to_string());
    update.insert("bookingDuration", duration);
    update.insert("ground", ground_id);
    update.insert("bookingPrice", info.booking_price.unwrap_or(current.booking_price));
    update.insert("bookingStatus", status.as_str());
    update.insert("paymentMethod", payment_method);
    update.insert(
        "paymentStatus",
        info.payment_status.unwrap_or(current.payment_status),
    );
    if let Some(paid) = info.payment_date {
        update.insert("paymentDate", to_bson(&paid)?);
    }
    update.insert("tid", tid.map(Bson::String).unwrap_or(Bson::Null));
    if let Some(with_lights) = info.with_lights {
        update.insert("withLights", with_lights);
    }
    if let Some(phone) = info.phone {
        update.insert("phone", phone);
    }
    if let Some(customer) = info.customer.filter(|c| !c.is_empty()) {
        update.insert("customer", customer);
        update.insert("customerName", Bson::Null);
    } else if let Some(name) = info.customer_name.filter(|n| !n.is_empty()) {
        update.insert("customerName", name);
        update.insert("customer", Bson::Null);
    }
    update.insert("updatedAt", to_bson(&Utc::now())?);

    data.mongodb
        .collection::<Booking>(BOOKINGS)
        .update_one(doc! { "_id": &booking_id }, doc! { "$set": update })
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Booking updated successfully" })))
}

async fn set_status(data: &AppState, booking_id: &str, status: BookingStatus) -> ApiResult<()> {
    let result = data
        .mongodb
        .collection::<Booking>(BOOKINGS)
        .update_one(
            doc! { "_id": booking_id },
            doc! { "$set": { "bookingStatus": status.as_str(), "updatedAt": to_bson(&Utc::now())? } },
        )
        .await?;
    if result.matched_count == 0 {
        return Err(ApiError::not_found("Booking not found"));
    }
    Ok(())
}

/// PATCH /bookings/{id}/cancel
pub async fn cancel_booking(
    data: web::Data<AppState>,
    _admin: AdminUser,
    booking_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    set_status(&data, &booking_id, BookingStatus::Cancelled).await?;
    info!("Booking {} cancelled", booking_id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Booking cancelled successfully" })))
}

/// PATCH /bookings/{id}/status
pub async fn change_status(
    data: web::Data<AppState>,
    _admin: AdminUser,
    booking_id: web::Path<String>,
    info: web::Json<StatusRequest>,
) -> ApiResult<HttpResponse> {
    let status = info.booking_status;
    let booking = find_booking(&data, &booking_id).await?;
    if needs_recheck(booking.booking_status, status, false) {
        let ground = find_ground(&data, &booking.ground).await?;
        let slot = SlotRequest {
            date: booking.booking_date,
            time: &booking.booking_time,
            duration_hours: booking.booking_duration,
        };
        check_slot(&data, &ground, &slot, Some(&booking.id)).await?;
    }
    set_status(&data, &booking_id, status).await?;

    if status == BookingStatus::Confirmed {
        if let Some(customer_id) = booking.customer.as_deref() {
            send_confirmation(&data, &booking, customer_id).await?;
        }
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Booking status updated successfully" })))
}

/// Mail delivery problems are logged; the status change itself already succeeded.
async fn send_confirmation(data: &AppState, booking: &Booking, customer_id: &str) -> ApiResult<()> {
    let customer = data
        .mongodb
        .collection::<Customer>(CUSTOMERS)
        .find_one(doc! { "_id": customer_id })
        .await?;
    let Some(customer) = customer else {
        warn!("Booking {} references missing customer {}", booking.id, customer_id);
        return Ok(());
    };
    let ground_name = data
        .mongodb
        .collection::<Ground>(GROUNDS)
        .find_one(doc! { "_id": &booking.ground })
        .await?
        .map(|g| g.name)
        .unwrap_or_default();

    let mail = render_booking_confirmation(
        &customer.email,
        &BookingConfirmation {
            customer_name: &customer.username,
            ground_name: &ground_name,
            booking_date: booking.booking_date,
            booking_time: &booking.booking_time,
            booking_duration: booking.booking_duration,
        },
    );
    if let Err(e) = data.mailer.send(&mail).await {
        warn!("Confirmation email for booking {} failed: {}", booking.id, e);
    }
    Ok(())
}

/// DELETE /bookings/{id}
pub async fn delete_booking(
    data: web::Data<AppState>,
    _admin: AdminUser,
    booking_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let result = data
        .mongodb
        .collection::<Booking>(BOOKINGS)
        .delete_one(doc! { "_id": booking_id.as_str() })
        .await?;
    if result.deleted_count == 0 {
        return Err(ApiError::not_found("Booking not found"));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Booking deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReservedTime;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 6, d).unwrap()
    }

    fn booking(id: &str, date: NaiveDate, time: &str, hours: f64, status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id: id.to_string(),
            customer: None,
            customer_name: Some("walk-in".into()),
            team: None,
            booking_date: date,
            booking_time: time.to_string(),
            booking_duration: hours,
            booking_price: 3000.0,
            booking_status: status,
            payment_method: "cash".into(),
            payment_status: "pending".into(),
            payment_date: None,
            ground: "g1".into(),
            team_required: false,
            with_lights: false,
            tid: None,
            phone: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn ground(reserved: Vec<ReservedTime>) -> Ground {
        Ground {
            id: "g1".into(),
            name: "Arena".into(),
            city: "Lahore".into(),
            location: None,
            description: None,
            start_time: "08:00".into(),
            end_time: "23:00".into(),
            rate_with_lights: 5000.0,
            rate_without_lights: 3000.0,
            image: None,
            reserved_times: reserved,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn cancelled_and_other_days_do_not_block() {
        let bookings = vec![
            booking("a", day(1), "10:00", 2.0, BookingStatus::Confirmed),
            booking("b", day(1), "14:00", 1.0, BookingStatus::Cancelled),
            booking("c", day(3), "10:00", 1.0, BookingStatus::Pending),
        ];
        let taken = taken_slots(&bookings, &ground(vec![]), day(1), None);
        assert_eq!(taken, vec![TimeSlot { start: 600, end: 720 }]);
    }

    #[test]
    fn late_bookings_spill_into_the_next_day() {
        let bookings = vec![
            booking("late", day(1), "23:00", 3.0, BookingStatus::Confirmed),
            booking("evening", day(1), "18:00", 2.0, BookingStatus::Confirmed),
            booking("early", day(3), "00:30", 1.0, BookingStatus::Pending),
        ];
        let mut overnight = ground(vec![]);
        overnight.start_time = "16:00".into();
        overnight.end_time = "03:00".into();

        let taken = taken_slots(&bookings, &overnight, day(2), None);
        assert_eq!(
            taken,
            vec![TimeSlot { start: 0, end: 120 }, TimeSlot { start: 1470, end: 1530 }]
        );

        let hours = OpeningHours::parse("16:00", "03:00").unwrap();
        let early = SlotRequest {
            date: day(2),
            time: "00:30",
            duration_hours: 1.0,
        };
        assert!(validate_booking(&early, day(1), hours, &taken).is_err());

        let past_midnight = SlotRequest {
            date: day(2),
            time: "23:30",
            duration_hours: 2.0,
        };
        assert!(validate_booking(&past_midnight, day(1), hours, &taken).is_err());
    }

    #[test]
    fn reviving_a_cancelled_booking_rechecks_its_slot() {
        use BookingStatus::*;
        assert!(needs_recheck(Cancelled, Confirmed, false));
        assert!(needs_recheck(Cancelled, Pending, false));
        assert!(needs_recheck(Pending, Confirmed, true));
        assert!(!needs_recheck(Pending, Confirmed, false));
        assert!(!needs_recheck(Cancelled, Cancelled, true));
        assert!(!needs_recheck(Confirmed, Cancelled, true));
    }

    #[test]
    fn reserved_times_block_their_day() {
        let reserved = vec![
            ReservedTime {
                date: day(1),
                time: ["18:00".into(), "20:30".into()],
            },
            ReservedTime {
                date: day(3),
                time: ["09:00".into(), "10:00".into()],
            },
        ];
        let taken = taken_slots(&[], &ground(reserved), day(1), None);
        assert_eq!(taken, vec![TimeSlot { start: 1080, end: 1230 }]);
    }

    #[test]
    fn edited_booking_is_not_compared_with_itself() {
        let bookings = vec![
            booking("a", day(1), "10:00", 2.0, BookingStatus::Confirmed),
            booking("b", day(1), "13:00", 1.0, BookingStatus::Pending),
        ];
        let taken = taken_slots(&bookings, &ground(vec![]), day(1), Some("a"));
        assert_eq!(taken, vec![TimeSlot { start: 780, end: 840 }]);

        let hours = OpeningHours::parse("08:00", "23:00").unwrap();
        let moved = SlotRequest {
            date: day(1),
            time: "11:00",
            duration_hours: 2.0,
        };
        assert!(validate_booking(&moved, day(1), hours, &taken).is_ok());
    }

    #[test]
    fn cash_payments_drop_the_transaction_id() {
        assert_eq!(effective_tid("cash", Some("TX1".into())), None);
        assert_eq!(effective_tid("Cash", Some("TX1".into())), None);
        assert_eq!(effective_tid("card", Some("TX1".into())), Some("TX1".into()));
    }
}
