use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::catalog;
use crate::errors::AppError;
use crate::models::{CatalogEntry, CatalogKind, Guide, Hotel, HotelRoom, PricedService, ServiceSelection, Tour};

fn load(conn: &Connection, kind: CatalogKind, id: &str) -> Result<CatalogEntry, AppError> {
    catalog::get_entry(conn, kind, id)?
        .ok_or_else(|| AppError::NotFound(format!("{} entry {id}", kind.as_str())))
}

fn decode<T: crate::models::CatalogRecord>(entry: &CatalogEntry) -> Result<T, AppError> {
    entry.decode().map_err(|e| {
        tracing::error!(error = %e, id = %entry.id, kind = entry.kind.as_str(), "stored catalog entry does not decode");
        AppError::Store(e)
    })
}

fn line_total(unit: Decimal, quantity: i64) -> Result<Decimal, AppError> {
    unit.checked_mul(Decimal::from(quantity))
        .ok_or_else(|| AppError::InvalidRequest("total is too large".to_string()))
}

fn check_party(guests: i64, max_guests: i64, what: &str) -> Result<(), AppError> {
    if guests < 1 {
        return Err(AppError::InvalidRequest("guests must be at least 1".to_string()));
    }
    if guests > max_guests {
        return Err(AppError::InvalidRequest(format!(
            "{what} takes at most {max_guests} guests"
        )));
    }
    Ok(())
}

pub fn price_selection(
    conn: &Connection,
    selection: &ServiceSelection,
    guests: i64,
) -> Result<PricedService, AppError> {
    match selection {
        ServiceSelection::Room { service_id, nights } => {
            let room: HotelRoom = decode(&load(conn, CatalogKind::HotelRooms, service_id)?)?;
            if !room.available {
                return Err(AppError::InvalidRequest("room is not available".to_string()));
            }
            if *nights < 1 {
                return Err(AppError::InvalidRequest("nights must be at least 1".to_string()));
            }
            check_party(guests, room.max_guests, "room")?;

            let hotel_name = match room.hotel_id.as_deref() {
                Some(hotel_id) => catalog::get_entry(conn, CatalogKind::Hotels, hotel_id)?
                    .map(|entry| decode::<Hotel>(&entry))
                    .transpose()?
                    .map(|hotel| hotel.name),
                None => None,
            };
            let service_name = match hotel_name {
                Some(hotel) => format!("{} ({hotel})", room.room_type),
                None => room.room_type.clone(),
            };

            Ok(PricedService {
                kind: selection.kind(),
                service_id: service_id.clone(),
                service_name,
                unit_price: room.price_per_night,
                quantity: *nights,
                total_cost: line_total(room.price_per_night, *nights)?,
            })
        }
        ServiceSelection::Tour { service_id } => {
            let tour: Tour = decode(&load(conn, CatalogKind::Tours, service_id)?)?;
            check_party(guests, tour.max_guests, "tour")?;

            Ok(PricedService {
                kind: selection.kind(),
                service_id: service_id.clone(),
                service_name: tour.name,
                unit_price: tour.price,
                quantity: guests,
                total_cost: line_total(tour.price, guests)?,
            })
        }
        ServiceSelection::Guide { service_id, hours } => {
            let guide: Guide = decode(&load(conn, CatalogKind::Guides, service_id)?)?;
            if !guide.available {
                return Err(AppError::InvalidRequest("guide is not available".to_string()));
            }
            if *hours < 1 {
                return Err(AppError::InvalidRequest("hours must be at least 1".to_string()));
            }
            if guests < 1 {
                return Err(AppError::InvalidRequest("guests must be at least 1".to_string()));
            }

            Ok(PricedService {
                kind: selection.kind(),
                service_id: service_id.clone(),
                service_name: format!("Guide: {}", guide.name),
                unit_price: guide.hourly_rate,
                quantity: *hours,
                total_cost: line_total(guide.hourly_rate, *hours)?,
            })
        }
    }
}
