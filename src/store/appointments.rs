use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::new_id,
    errors::ApiError,
    models::{AppointmentRow, APPOINTMENT_STATUSES, STATUS_CANCELLED, STATUS_PENDING},
};

pub const OPENING_HOUR: u32 = 9;
pub const CLOSING_HOUR: u32 = 18;

const COLUMNS: &str = r#"a.id, a.user_id, a.service_id, a.appointment_date,
                  a.client_name, a.client_email, a.client_phone, a.notes, a.status,
                  s.name as service_name, a.created_at, a.updated_at"#;

#[derive(Debug, Deserialize)]
pub struct AppointmentInput {
    pub service_id: String,
    pub appointment_date: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentUpdate {
    pub service_id: Option<String>,
    pub appointment_date: Option<String>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

/// Parses a client-supplied timestamp and normalizes it to UTC so that
/// equality checks against stored values are exact.
pub fn canonical_date(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|_| {
            ApiError::Validation("appointment_date must be an RFC 3339 timestamp".to_string())
        })
}

pub async fn list_all(
    pool: &SqlitePool,
    range: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> Result<Vec<AppointmentRow>, sqlx::Error> {
    if let Some((start, end)) = range {
        return sqlx::query_as::<_, AppointmentRow>(&format!(
            r#"SELECT {COLUMNS}
               FROM appointments a
               JOIN services s ON a.service_id = s.id
               WHERE a.appointment_date >= ? AND a.appointment_date <= ?
               ORDER BY a.appointment_date ASC"#
        ))
        .bind(start.to_rfc3339())
        .bind(end.to_rfc3339())
        .fetch_all(pool)
        .await;
    }

    sqlx::query_as::<_, AppointmentRow>(&format!(
        r#"SELECT {COLUMNS}
           FROM appointments a
           JOIN services s ON a.service_id = s.id
           ORDER BY a.appointment_date DESC"#
    ))
    .fetch_all(pool)
    .await
}

pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<AppointmentRow>, sqlx::Error> {
    sqlx::query_as::<_, AppointmentRow>(&format!(
        r#"SELECT {COLUMNS}
           FROM appointments a
           JOIN services s ON a.service_id = s.id
           WHERE a.user_id = ?
           ORDER BY a.appointment_date DESC"#
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch(pool: &SqlitePool, id: &str) -> Result<Option<AppointmentRow>, sqlx::Error> {
    sqlx::query_as::<_, AppointmentRow>(&format!(
        r#"SELECT {COLUMNS}
           FROM appointments a
           JOIN services s ON a.service_id = s.id
           WHERE a.id = ?
           LIMIT 1"#
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create(
    pool: &SqlitePool,
    user_id: &str,
    input: &AppointmentInput,
) -> Result<AppointmentRow, ApiError> {
    if input.client_name.trim().len() < 2 {
        return Err(ApiError::Validation(
            "client_name must be at least 2 characters".to_string(),
        ));
    }
    if !input.client_email.contains('@') {
        return Err(ApiError::Validation(
            "client_email must be a valid email address".to_string(),
        ));
    }
    if input.client_phone.trim().is_empty() {
        return Err(ApiError::Validation("client_phone is required".to_string()));
    }

    let date = canonical_date(&input.appointment_date)?;
    if date <= Utc::now() {
        return Err(ApiError::Validation(
            "appointment_date must be in the future".to_string(),
        ));
    }

    let service = crate::store::services::fetch_active(pool, &input.service_id).await?;
    if service.is_none() {
        return Err(ApiError::Validation(
            "service not found or inactive".to_string(),
        ));
    }

    ensure_slot_free(pool, &input.service_id, &date, None).await?;

    let id = new_id();
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"INSERT INTO appointments (id, user_id, service_id, appointment_date, client_name, client_email, client_phone, notes, status, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(&input.service_id)
    .bind(date.to_rfc3339())
    .bind(input.client_name.trim())
    .bind(input.client_email.trim())
    .bind(input.client_phone.trim())
    .bind(&input.notes)
    .bind(STATUS_PENDING)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    fetch(pool, &id)
        .await?
        .ok_or_else(|| ApiError::Internal("appointment vanished after insert".to_string()))
}

pub async fn update(
    pool: &SqlitePool,
    id: &str,
    input: &AppointmentUpdate,
) -> Result<Option<AppointmentRow>, ApiError> {
    let Some(existing) = fetch(pool, id).await? else {
        return Ok(None);
    };

    if let Some(status) = input.status.as_deref() {
        if !APPOINTMENT_STATUSES.contains(&status) {
            return Err(ApiError::Validation(format!("unknown status '{status}'")));
        }
    }

    let date = match input.appointment_date.as_deref() {
        Some(raw) => {
            let date = canonical_date(raw)?;
            if date <= Utc::now() {
                return Err(ApiError::Validation(
                    "appointment_date must be in the future".to_string(),
                ));
            }
            Some(date)
        }
        None => None,
    };

    if let Some(service_id) = input.service_id.as_deref() {
        if crate::store::services::fetch_active(pool, service_id)
            .await?
            .is_none()
        {
            return Err(ApiError::Validation(
                "service not found or inactive".to_string(),
            ));
        }
    }

    // Moving the appointment re-runs the slot check against everyone else.
    let target_service = input.service_id.as_deref().unwrap_or(&existing.service_id);
    let target_date = match date {
        Some(date) => date,
        None => canonical_date(&existing.appointment_date)?,
    };
    let moved = target_service != existing.service_id
        || target_date.to_rfc3339() != existing.appointment_date;
    if moved {
        ensure_slot_free(pool, target_service, &target_date, Some(id)).await?;
    }

    sqlx::query(
        r#"UPDATE appointments
           SET service_id = COALESCE(?, service_id),
               appointment_date = COALESCE(?, appointment_date),
               client_name = COALESCE(?, client_name),
               client_email = COALESCE(?, client_email),
               client_phone = COALESCE(?, client_phone),
               notes = COALESCE(?, notes),
               status = COALESCE(?, status),
               updated_at = ?
           WHERE id = ?"#,
    )
    .bind(&input.service_id)
    .bind(date.map(|date| date.to_rfc3339()))
    .bind(&input.client_name)
    .bind(&input.client_email)
    .bind(&input.client_phone)
    .bind(&input.notes)
    .bind(&input.status)
    .bind(Utc::now().to_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(fetch(pool, id).await?)
}

pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Hourly buckets for one day, minus the hours already booked for the
/// service by a non-cancelled appointment.
pub async fn available_slots(
    pool: &SqlitePool,
    service_id: &str,
    date_raw: &str,
) -> Result<Vec<String>, ApiError> {
    let date = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d")
        .map_err(|_| ApiError::Validation("date must be formatted YYYY-MM-DD".to_string()))?;

    if crate::store::services::fetch(pool, service_id).await?.is_none() {
        return Err(ApiError::NotFound("service not found".to_string()));
    }

    let Some(day_start) = date.and_hms_opt(0, 0, 0) else {
        return Err(ApiError::Validation("invalid date".to_string()));
    };
    let day_start = Utc.from_utc_datetime(&day_start);
    let day_end = day_start + Duration::days(1);

    let booked = sqlx::query_as::<_, (String,)>(
        r#"SELECT appointment_date FROM appointments
           WHERE service_id = ?
             AND appointment_date >= ? AND appointment_date < ?
             AND status != ?"#,
    )
    .bind(service_id)
    .bind(day_start.to_rfc3339())
    .bind(day_end.to_rfc3339())
    .bind(STATUS_CANCELLED)
    .fetch_all(pool)
    .await?;

    let taken: Vec<u32> = booked
        .iter()
        .filter_map(|(raw,)| DateTime::parse_from_rfc3339(raw).ok())
        .map(|date| date.with_timezone(&Utc).hour())
        .collect();

    Ok(build_slots(date, &taken))
}

fn build_slots(date: NaiveDate, taken_hours: &[u32]) -> Vec<String> {
    (OPENING_HOUR..CLOSING_HOUR)
        .filter(|hour| !taken_hours.contains(hour))
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive).to_rfc3339())
        .collect()
}

async fn ensure_slot_free(
    pool: &SqlitePool,
    service_id: &str,
    date: &DateTime<Utc>,
    exclude_id: Option<&str>,
) -> Result<(), ApiError> {
    let conflict = sqlx::query_as::<_, (String,)>(
        r#"SELECT id FROM appointments
           WHERE service_id = ?
             AND appointment_date = ?
             AND status != ?
             AND id != ?
           LIMIT 1"#,
    )
    .bind(service_id)
    .bind(date.to_rfc3339())
    .bind(STATUS_CANCELLED)
    .bind(exclude_id.unwrap_or(""))
    .fetch_optional(pool)
    .await?;

    if conflict.is_some() {
        return Err(ApiError::Conflict(
            "this slot is already booked".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 6, 15).unwrap()
    }

    #[test]
    fn full_day_yields_all_hourly_slots() {
        let slots = build_slots(day(), &[]);
        assert_eq!(slots.len(), (CLOSING_HOUR - OPENING_HOUR) as usize);
        assert!(slots[0].starts_with("2030-06-15T09:00:00"));
        assert!(slots.last().unwrap().starts_with("2030-06-15T17:00:00"));
    }

    #[test]
    fn taken_hours_are_excluded() {
        let slots = build_slots(day(), &[10, 14]);
        assert_eq!(slots.len(), 7);
        assert!(!slots.iter().any(|slot| slot.contains("T10:00")));
        assert!(!slots.iter().any(|slot| slot.contains("T14:00")));
        assert!(slots.iter().any(|slot| slot.contains("T09:00")));
    }

    #[test]
    fn hours_outside_opening_times_are_ignored() {
        let slots = build_slots(day(), &[7, 20]);
        assert_eq!(slots.len(), (CLOSING_HOUR - OPENING_HOUR) as usize);
    }

    #[test]
    fn canonical_date_normalizes_offsets() {
        let date = canonical_date("2030-06-15T12:00:00+02:00").unwrap();
        assert_eq!(date.to_rfc3339(), "2030-06-15T10:00:00+00:00");
    }

    #[test]
    fn canonical_date_rejects_garbage() {
        assert!(canonical_date("next tuesday").is_err());
        assert!(canonical_date("2030-06-15").is_err());
    }
}
