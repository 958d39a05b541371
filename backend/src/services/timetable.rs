use campus_database::models::{NewTimetableEntry, TimetableEntry};
use campus_database::Stores;
use campus_middleware::AuthUser;
use campus_models::timetable::{CreateTimetableEntryRequest, TimetableQuery, DAYS_PER_WEEK, PERIODS_PER_DAY};
use campus_observability::log_timetable_change;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use super::sections::require_active_section;
use super::{normalize_section, require_academic_year, SERVICE_NAME};
use crate::errors::{ServiceError, ServiceResult};

/// `grid[day][period - 1]`, Monday first; free periods are `null`.
pub type WeekGrid = Vec<Vec<Option<TimetableEntry>>>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionTimetable {
    pub batch_id: Uuid,
    pub section: String,
    pub academic_year: Option<String>,
    pub entries: Vec<TimetableEntry>,
    pub grid: WeekGrid,
}

/// Narrows a section's entries to one academic year: the requested one,
/// or the latest year present.
pub fn single_year(entries: Vec<TimetableEntry>, requested: Option<String>) -> (Option<String>, Vec<TimetableEntry>) {
    let year = requested.or_else(|| entries.iter().map(|e| e.academic_year.clone()).max());
    let entries = match &year {
        Some(year) => entries.into_iter().filter(|e| &e.academic_year == year).collect(),
        None => entries,
    };
    (year, entries)
}

pub fn build_grid(entries: &[TimetableEntry]) -> WeekGrid {
    let mut grid = vec![vec![None; PERIODS_PER_DAY]; DAYS_PER_WEEK];
    for entry in entries {
        let period = entry.period_number as usize;
        if (1..=PERIODS_PER_DAY).contains(&period) {
            grid[entry.day_of_week.index()][period - 1] = Some(entry.clone());
        }
    }
    grid
}

pub struct TimetableService {
    stores: Stores,
}

impl TimetableService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Places one period. Subject and teacher come from the allocation,
    /// which has to describe the same class.
    pub async fn create(&self, actor: &AuthUser, request: CreateTimetableEntryRequest) -> ServiceResult<TimetableEntry> {
        request.validate()?;
        let academic_year = require_academic_year(&request.academic_year)?;
        let section = normalize_section(&request.section)?;
        if request.start_time >= request.end_time {
            return Err(ServiceError::bad_request("Start time must be before end time"));
        }

        let allocation = self
            .stores
            .allocations
            .find(request.teacher_allocation_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Teacher allocation"))?;
        let same_class = allocation.department_id == request.department_id
            && allocation.batch_id == request.batch_id
            && allocation.section == section
            && allocation.year == request.year
            && allocation.academic_year == academic_year;
        if !same_class {
            return Err(ServiceError::bad_request(
                "Teacher allocation does not match this department, batch, section, year and academic year",
            ));
        }
        require_active_section(
            &self.stores,
            request.department_id,
            request.batch_id,
            request.year,
            &academic_year,
            &section,
        )
        .await?;

        let entry = self
            .stores
            .timetable
            .create(NewTimetableEntry {
                department_id: request.department_id,
                batch_id: request.batch_id,
                section,
                year: request.year,
                day_of_week: request.day_of_week,
                period_number: request.period_number,
                start_time: request.start_time,
                end_time: request.end_time,
                subject_id: allocation.subject_id,
                teacher_id: allocation.teacher_id,
                teacher_allocation_id: allocation.id,
                room_number: request
                    .room_number
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty()),
                academic_year,
            })
            .await?;

        log_timetable_change(SERVICE_NAME, entry.id, "timetable_entry_created", Some(actor.id));
        Ok(entry)
    }

    /// Without an academic year the latest one holding entries is shown.
    pub async fn for_section(
        &self,
        batch_id: Uuid,
        section: &str,
        query: TimetableQuery,
    ) -> ServiceResult<SectionTimetable> {
        let section = normalize_section(section)?;
        let academic_year = query.academic_year.map(|y| y.trim().to_string());

        let entries = self
            .stores
            .timetable
            .list_for_section(batch_id, &section, academic_year.as_deref())
            .await?;
        let (academic_year, entries) = single_year(entries, academic_year);
        let grid = build_grid(&entries);

        Ok(SectionTimetable {
            batch_id,
            section,
            academic_year,
            entries,
            grid,
        })
    }

    /// Attendance taken for the entry stays in place.
    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<()> {
        self.stores.timetable.delete(id).await?;
        log_timetable_change(SERVICE_NAME, id, "timetable_entry_deleted", Some(actor.id));
        Ok(())
    }
}
