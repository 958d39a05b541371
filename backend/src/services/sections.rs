use campus_database::models::{NewSection, Section, SectionFilter, StudentFilter};
use campus_database::Stores;
use campus_middleware::AuthUser;
use campus_models::academics::{CreateSectionsRequest, SectionQuery, UpdateSectionRequest};
use campus_observability::log_registry_change;
use uuid::Uuid;
use validator::Validate;

use super::{require_academic_year, SERVICE_NAME};
use crate::errors::{ServiceError, ServiceResult};

const SECTION_LETTERS: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

/// The first `count` section letters, A onwards.
pub fn section_letters(count: usize) -> Vec<String> {
    SECTION_LETTERS.iter().take(count).map(|s| s.to_string()).collect()
}

pub fn is_section_name(value: &str) -> bool {
    SECTION_LETTERS.contains(&value)
}

/// The active Section behind a (department, batch, year, academic year,
/// letter) reference.
pub(crate) async fn require_active_section(
    stores: &Stores,
    department_id: Uuid,
    batch_id: Uuid,
    year: i16,
    academic_year: &str,
    section_name: &str,
) -> ServiceResult<Section> {
    let filter = SectionFilter {
        department_id: Some(department_id),
        batch_id: Some(batch_id),
        academic_year: Some(academic_year.to_string()),
        year: Some(year),
    };
    stores
        .sections
        .list(&filter)
        .await?
        .into_iter()
        .find(|s| s.section_name == section_name)
        .ok_or_else(|| ServiceError::not_found("Section"))
}

/// Active students currently placed in the section's letter of its
/// department and batch.
pub(crate) async fn enrolled_count(stores: &Stores, section: &Section) -> ServiceResult<usize> {
    let students = stores
        .users
        .list_students(&StudentFilter {
            department_id: Some(section.department_id),
            batch_id: Some(section.batch_id),
            section: Some(section.section_name.clone()),
        })
        .await?;
    Ok(students.len())
}

pub(crate) fn ensure_room(section: &Section, enrolled: usize) -> ServiceResult<()> {
    if enrolled >= section.capacity.max(0) as usize {
        return Err(ServiceError::Conflict(format!(
            "Section {} is full ({} of {} seats taken)",
            section.section_name, enrolled, section.capacity
        )));
    }
    Ok(())
}

pub struct SectionService {
    stores: Stores,
}

impl SectionService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Creates sections A.. for one (department, batch, year, academic
    /// year). Nothing is written when any letter is already taken.
    pub async fn create(&self, actor: &AuthUser, request: CreateSectionsRequest) -> ServiceResult<Vec<Section>> {
        request.validate()?;
        let academic_year = require_academic_year(&request.academic_year)?;

        if self.stores.departments.find(request.department_id).await?.is_none() {
            return Err(ServiceError::not_found("Department"));
        }
        let batch = self
            .stores
            .batches
            .find(request.batch_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Batch"))?;
        if !batch.includes(request.department_id) {
            return Err(ServiceError::bad_request("Department is not part of this batch"));
        }

        let sections = section_letters(request.number_of_sections as usize)
            .into_iter()
            .map(|section_name| NewSection {
                department_id: request.department_id,
                batch_id: request.batch_id,
                year: request.year,
                section_name,
                capacity: request.capacity,
                academic_year: academic_year.clone(),
            })
            .collect();

        let created = self.stores.sections.create_all(sections).await?;
        for section in &created {
            log_registry_change(SERVICE_NAME, "section", section.id, "section_created", Some(actor.id));
        }
        Ok(created)
    }

    /// Unknown ids narrow to an empty list.
    pub async fn list(&self, query: SectionQuery) -> ServiceResult<Vec<Section>> {
        let filter = SectionFilter {
            department_id: query.department_id,
            batch_id: query.batch_id,
            academic_year: query.academic_year.map(|y| y.trim().to_string()),
            year: query.year,
        };
        Ok(self.stores.sections.list(&filter).await?)
    }

    /// Capacity cannot drop below the students already placed.
    pub async fn update(&self, actor: &AuthUser, id: Uuid, request: UpdateSectionRequest) -> ServiceResult<Section> {
        request.validate()?;
        let current = self
            .stores
            .sections
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Section"))?;
        let enrolled = enrolled_count(&self.stores, &current).await?;
        if (request.capacity.max(0) as usize) < enrolled {
            return Err(ServiceError::Conflict(format!(
                "Section {} already has {} students",
                current.section_name, enrolled
            )));
        }

        let section = self.stores.sections.update_capacity(id, request.capacity).await?;
        log_registry_change(SERVICE_NAME, "section", id, "section_updated", Some(actor.id));
        Ok(section)
    }

    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<()> {
        self.stores.sections.deactivate(id).await?;
        log_registry_change(SERVICE_NAME, "section", id, "section_deactivated", Some(actor.id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_start_at_a() {
        assert_eq!(section_letters(3), vec!["A", "B", "C"]);
        assert_eq!(section_letters(6).last().map(String::as_str), Some("F"));
        assert!(section_letters(0).is_empty());
    }

    #[test]
    fn only_a_to_f_are_section_names() {
        assert!(is_section_name("A"));
        assert!(is_section_name("F"));
        assert!(!is_section_name("G"));
        assert!(!is_section_name("a"));
    }

    fn section(capacity: i16) -> Section {
        Section {
            id: Uuid::new_v4(),
            department_id: Uuid::new_v4(),
            batch_id: Uuid::new_v4(),
            year: 1,
            section_name: "A".into(),
            capacity,
            academic_year: "2024-2025".into(),
            is_active: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn a_section_at_capacity_is_full() {
        assert!(ensure_room(&section(10), 9).is_ok());
        let err = ensure_room(&section(10), 10).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(err.to_string(), "Section A is full (10 of 10 seats taken)");
    }
}
