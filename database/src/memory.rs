//! In-memory implementation of every store, used by the test suites and
//! when no `DATABASE_URL` is configured. All state sits behind one lock,
//! so each call is atomic the way a Postgres transaction is.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{messages, StoreError, StoreResult};
use crate::models::{
    format_department_code, year_of_semester, AllocationFilter, Attendance, AttendanceFilter,
    Batch, BatchDepartment, BatchOption, DeletionPolicy, Department, Fee, FeeAssignment,
    FeeFilter, Model, NewAllocation, NewAttendance, NewBatch, NewDepartment, NewFee, NewSection,
    NewSemester, NewSubject, NewTimetableEntry, NewUser, Payment, Section, SectionFilter,
    Semester, StudentFilter, Subject, SubjectFilter, TeacherAllocation, TimetableEntry, User,
};
use crate::repositories::{
    AllocationStore, AttendanceStore, BatchStore, DepartmentStore, FeeStore, SectionStore,
    SemesterStore, SubjectStore, TimetableStore, UserStore,
};
use crate::utils::generate_id;

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    department_seq: i64,
    users: Vec<User>,
    departments: Vec<Department>,
    batches: Vec<Batch>,
    sections: Vec<Section>,
    semesters: Vec<Semester>,
    subjects: Vec<Subject>,
    allocations: Vec<TeacherAllocation>,
    timetable: Vec<TimetableEntry>,
    attendance: Vec<Attendance>,
    fees: Vec<Fee>,
}

/// Column a restricted child uses to point at the row being deleted.
#[derive(Debug, Clone, Copy)]
enum Owner {
    Department,
    Batch,
    Semester,
    Subject,
    Allocation,
}

impl State {
    fn referenced(&self, child: &str, owner: Owner, id: Uuid) -> bool {
        match (child, owner) {
            ("batches", Owner::Department) => self.batches.iter().any(|b| b.includes(id)),
            ("sections", Owner::Department) => self.sections.iter().any(|s| s.department_id == id),
            ("sections", Owner::Batch) => self.sections.iter().any(|s| s.batch_id == id),
            ("semesters", Owner::Department) => self.semesters.iter().any(|s| s.department_id == id),
            ("subjects", Owner::Department) => self.subjects.iter().any(|s| s.department_id == id),
            ("teacher allocations", Owner::Department) => {
                self.allocations.iter().any(|a| a.department_id == id)
            }
            ("teacher allocations", Owner::Batch) => self.allocations.iter().any(|a| a.batch_id == id),
            ("teacher allocations", Owner::Subject) => {
                self.allocations.iter().any(|a| a.subject_id == id)
            }
            ("timetable entries", Owner::Batch) => self.timetable.iter().any(|t| t.batch_id == id),
            ("timetable entries", Owner::Allocation) => {
                self.timetable.iter().any(|t| t.teacher_allocation_id == id)
            }
            ("fees", Owner::Department) => self.fees.iter().any(|f| f.department_id == id),
            ("fees", Owner::Batch) => self.fees.iter().any(|f| f.batch_id == id),
            ("fees", Owner::Semester) => self.fees.iter().any(|f| f.semester_id == id),
            ("users", Owner::Department) => self.users.iter().any(|u| u.department_id == Some(id)),
            ("users", Owner::Batch) => self.users.iter().any(|u| u.batch_id == Some(id)),
            _ => false,
        }
    }

    fn ensure_unreferenced<M: Model>(&self, owner: Owner, id: Uuid) -> StoreResult<()> {
        if let DeletionPolicy::Restrict(children) = M::DELETION {
            for child in children {
                if self.referenced(child, owner, id) {
                    return Err(StoreError::in_use(M::NAME, child));
                }
            }
        }
        Ok(())
    }

    fn with_batches(&self, department: &Department) -> Department {
        let mut linked: Vec<&Batch> = self.batches.iter().filter(|b| b.includes(department.id)).collect();
        linked.sort_by(|a, b| a.batch_name.cmp(&b.batch_name));

        let mut department = department.clone();
        department.batches = linked.into_iter().map(|b| b.id).collect();
        department
    }
}

fn conflict(message: &str) -> StoreError {
    StoreError::Conflict(message.to_string())
}

// Users

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(conflict(messages::EMAIL_TAKEN));
        }

        let now = Utc::now();
        let created = User {
            id: generate_id(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            department_id: user.department_id,
            batch_id: user.batch_id,
            section: user.section,
            enrollment_id: user.enrollment_id,
            employee_id: user.employee_id,
            can_register_students: user.can_register_students,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.users.push(created.clone());
        Ok(created)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn list_students(&self, filter: &StudentFilter) -> StoreResult<Vec<User>> {
        let state = self.state.lock().await;
        let mut students: Vec<User> = state.users.iter().filter(|u| filter.matches(u)).cloned().collect();
        students.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.email.cmp(&b.email)));
        Ok(students)
    }

    async fn list_teachers(&self, department_id: Option<Uuid>) -> StoreResult<Vec<User>> {
        let state = self.state.lock().await;
        let mut teachers: Vec<User> = state
            .users
            .iter()
            .filter(|u| u.is_teacher() && u.is_active)
            .filter(|u| department_id.map_or(true, |d| u.department_id == Some(d)))
            .cloned()
            .collect();
        teachers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.email.cmp(&b.email)));
        Ok(teachers)
    }
}

// Departments

#[async_trait]
impl DepartmentStore for MemoryStore {
    async fn create(&self, department: NewDepartment) -> StoreResult<Department> {
        let mut state = self.state.lock().await;
        if state
            .departments
            .iter()
            .any(|d| d.department_name.eq_ignore_ascii_case(&department.department_name))
        {
            return Err(conflict(messages::DEPARTMENT_NAME_TAKEN));
        }

        state.department_seq += 1;
        let now = Utc::now();
        let created = Department {
            id: generate_id(),
            department_code: format_department_code(state.department_seq),
            department_name: department.department_name,
            description: department.description,
            image_url: department.image_url,
            batches: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state.departments.push(created.clone());
        Ok(created)
    }

    async fn list(&self) -> StoreResult<Vec<Department>> {
        let state = self.state.lock().await;
        Ok(state.departments.iter().map(|d| state.with_batches(d)).collect())
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Department>> {
        let state = self.state.lock().await;
        Ok(state.departments.iter().find(|d| d.id == id).map(|d| state.with_batches(d)))
    }

    async fn update(&self, id: Uuid, department: NewDepartment) -> StoreResult<Department> {
        let mut state = self.state.lock().await;
        if state
            .departments
            .iter()
            .any(|d| d.id != id && d.department_name.eq_ignore_ascii_case(&department.department_name))
        {
            return Err(conflict(messages::DEPARTMENT_NAME_TAKEN));
        }

        let existing = state
            .departments
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::not_found(Department::NAME))?;
        existing.department_name = department.department_name;
        existing.description = department.description;
        existing.image_url = department.image_url;
        existing.updated_at = Utc::now();

        let updated = existing.clone();
        Ok(state.with_batches(&updated))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.departments.iter().any(|d| d.id == id) {
            return Err(StoreError::not_found(Department::NAME));
        }
        state.ensure_unreferenced::<Department>(Owner::Department, id)?;
        state.departments.retain(|d| d.id != id);
        Ok(())
    }
}

// Batches

#[async_trait]
impl BatchStore for MemoryStore {
    async fn create(&self, batch: NewBatch) -> StoreResult<Batch> {
        let mut state = self.state.lock().await;
        if state.batches.iter().any(|b| b.batch_name == batch.batch_name) {
            return Err(conflict(messages::BATCH_NAME_TAKEN));
        }

        let mut links: Vec<BatchDepartment> = Vec::with_capacity(batch.departments.len());
        for (department_id, number_of_sections) in &batch.departments {
            if links.iter().any(|l| l.department_id == *department_id) {
                return Err(conflict(messages::BATCH_DEPARTMENT_REPEATED));
            }
            let department = state
                .departments
                .iter()
                .find(|d| d.id == *department_id)
                .ok_or_else(|| StoreError::not_found(Department::NAME))?;
            links.push(BatchDepartment {
                department_id: department.id,
                department_name: department.department_name.clone(),
                number_of_sections: *number_of_sections,
            });
        }

        let now = Utc::now();
        let created = Batch {
            id: generate_id(),
            batch_name: batch.batch_name,
            start_date: batch.start_date,
            end_date: batch.end_date,
            departments: links,
            created_at: now,
            updated_at: now,
        };
        state.batches.push(created.clone());
        Ok(created)
    }

    async fn list(&self) -> StoreResult<Vec<Batch>> {
        let state = self.state.lock().await;
        let mut batches = state.batches.clone();
        batches.sort_by(|a, b| a.batch_name.cmp(&b.batch_name));
        Ok(batches)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Batch>> {
        let state = self.state.lock().await;
        Ok(state.batches.iter().find(|b| b.id == id).cloned())
    }

    async fn list_for_department(&self, department_id: Uuid) -> StoreResult<Vec<BatchOption>> {
        let state = self.state.lock().await;
        let mut options: Vec<BatchOption> = state
            .batches
            .iter()
            .filter_map(|b| {
                b.link(department_id).map(|link| BatchOption {
                    batch_id: b.id,
                    batch_name: b.batch_name.clone(),
                    number_of_sections: link.number_of_sections,
                })
            })
            .collect();
        options.sort_by(|a, b| a.batch_name.cmp(&b.batch_name));
        Ok(options)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.batches.iter().any(|b| b.id == id) {
            return Err(StoreError::not_found(Batch::NAME));
        }
        state.ensure_unreferenced::<Batch>(Owner::Batch, id)?;
        state.batches.retain(|b| b.id != id);
        Ok(())
    }
}

// Sections

#[async_trait]
impl SectionStore for MemoryStore {
    async fn create_all(&self, sections: Vec<NewSection>) -> StoreResult<Vec<Section>> {
        let mut state = self.state.lock().await;

        for (i, section) in sections.iter().enumerate() {
            let taken = state.sections.iter().any(|s| section.same_slot(s))
                || sections[..i].iter().any(|earlier| {
                    earlier.department_id == section.department_id
                        && earlier.batch_id == section.batch_id
                        && earlier.year == section.year
                        && earlier.academic_year == section.academic_year
                        && earlier.section_name == section.section_name
                });
            if taken {
                return Err(StoreError::Conflict(format!(
                    "Section {} already exists",
                    section.section_name
                )));
            }
        }

        let now = Utc::now();
        let created: Vec<Section> = sections
            .into_iter()
            .map(|s| Section {
                id: generate_id(),
                department_id: s.department_id,
                batch_id: s.batch_id,
                year: s.year,
                section_name: s.section_name,
                capacity: s.capacity,
                academic_year: s.academic_year,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .collect();
        state.sections.extend(created.iter().cloned());
        Ok(created)
    }

    async fn list(&self, filter: &SectionFilter) -> StoreResult<Vec<Section>> {
        let state = self.state.lock().await;
        let mut sections: Vec<Section> = state.sections.iter().filter(|s| filter.matches(s)).cloned().collect();
        sections.sort_by(|a, b| a.year.cmp(&b.year).then_with(|| a.section_name.cmp(&b.section_name)));
        Ok(sections)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Section>> {
        let state = self.state.lock().await;
        Ok(state.sections.iter().find(|s| s.id == id).cloned())
    }

    async fn update_capacity(&self, id: Uuid, capacity: i16) -> StoreResult<Section> {
        let mut state = self.state.lock().await;
        let section = state
            .sections
            .iter_mut()
            .find(|s| s.id == id && s.is_active)
            .ok_or_else(|| StoreError::not_found(Section::NAME))?;
        section.capacity = capacity;
        section.updated_at = Utc::now();
        Ok(section.clone())
    }

    async fn deactivate(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let section = state
            .sections
            .iter_mut()
            .find(|s| s.id == id && s.is_active)
            .ok_or_else(|| StoreError::not_found(Section::NAME))?;
        section.is_active = false;
        section.updated_at = Utc::now();
        Ok(())
    }
}

// Semesters

#[async_trait]
impl SemesterStore for MemoryStore {
    async fn create(&self, semester: NewSemester) -> StoreResult<Semester> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        if semester.is_current {
            for other in state
                .semesters
                .iter_mut()
                .filter(|s| s.department_id == semester.department_id && s.is_current)
            {
                other.is_current = false;
                other.updated_at = now;
            }
        }

        let created = Semester {
            id: generate_id(),
            year: year_of_semester(semester.semester_number),
            semester_name: semester.semester_name,
            semester_number: semester.semester_number,
            academic_year: semester.academic_year,
            department_id: semester.department_id,
            start_date: semester.start_date,
            end_date: semester.end_date,
            is_active: semester.is_active,
            is_current: semester.is_current,
            created_at: now,
            updated_at: now,
        };
        state.semesters.push(created.clone());
        Ok(created)
    }

    async fn list(&self, department_id: Option<Uuid>) -> StoreResult<Vec<Semester>> {
        let state = self.state.lock().await;
        let mut semesters: Vec<Semester> = state
            .semesters
            .iter()
            .filter(|s| department_id.map_or(true, |d| s.department_id == d))
            .cloned()
            .collect();
        semesters.sort_by(|a, b| {
            a.academic_year
                .cmp(&b.academic_year)
                .then_with(|| a.semester_number.cmp(&b.semester_number))
        });
        Ok(semesters)
    }

    async fn current(&self, department_id: Uuid) -> StoreResult<Option<Semester>> {
        let state = self.state.lock().await;
        Ok(state
            .semesters
            .iter()
            .find(|s| s.department_id == department_id && s.is_current)
            .cloned())
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Semester>> {
        let state = self.state.lock().await;
        Ok(state.semesters.iter().find(|s| s.id == id).cloned())
    }

    async fn set_current(&self, id: Uuid) -> StoreResult<Semester> {
        let mut state = self.state.lock().await;
        let department_id = state
            .semesters
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.department_id)
            .ok_or_else(|| StoreError::not_found(Semester::NAME))?;

        let now = Utc::now();
        let mut current = None;
        for semester in state.semesters.iter_mut().filter(|s| s.department_id == department_id) {
            let make_current = semester.id == id;
            if semester.is_current != make_current {
                semester.is_current = make_current;
                semester.updated_at = now;
            }
            if make_current {
                current = Some(semester.clone());
            }
        }
        current.ok_or_else(|| StoreError::not_found(Semester::NAME))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let semester = state
            .semesters
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::not_found(Semester::NAME))?;
        if semester.is_current {
            return Err(conflict(messages::CURRENT_SEMESTER_DELETE));
        }
        state.ensure_unreferenced::<Semester>(Owner::Semester, id)?;
        state.semesters.retain(|s| s.id != id);
        Ok(())
    }
}

// Subjects

#[async_trait]
impl SubjectStore for MemoryStore {
    async fn create(&self, subject: NewSubject) -> StoreResult<Subject> {
        let mut state = self.state.lock().await;
        if state
            .subjects
            .iter()
            .any(|s| s.department_id == subject.department_id && s.subject_code == subject.subject_code)
        {
            return Err(conflict(messages::SUBJECT_CODE_TAKEN));
        }

        let now = Utc::now();
        let created = Subject {
            id: generate_id(),
            subject_name: subject.subject_name,
            subject_code: subject.subject_code,
            department_id: subject.department_id,
            year: subject.year,
            semester: subject.semester,
            credits: subject.credits,
            subject_type: subject.subject_type,
            created_at: now,
            updated_at: now,
        };
        state.subjects.push(created.clone());
        Ok(created)
    }

    async fn list(&self, filter: &SubjectFilter) -> StoreResult<Vec<Subject>> {
        let state = self.state.lock().await;
        let mut subjects: Vec<Subject> = state.subjects.iter().filter(|s| filter.matches(s)).cloned().collect();
        subjects.sort_by(|a, b| {
            (a.year, a.semester, &a.subject_code).cmp(&(b.year, b.semester, &b.subject_code))
        });
        Ok(subjects)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Subject>> {
        let state = self.state.lock().await;
        Ok(state.subjects.iter().find(|s| s.id == id).cloned())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.subjects.iter().any(|s| s.id == id) {
            return Err(StoreError::not_found(Subject::NAME));
        }
        state.ensure_unreferenced::<Subject>(Owner::Subject, id)?;
        state.subjects.retain(|s| s.id != id);
        Ok(())
    }
}

// Teacher allocations

#[async_trait]
impl AllocationStore for MemoryStore {
    async fn create(&self, allocation: NewAllocation) -> StoreResult<TeacherAllocation> {
        let mut state = self.state.lock().await;
        if state.allocations.iter().any(|a| allocation.duplicates(a)) {
            return Err(conflict(messages::ALLOCATION_TAKEN));
        }

        let now = Utc::now();
        let created = TeacherAllocation {
            id: generate_id(),
            teacher_id: allocation.teacher_id,
            subject_id: allocation.subject_id,
            department_id: allocation.department_id,
            batch_id: allocation.batch_id,
            section: allocation.section,
            year: allocation.year,
            academic_year: allocation.academic_year,
            created_at: now,
            updated_at: now,
        };
        state.allocations.push(created.clone());
        Ok(created)
    }

    async fn list(&self, filter: &AllocationFilter) -> StoreResult<Vec<TeacherAllocation>> {
        let state = self.state.lock().await;
        let mut allocations: Vec<TeacherAllocation> =
            state.allocations.iter().filter(|a| filter.matches(a)).cloned().collect();
        allocations.sort_by(|a, b| {
            (&a.academic_year, a.year, &a.section, a.created_at)
                .cmp(&(&b.academic_year, b.year, &b.section, b.created_at))
        });
        Ok(allocations)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<TeacherAllocation>> {
        let state = self.state.lock().await;
        Ok(state.allocations.iter().find(|a| a.id == id).cloned())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.allocations.iter().any(|a| a.id == id) {
            return Err(StoreError::not_found(TeacherAllocation::NAME));
        }
        state.ensure_unreferenced::<TeacherAllocation>(Owner::Allocation, id)?;
        state.allocations.retain(|a| a.id != id);
        Ok(())
    }
}

// Timetable

#[async_trait]
impl TimetableStore for MemoryStore {
    async fn create(&self, entry: NewTimetableEntry) -> StoreResult<TimetableEntry> {
        let mut state = self.state.lock().await;
        if state.timetable.iter().any(|t| entry.collides_with(t)) {
            return Err(conflict(messages::SLOT_TAKEN));
        }
        if state.timetable.iter().any(|t| entry.double_books(t)) {
            return Err(conflict(messages::TEACHER_BUSY));
        }

        let now = Utc::now();
        let created = TimetableEntry {
            id: generate_id(),
            department_id: entry.department_id,
            batch_id: entry.batch_id,
            section: entry.section,
            year: entry.year,
            day_of_week: entry.day_of_week,
            period_number: entry.period_number,
            start_time: entry.start_time,
            end_time: entry.end_time,
            subject_id: entry.subject_id,
            teacher_id: entry.teacher_id,
            teacher_allocation_id: entry.teacher_allocation_id,
            room_number: entry.room_number,
            academic_year: entry.academic_year,
            created_at: now,
            updated_at: now,
        };
        state.timetable.push(created.clone());
        Ok(created)
    }

    async fn list_for_section(
        &self,
        batch_id: Uuid,
        section: &str,
        academic_year: Option<&str>,
    ) -> StoreResult<Vec<TimetableEntry>> {
        let state = self.state.lock().await;
        let mut entries: Vec<TimetableEntry> = state
            .timetable
            .iter()
            .filter(|t| t.batch_id == batch_id && t.section == section)
            .filter(|t| academic_year.map_or(true, |y| t.academic_year == y))
            .cloned()
            .collect();
        entries.sort_by_key(|t| (t.day_of_week, t.period_number));
        Ok(entries)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<TimetableEntry>> {
        let state = self.state.lock().await;
        Ok(state.timetable.iter().find(|t| t.id == id).cloned())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let before = state.timetable.len();
        state.timetable.retain(|t| t.id != id);
        if state.timetable.len() == before {
            return Err(StoreError::not_found(TimetableEntry::NAME));
        }
        Ok(())
    }
}

// Attendance

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn upsert(&self, attendance: NewAttendance) -> StoreResult<(Attendance, bool)> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        if let Some(existing) = state
            .attendance
            .iter_mut()
            .find(|a| a.timetable_id == attendance.timetable_id && a.date == attendance.date)
        {
            existing.subject_id = attendance.subject_id;
            existing.teacher_id = attendance.teacher_id;
            existing.department_id = attendance.department_id;
            existing.batch_id = attendance.batch_id;
            existing.section = attendance.section;
            existing.period_number = attendance.period_number;
            existing.academic_year = attendance.academic_year;
            existing.marked_by = attendance.marked_by;
            existing.attendance_records = attendance.records;
            existing.updated_at = now;
            return Ok((existing.clone(), true));
        }

        let created = Attendance {
            id: generate_id(),
            timetable_id: attendance.timetable_id,
            subject_id: attendance.subject_id,
            teacher_id: attendance.teacher_id,
            department_id: attendance.department_id,
            batch_id: attendance.batch_id,
            section: attendance.section,
            date: attendance.date,
            period_number: attendance.period_number,
            academic_year: attendance.academic_year,
            marked_by: attendance.marked_by,
            attendance_records: attendance.records,
            created_at: now,
            updated_at: now,
        };
        state.attendance.push(created.clone());
        Ok((created, false))
    }

    async fn find_by_slot(&self, timetable_id: Uuid, date: NaiveDate) -> StoreResult<Option<Attendance>> {
        let state = self.state.lock().await;
        Ok(state
            .attendance
            .iter()
            .find(|a| a.timetable_id == timetable_id && a.date == date)
            .cloned())
    }

    async fn list(&self, filter: &AttendanceFilter) -> StoreResult<Vec<Attendance>> {
        let state = self.state.lock().await;
        let mut sheets: Vec<Attendance> = state.attendance.iter().filter(|a| filter.matches(a)).cloned().collect();
        sheets.sort_by_key(|a| (a.date, a.period_number));
        Ok(sheets)
    }
}

// Fees

#[async_trait]
impl FeeStore for MemoryStore {
    async fn create(&self, fee: NewFee) -> StoreResult<Fee> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let created = Fee {
            id: generate_id(),
            department_id: fee.department_id,
            batch_id: fee.batch_id,
            semester_id: fee.semester_id,
            fee_name: fee.fee_name,
            total_amount: fee.total_amount,
            due_date: fee.due_date,
            assigned_to_students: fee
                .students
                .iter()
                .map(|s| FeeAssignment::unpaid(*s, fee.total_amount))
                .collect(),
            created_at: now,
            updated_at: now,
        };
        state.fees.push(created.clone());
        Ok(created)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Fee>> {
        let state = self.state.lock().await;
        Ok(state.fees.iter().find(|f| f.id == id).cloned())
    }

    async fn list(&self, filter: &FeeFilter) -> StoreResult<Vec<Fee>> {
        let state = self.state.lock().await;
        // newest first
        Ok(state.fees.iter().rev().filter(|f| filter.matches(f)).cloned().collect())
    }

    async fn apply_discount(&self, fee_id: Uuid, student_id: Uuid, discount: Decimal) -> StoreResult<Fee> {
        let mut state = self.state.lock().await;
        let fee = state
            .fees
            .iter_mut()
            .find(|f| f.id == fee_id)
            .ok_or_else(|| StoreError::not_found(Fee::NAME))?;
        let total = fee.total_amount;

        let assignment = fee
            .assigned_to_students
            .iter_mut()
            .find(|a| a.student_id == student_id)
            .ok_or_else(|| StoreError::NotFound(messages::ASSIGNMENT_NOT_FOUND.to_string()))?;
        if assignment.is_paid {
            return Err(conflict(messages::DISCOUNT_AFTER_PAYMENT));
        }
        assignment.discount = discount;
        assignment.amount_after_discount = total - discount;

        fee.updated_at = Utc::now();
        Ok(fee.clone())
    }

    async fn mark_paid(&self, fee_id: Uuid, student_id: Uuid, payment: Payment) -> StoreResult<Fee> {
        let mut state = self.state.lock().await;
        let fee = state
            .fees
            .iter_mut()
            .find(|f| f.id == fee_id)
            .ok_or_else(|| StoreError::not_found(Fee::NAME))?;

        let assignment = fee
            .assigned_to_students
            .iter_mut()
            .find(|a| a.student_id == student_id)
            .ok_or_else(|| StoreError::NotFound(messages::ASSIGNMENT_NOT_FOUND.to_string()))?;
        if assignment.is_paid {
            return Err(conflict(messages::ALREADY_PAID));
        }
        assignment.is_paid = true;
        assignment.payment_mode = Some(payment.payment_mode);
        assignment.payment_date = Some(payment.payment_date);
        assignment.transaction_id = payment.transaction_id;

        fee.updated_at = payment.payment_date;
        Ok(fee.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_models::fees::PaymentMode;
    use campus_models::timetable::DayOfWeek;
    use chrono::NaiveTime;

    fn department(name: &str) -> NewDepartment {
        NewDepartment {
            department_name: name.to_string(),
            description: None,
            image_url: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seeded() -> (MemoryStore, Department, Batch) {
        let store = MemoryStore::default();
        let dept = DepartmentStore::create(&store, department("Computer Science")).await.unwrap();
        let batch = BatchStore::create(
            &store,
            NewBatch {
                batch_name: "2024-2028".into(),
                start_date: date(2024, 6, 1),
                end_date: date(2028, 5, 31),
                departments: vec![(dept.id, 2)],
            },
        )
        .await
        .unwrap();
        (store, dept, batch)
    }

    fn slot(dept: &Department, batch: &Batch, teacher: Uuid, period: i16) -> NewTimetableEntry {
        NewTimetableEntry {
            department_id: dept.id,
            batch_id: batch.id,
            section: "A".into(),
            year: 1,
            day_of_week: DayOfWeek::Monday,
            period_number: period,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            subject_id: Uuid::new_v4(),
            teacher_id: teacher,
            teacher_allocation_id: Uuid::new_v4(),
            room_number: None,
            academic_year: "2024-2025".into(),
        }
    }

    #[tokio::test]
    async fn department_codes_follow_the_sequence() {
        let store = MemoryStore::default();
        let first = DepartmentStore::create(&store, department("Physics")).await.unwrap();
        let second = DepartmentStore::create(&store, department("Chemistry")).await.unwrap();
        assert_eq!(first.department_code, "DEP01");
        assert_eq!(second.department_code, "DEP02");

        let err = DepartmentStore::create(&store, department("physics")).await.unwrap_err();
        assert_eq!(err.to_string(), messages::DEPARTMENT_NAME_TAKEN);
    }

    #[tokio::test]
    async fn linked_department_cannot_be_deleted() {
        let (store, dept, batch) = seeded().await;

        let listed = DepartmentStore::find(&store, dept.id).await.unwrap().unwrap();
        assert_eq!(listed.batches, vec![batch.id]);

        let err = DepartmentStore::delete(&store, dept.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Department is still referenced by batches");

        BatchStore::delete(&store, batch.id).await.unwrap();
        DepartmentStore::delete(&store, dept.id).await.unwrap();
        assert!(DepartmentStore::find(&store, dept.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn batch_rejects_repeated_and_unknown_departments() {
        let (store, dept, _) = seeded().await;

        let repeated = BatchStore::create(
            &store,
            NewBatch {
                batch_name: "2025-2029".into(),
                start_date: date(2025, 6, 1),
                end_date: date(2029, 5, 31),
                departments: vec![(dept.id, 1), (dept.id, 2)],
            },
        )
        .await
        .unwrap_err();
        assert_eq!(repeated.to_string(), messages::BATCH_DEPARTMENT_REPEATED);

        let unknown = BatchStore::create(
            &store,
            NewBatch {
                batch_name: "2025-2029".into(),
                start_date: date(2025, 6, 1),
                end_date: date(2029, 5, 31),
                departments: vec![(Uuid::new_v4(), 1)],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(unknown, StoreError::NotFound(_)));

        let options = store.list_for_department(dept.id).await.unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].number_of_sections, 2);
    }

    #[tokio::test]
    async fn sections_are_created_all_or_nothing() {
        let (store, dept, batch) = seeded().await;
        let section = |name: &str| NewSection {
            department_id: dept.id,
            batch_id: batch.id,
            year: 1,
            section_name: name.to_string(),
            capacity: 60,
            academic_year: "2024-2025".into(),
        };

        store.create_all(vec![section("A")]).await.unwrap();
        let err = store.create_all(vec![section("B"), section("A")]).await.unwrap_err();
        assert_eq!(err.to_string(), "Section A already exists");

        let listed = SectionStore::list(&store, &SectionFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 1);

        store.deactivate(listed[0].id).await.unwrap();
        store.create_all(vec![section("A")]).await.unwrap();
    }

    #[tokio::test]
    async fn only_one_current_semester_per_department() {
        let (store, dept, _) = seeded().await;
        let semester = |number: i16, current: bool| NewSemester {
            semester_name: format!("Semester {}", number),
            semester_number: number,
            academic_year: "2024-2025".into(),
            department_id: dept.id,
            start_date: date(2024, 7, 1),
            end_date: date(2024, 11, 30),
            is_active: true,
            is_current: current,
        };

        let first = SemesterStore::create(&store, semester(1, true)).await.unwrap();
        let second = SemesterStore::create(&store, semester(2, true)).await.unwrap();
        assert_eq!(second.year, 1);

        let current = store.current(dept.id).await.unwrap().unwrap();
        assert_eq!(current.id, second.id);

        store.set_current(first.id).await.unwrap();
        let err = SemesterStore::delete(&store, first.id).await.unwrap_err();
        assert_eq!(err.to_string(), messages::CURRENT_SEMESTER_DELETE);
        SemesterStore::delete(&store, second.id).await.unwrap();
    }

    #[tokio::test]
    async fn timetable_checks_slot_before_teacher() {
        let (store, dept, batch) = seeded().await;
        let teacher = Uuid::new_v4();

        TimetableStore::create(&store, slot(&dept, &batch, teacher, 1)).await.unwrap();

        let err = TimetableStore::create(&store, slot(&dept, &batch, Uuid::new_v4(), 1))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), messages::SLOT_TAKEN);

        let mut elsewhere = slot(&dept, &batch, teacher, 1);
        elsewhere.section = "B".into();
        let err = TimetableStore::create(&store, elsewhere).await.unwrap_err();
        assert_eq!(err.to_string(), messages::TEACHER_BUSY);

        TimetableStore::create(&store, slot(&dept, &batch, teacher, 2)).await.unwrap();
        let week = store.list_for_section(batch.id, "A", None).await.unwrap();
        let periods: Vec<i16> = week.iter().map(|t| t.period_number).collect();
        assert_eq!(periods, vec![1, 2]);
    }

    #[tokio::test]
    async fn attendance_upsert_keeps_the_sheet_identity() {
        let (store, dept, batch) = seeded().await;
        let timetable_id = Uuid::new_v4();
        let student = Uuid::new_v4();
        let sheet = |status| NewAttendance {
            timetable_id,
            subject_id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            department_id: dept.id,
            batch_id: batch.id,
            section: "A".into(),
            date: date(2024, 7, 1),
            period_number: 1,
            academic_year: "2024-2025".into(),
            marked_by: Uuid::new_v4(),
            records: vec![crate::models::AttendanceEntry {
                student_id: student,
                status,
                remarks: None,
            }],
        };

        use campus_models::attendance::AttendanceStatus;
        let (first, replaced) = store.upsert(sheet(AttendanceStatus::Absent)).await.unwrap();
        assert!(!replaced);
        let (second, replaced) = store.upsert(sheet(AttendanceStatus::Present)).await.unwrap();
        assert!(replaced);
        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);

        let stored = store.find_by_slot(timetable_id, date(2024, 7, 1)).await.unwrap().unwrap();
        assert_eq!(stored.attendance_records[0].status, AttendanceStatus::Present);
    }

    #[tokio::test]
    async fn fee_ledger_discount_then_payment() {
        let (store, dept, batch) = seeded().await;
        let student = Uuid::new_v4();
        let fee = FeeStore::create(
            &store,
            NewFee {
                department_id: dept.id,
                batch_id: batch.id,
                semester_id: Uuid::new_v4(),
                fee_name: "Tuition".into(),
                total_amount: Decimal::new(50_000, 0),
                due_date: None,
                students: vec![student],
            },
        )
        .await
        .unwrap();
        assert_eq!(fee.assignment(student).unwrap().amount_after_discount, Decimal::new(50_000, 0));

        let fee = store.apply_discount(fee.id, student, Decimal::new(5_000, 0)).await.unwrap();
        assert_eq!(fee.assignment(student).unwrap().amount_after_discount, Decimal::new(45_000, 0));

        let err = store
            .apply_discount(fee.id, Uuid::new_v4(), Decimal::ONE)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), messages::ASSIGNMENT_NOT_FOUND);

        let payment = Payment {
            payment_mode: PaymentMode::Upi,
            transaction_id: Some("TXN-1".into()),
            payment_date: Utc::now(),
        };
        let fee = store.mark_paid(fee.id, student, payment.clone()).await.unwrap();
        assert!(fee.assignment(student).unwrap().is_paid);

        let err = store.mark_paid(fee.id, student, payment).await.unwrap_err();
        assert_eq!(err.to_string(), messages::ALREADY_PAID);
        let err = store.apply_discount(fee.id, student, Decimal::ONE).await.unwrap_err();
        assert_eq!(err.to_string(), messages::DISCOUNT_AFTER_PAYMENT);
    }
}
