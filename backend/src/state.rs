use crate::config::AppConfig;
use crate::services::{
    allocations::AllocationService, attendance::AttendanceService, auth::AuthService,
    fees::FeeService, registry::RegistryService, sections::SectionService,
    semesters::SemesterService, subjects::SubjectService, timetable::TimetableService,
    users::UserService,
};
use campus_database::Stores;
use campus_middleware::JwtKeys;
use std::sync::Arc;

pub struct AppState {
    pub config: AppConfig,
    pub jwt: Arc<JwtKeys>,
    /// `postgres` or `memory`, reported by the health check.
    pub storage: &'static str,

    // Service instances
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub registry_service: Arc<RegistryService>,
    pub section_service: Arc<SectionService>,
    pub semester_service: Arc<SemesterService>,
    pub subject_service: Arc<SubjectService>,
    pub allocation_service: Arc<AllocationService>,
    pub timetable_service: Arc<TimetableService>,
    pub attendance_service: Arc<AttendanceService>,
    pub fee_service: Arc<FeeService>,
}

impl AppState {
    pub fn new(stores: Stores, storage: &'static str, config: AppConfig) -> Self {
        let jwt = Arc::new(JwtKeys::new(&config.jwt_secret, config.jwt_expiry_hours));

        let auth_service = Arc::new(AuthService::new(
            stores.clone(),
            Arc::clone(&jwt),
            config.bcrypt_cost,
        ));
        let user_service = Arc::new(UserService::new(stores.clone(), config.bcrypt_cost));

        Self {
            jwt,
            storage,
            auth_service,
            user_service,
            registry_service: Arc::new(RegistryService::new(stores.clone())),
            section_service: Arc::new(SectionService::new(stores.clone())),
            semester_service: Arc::new(SemesterService::new(stores.clone())),
            subject_service: Arc::new(SubjectService::new(stores.clone())),
            allocation_service: Arc::new(AllocationService::new(stores.clone())),
            timetable_service: Arc::new(TimetableService::new(stores.clone())),
            attendance_service: Arc::new(AttendanceService::new(stores.clone())),
            fee_service: Arc::new(FeeService::new(stores)),
            config,
        }
    }

    /// State backed by a fresh in-memory store.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(Stores::in_memory(), "memory", config)
    }
}
