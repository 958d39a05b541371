// Store traits per aggregate and their Postgres repositories

pub mod academics;
pub mod attendance;
pub mod department;
pub mod fee;
pub mod timetable;
pub mod user;

pub use academics::{
    AllocationRepository, AllocationStore, SectionRepository, SectionStore, SemesterRepository,
    SemesterStore, SubjectRepository, SubjectStore,
};
pub use attendance::{AttendanceRepository, AttendanceStore};
pub use department::{BatchRepository, BatchStore, DepartmentRepository, DepartmentStore};
pub use fee::{FeeRepository, FeeStore};
pub use timetable::{TimetableRepository, TimetableStore};
pub use user::{UserRepository, UserStore};

use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::memory::MemoryStore;
use crate::models::{DeletionPolicy, Model};

/// Every store the services need, behind trait objects so the same
/// services run against Postgres or the in-memory store.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub departments: Arc<dyn DepartmentStore>,
    pub batches: Arc<dyn BatchStore>,
    pub sections: Arc<dyn SectionStore>,
    pub semesters: Arc<dyn SemesterStore>,
    pub subjects: Arc<dyn SubjectStore>,
    pub allocations: Arc<dyn AllocationStore>,
    pub timetable: Arc<dyn TimetableStore>,
    pub attendance: Arc<dyn AttendanceStore>,
    pub fees: Arc<dyn FeeStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            departments: Arc::new(DepartmentRepository::new(pool.clone())),
            batches: Arc::new(BatchRepository::new(pool.clone())),
            sections: Arc::new(SectionRepository::new(pool.clone())),
            semesters: Arc::new(SemesterRepository::new(pool.clone())),
            subjects: Arc::new(SubjectRepository::new(pool.clone())),
            allocations: Arc::new(AllocationRepository::new(pool.clone())),
            timetable: Arc::new(TimetableRepository::new(pool.clone())),
            attendance: Arc::new(AttendanceRepository::new(pool.clone())),
            fees: Arc::new(FeeRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(MemoryStore::default()))
    }

    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            departments: store.clone(),
            batches: store.clone(),
            sections: store.clone(),
            semesters: store.clone(),
            subjects: store.clone(),
            allocations: store.clone(),
            timetable: store.clone(),
            attendance: store.clone(),
            fees: store,
        }
    }
}

/// Table holding the children named in a `DeletionPolicy::Restrict` list.
fn child_table(child: &str) -> Option<&'static str> {
    Some(match child {
        "batches" => "batch_departments",
        "sections" => "sections",
        "semesters" => "semesters",
        "subjects" => "subjects",
        "teacher allocations" => "teacher_allocations",
        "timetable entries" => "timetable_entries",
        "fees" => "fees",
        "users" => "users",
        _ => return None,
    })
}

/// Refuses the delete of `M` while any restricted child still has
/// `column = id`. Runs inside the deleting transaction; the foreign keys
/// back it up.
pub(crate) async fn ensure_unreferenced<M: Model>(
    conn: &mut PgConnection,
    id: Uuid,
    column: &str,
) -> StoreResult<()> {
    let DeletionPolicy::Restrict(children) = M::DELETION else {
        return Ok(());
    };

    for child in children {
        let Some(table) = child_table(child) else {
            tracing::warn!(child = %child, "No table registered for restricted child");
            continue;
        };
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {} WHERE {} = $1)", table, column);
        let used: bool = sqlx::query_scalar(&sql).bind(id).fetch_one(&mut *conn).await?;
        if used {
            return Err(StoreError::in_use(M::NAME, child));
        }
    }
    Ok(())
}
