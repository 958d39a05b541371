use actix_web::web;

use crate::errors::{json_config, path_config, query_config};
use crate::handlers::{
    allocations, attendance, auth, batches, departments, fees, health, sections, semesters, subjects, timetable,
    users,
};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .app_data(query_config())
        .configure(health::configure)
        .service(
            web::scope("/api")
                .configure(auth::configure)
                .configure(users::configure)
                .configure(departments::configure)
                .configure(batches::configure)
                .configure(sections::configure)
                .configure(semesters::configure)
                .configure(subjects::configure)
                .configure(allocations::configure)
                .configure(timetable::configure)
                .configure(attendance::configure)
                .configure(fees::configure),
        );
}
