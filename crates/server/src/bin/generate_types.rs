use std::{env, fs, path::PathBuf};

use ts_rs::TS;

fn generate_types_content() -> String {
    // 1. Collect every exported declaration.
    let decls: Vec<String> = vec![
        utils::response::ApiResponse::<()>::decl(),
        utils::response::ErrorBody::decl(),
        utils::response::ErrorResponse::decl(),
        utils::response::Notice::<()>::decl(),
        db::models::profile::Role::decl(),
        db::models::profile::Profile::decl(),
        db::models::profile::ProfileSummary::decl(),
        db::models::service::Service::decl(),
        db::models::service::CreateService::decl(),
        db::models::service::UpdateService::decl(),
        db::models::project::Project::decl(),
        db::models::project::ServiceSummary::decl(),
        db::models::project::ProjectWithService::decl(),
        db::models::project::CreateProject::decl(),
        db::models::project::UpdateProject::decl(),
        db::models::consultation::ConsultationStatus::decl(),
        db::models::consultation::Consultation::decl(),
        db::models::consultation::CreateConsultation::decl(),
        db::models::consultation::UpdateConsultationStatus::decl(),
        db::models::appointment::AppointmentStatus::decl(),
        db::models::appointment::Appointment::decl(),
        db::models::appointment::AppointmentWithProfile::decl(),
        db::models::appointment::CreateAppointment::decl(),
        db::models::appointment::UpdateAppointmentStatus::decl(),
        services::services::auth::RegisterBody::decl(),
        services::services::auth::LoginBody::decl(),
        services::services::auth::MeUser::decl(),
        services::services::auth::MeProfile::decl(),
        services::services::auth::MeResponse::decl(),
        services::services::identity::IdentityUser::decl(),
        services::services::identity::Session::decl(),
        services::services::identity::SignIn::decl(),
        services::services::assistant::AskBody::decl(),
        services::services::assistant::ChatTurn::decl(),
        services::services::assistant::ChatBody::decl(),
        services::services::assistant::AskResponse::decl(),
        services::services::assistant::ChatResponse::decl(),
        services::services::media::UploadedImage::decl(),
        services::services::analytics::Overview::decl(),
        services::services::analytics::ProjectStats::decl(),
        services::services::analytics::RequestStats::decl(),
        services::services::analytics::DashboardStats::decl(),
        services::services::analytics::MonthlyActivity::decl(),
        services::services::analytics::ServiceCount::decl(),
        server::routes::health::HealthStatus::decl(),
        server::routes::upload::SingleUpload::decl(),
        server::routes::upload::BatchUpload::decl(),
    ];

    // 2. Export each one.
    let body = decls
        .into_iter()
        .map(|d| {
            let trimmed = d.trim_start();
            if trimmed.starts_with("export") {
                d
            } else {
                format!("export {trimmed}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "// This file was generated by `cargo run --bin generate_types`.\n// Do not edit it by hand.\n\n{body}\n"
    )
}

fn main() {
    let check_mode = env::args().any(|arg| arg == "--check");
    let shared_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../shared");
    let types_path = shared_path.join("types.ts");
    let generated = generate_types_content();

    if check_mode {
        match fs::read_to_string(&types_path) {
            Ok(current) if current == generated => {
                println!("✅ shared/types.ts is up to date.");
                std::process::exit(0);
            }
            _ => {
                eprintln!("❌ shared/types.ts is out of date. Run `cargo run --bin generate_types`.");
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = fs::create_dir_all(&shared_path) {
        eprintln!("Failed to create {}: {e}", shared_path.display());
        std::process::exit(1);
    }
    if let Err(e) = fs::write(&types_path, generated) {
        eprintln!("Failed to write {}: {e}", types_path.display());
        std::process::exit(1);
    }
    println!("✅ TypeScript types generated in {}", types_path.display());
}
