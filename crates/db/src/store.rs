//! Data-access seams. [`DBService`](crate::DBService) implements them on
//! Postgres; route tests substitute in-memory implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    DBService,
    models::{
        analytics::{Analytics, RecordKind, RequestKind},
        appointment::{Appointment, AppointmentStatus, AppointmentWithProfile, CreateAppointment},
        consultation::{
            Consultation, ConsultationFilters, ConsultationStatus, CreateConsultation,
        },
        profile::{CreateProfile, Profile},
        project::{CreateProject, Project, ProjectFilters, ProjectWithService, UpdateProject},
        service::{CreateService, Service, ServiceFilters, UpdateService},
    },
};

#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, sqlx::Error>;
    async fn create_profile(&self, data: &CreateProfile) -> Result<Profile, sqlx::Error>;
}

#[async_trait]
pub trait ServiceRepo: Send + Sync {
    async fn list_services(&self, filters: &ServiceFilters) -> Result<Vec<Service>, sqlx::Error>;
    async fn find_service(&self, id: Uuid) -> Result<Option<Service>, sqlx::Error>;
    async fn create_service(&self, data: &CreateService) -> Result<Service, sqlx::Error>;
    async fn update_service(
        &self,
        id: Uuid,
        data: &UpdateService,
    ) -> Result<Option<Service>, sqlx::Error>;
    async fn deactivate_service(&self, id: Uuid) -> Result<Option<Service>, sqlx::Error>;
}

#[async_trait]
pub trait ProjectRepo: Send + Sync {
    async fn list_projects(
        &self,
        filters: &ProjectFilters,
    ) -> Result<Vec<ProjectWithService>, sqlx::Error>;
    async fn find_project(&self, id: Uuid) -> Result<Option<ProjectWithService>, sqlx::Error>;
    async fn create_project(&self, data: &CreateProject) -> Result<Project, sqlx::Error>;
    async fn update_project(
        &self,
        id: Uuid,
        data: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error>;
    async fn delete_project(&self, id: Uuid) -> Result<u64, sqlx::Error>;
}

#[async_trait]
pub trait ConsultationRepo: Send + Sync {
    async fn create_consultation(
        &self,
        data: &CreateConsultation,
        user_id: Option<Uuid>,
    ) -> Result<Consultation, sqlx::Error>;
    async fn list_consultations(
        &self,
        filters: &ConsultationFilters,
    ) -> Result<Vec<Consultation>, sqlx::Error>;
    async fn list_user_consultations(&self, user_id: Uuid)
    -> Result<Vec<Consultation>, sqlx::Error>;
    async fn update_consultation_status(
        &self,
        id: Uuid,
        status: ConsultationStatus,
    ) -> Result<Option<Consultation>, sqlx::Error>;
}

#[async_trait]
pub trait AppointmentRepo: Send + Sync {
    async fn create_appointment(
        &self,
        user_id: Uuid,
        data: &CreateAppointment,
    ) -> Result<Appointment, sqlx::Error>;
    async fn list_user_appointments(&self, user_id: Uuid)
    -> Result<Vec<Appointment>, sqlx::Error>;
    async fn list_appointments(
        &self,
        statuses: &[AppointmentStatus],
    ) -> Result<Vec<AppointmentWithProfile>, sqlx::Error>;
    async fn update_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>, sqlx::Error>;
}

#[async_trait]
pub trait AnalyticsRepo: Send + Sync {
    async fn count_records(
        &self,
        kind: RecordKind,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error>;
    async fn project_stages(&self) -> Result<Vec<Option<String>>, sqlx::Error>;
    async fn consultation_statuses(&self) -> Result<Vec<ConsultationStatus>, sqlx::Error>;
    async fn appointment_statuses(&self) -> Result<Vec<AppointmentStatus>, sqlx::Error>;
    async fn creation_times(&self, kind: RequestKind) -> Result<Vec<DateTime<Utc>>, sqlx::Error>;
    async fn requested_services(
        &self,
        kind: RequestKind,
    ) -> Result<Vec<Option<String>>, sqlx::Error>;
}

/// Everything the HTTP layer needs from the data layer.
pub trait Store:
    ProfileRepo + ServiceRepo + ProjectRepo + ConsultationRepo + AppointmentRepo + AnalyticsRepo
{
}

impl<T> Store for T where
    T: ProfileRepo + ServiceRepo + ProjectRepo + ConsultationRepo + AppointmentRepo + AnalyticsRepo
{
}

#[async_trait]
impl ProfileRepo for DBService {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
        Profile::find_by_id(&self.pool, id).await
    }

    async fn create_profile(&self, data: &CreateProfile) -> Result<Profile, sqlx::Error> {
        Profile::create(&self.pool, data).await
    }
}

#[async_trait]
impl ServiceRepo for DBService {
    async fn list_services(&self, filters: &ServiceFilters) -> Result<Vec<Service>, sqlx::Error> {
        Service::list(&self.pool, filters).await
    }

    async fn find_service(&self, id: Uuid) -> Result<Option<Service>, sqlx::Error> {
        Service::find_by_id(&self.pool, id).await
    }

    async fn create_service(&self, data: &CreateService) -> Result<Service, sqlx::Error> {
        Service::create(&self.pool, data).await
    }

    async fn update_service(
        &self,
        id: Uuid,
        data: &UpdateService,
    ) -> Result<Option<Service>, sqlx::Error> {
        Service::update(&self.pool, id, data).await
    }

    async fn deactivate_service(&self, id: Uuid) -> Result<Option<Service>, sqlx::Error> {
        Service::deactivate(&self.pool, id).await
    }
}

#[async_trait]
impl ProjectRepo for DBService {
    async fn list_projects(
        &self,
        filters: &ProjectFilters,
    ) -> Result<Vec<ProjectWithService>, sqlx::Error> {
        Project::list(&self.pool, filters).await
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<ProjectWithService>, sqlx::Error> {
        Project::find_by_id(&self.pool, id).await
    }

    async fn create_project(&self, data: &CreateProject) -> Result<Project, sqlx::Error> {
        Project::create(&self.pool, data).await
    }

    async fn update_project(
        &self,
        id: Uuid,
        data: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        Project::update(&self.pool, id, data).await
    }

    async fn delete_project(&self, id: Uuid) -> Result<u64, sqlx::Error> {
        Project::delete(&self.pool, id).await
    }
}

#[async_trait]
impl ConsultationRepo for DBService {
    async fn create_consultation(
        &self,
        data: &CreateConsultation,
        user_id: Option<Uuid>,
    ) -> Result<Consultation, sqlx::Error> {
        Consultation::create(&self.pool, data, user_id).await
    }

    async fn list_consultations(
        &self,
        filters: &ConsultationFilters,
    ) -> Result<Vec<Consultation>, sqlx::Error> {
        Consultation::list(&self.pool, filters).await
    }

    async fn list_user_consultations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Consultation>, sqlx::Error> {
        Consultation::find_by_user_id(&self.pool, user_id).await
    }

    async fn update_consultation_status(
        &self,
        id: Uuid,
        status: ConsultationStatus,
    ) -> Result<Option<Consultation>, sqlx::Error> {
        Consultation::update_status(&self.pool, id, status).await
    }
}

#[async_trait]
impl AppointmentRepo for DBService {
    async fn create_appointment(
        &self,
        user_id: Uuid,
        data: &CreateAppointment,
    ) -> Result<Appointment, sqlx::Error> {
        Appointment::create(&self.pool, user_id, data).await
    }

    async fn list_user_appointments(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Appointment>, sqlx::Error> {
        Appointment::find_by_user_id(&self.pool, user_id).await
    }

    async fn list_appointments(
        &self,
        statuses: &[AppointmentStatus],
    ) -> Result<Vec<AppointmentWithProfile>, sqlx::Error> {
        Appointment::list(&self.pool, statuses).await
    }

    async fn update_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        Appointment::update_status(&self.pool, id, status).await
    }
}

#[async_trait]
impl AnalyticsRepo for DBService {
    async fn count_records(
        &self,
        kind: RecordKind,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error> {
        Analytics::count(&self.pool, kind, since).await
    }

    async fn project_stages(&self) -> Result<Vec<Option<String>>, sqlx::Error> {
        Analytics::project_stages(&self.pool).await
    }

    async fn consultation_statuses(&self) -> Result<Vec<ConsultationStatus>, sqlx::Error> {
        Analytics::consultation_statuses(&self.pool).await
    }

    async fn appointment_statuses(&self) -> Result<Vec<AppointmentStatus>, sqlx::Error> {
        Analytics::appointment_statuses(&self.pool).await
    }

    async fn creation_times(&self, kind: RequestKind) -> Result<Vec<DateTime<Utc>>, sqlx::Error> {
        Analytics::creation_times(&self.pool, kind).await
    }

    async fn requested_services(
        &self,
        kind: RequestKind,
    ) -> Result<Vec<Option<String>>, sqlx::Error> {
        Analytics::requested_services(&self.pool, kind).await
    }
}
