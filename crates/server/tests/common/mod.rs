//! In-memory stand-ins for the database and the outbound services, wired into
//! a real [`Deployment`] so requests go through the full router.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use db::{
    AnalyticsRepo, AppointmentRepo, ConsultationRepo, ProfileRepo, ProjectRepo, ServiceRepo,
    models::{
        analytics::{RecordKind, RequestKind},
        appointment::{Appointment, AppointmentStatus, AppointmentWithProfile, CreateAppointment},
        consultation::{Consultation, ConsultationFilters, ConsultationStatus, CreateConsultation},
        profile::{CreateProfile, Profile, ProfileSummary, Role},
        project::{
            CreateProject, Project, ProjectFilters, ProjectWithService, ServiceSummary,
            UpdateProject,
        },
        service::{CreateService, Service, ServiceFilters, UpdateService},
    },
};
use deployment::{Deployment, config::Config};
use http_body_util::BodyExt;
use serde_json::Value;
use services::services::{
    assistant::Assistant,
    completion::{ChatMessage, CompletionBackend, CompletionError, SamplingParams},
    identity::{IdentityError, IdentityProvider, IdentityUser, Session, SignIn, SignUp},
    media::{ImageUpload, MediaError, MediaStore, UploadedImage},
};
use tower::ServiceExt;
use uuid::Uuid;

pub const GOOD_PASSWORD: &str = "correct-horse";

#[derive(Default)]
pub struct MemoryStore {
    pub profiles: Mutex<Vec<Profile>>,
    pub services: Mutex<Vec<Service>>,
    pub projects: Mutex<Vec<Project>>,
    pub consultations: Mutex<Vec<Consultation>>,
    pub appointments: Mutex<Vec<Appointment>>,
    pub last_service_filters: Mutex<Option<ServiceFilters>>,
    pub last_project_filters: Mutex<Option<ProjectFilters>>,
    pub last_consultation_filters: Mutex<Option<ConsultationFilters>>,
}

/// Reads a timestamp the way Postgres casts it; bare dates are midnight UTC.
fn timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|at| at.and_utc())
}

/// Case-insensitive substring match, as `ILIKE '%term%'` does.
fn contains(haystack: Option<&str>, term: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&term.to_lowercase()))
}

impl MemoryStore {
    pub fn add_profile(&self, id: Uuid, full_name: &str, role: Role) {
        self.profiles.lock().unwrap().push(Profile {
            id,
            full_name: full_name.to_string(),
            role,
            created_at: Utc::now(),
        });
    }

    pub fn add_consultation(&self, name: &str) -> Uuid {
        self.add_consultation_at(name, Utc::now())
    }

    pub fn add_consultation_at(&self, name: &str, created_at: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        self.consultations.lock().unwrap().push(Consultation {
            id,
            name: name.to_string(),
            email: "client@example.com".to_string(),
            phone: "0300 1234567".to_string(),
            service: Some("Renovation".to_string()),
            location: None,
            message: None,
            status: ConsultationStatus::New,
            user_id: None,
            created_at,
        });
        id
    }

    fn with_service(&self, project: Project) -> ProjectWithService {
        let services = project.service_id.and_then(|service_id| {
            self.services
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.id == service_id)
                .map(|s| ServiceSummary {
                    name: s.name.clone(),
                })
        });
        ProjectWithService { project, services }
    }
}

#[async_trait]
impl ProfileRepo for MemoryStore {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
        Ok(self.profiles.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn create_profile(&self, data: &CreateProfile) -> Result<Profile, sqlx::Error> {
        let profile = Profile {
            id: data.id,
            full_name: data.full_name.clone(),
            role: data.role,
            created_at: Utc::now(),
        };
        self.profiles.lock().unwrap().push(profile.clone());
        Ok(profile)
    }
}

#[async_trait]
impl ServiceRepo for MemoryStore {
    async fn list_services(&self, filters: &ServiceFilters) -> Result<Vec<Service>, sqlx::Error> {
        *self.last_service_filters.lock().unwrap() = Some(filters.clone());
        Ok(self
            .services
            .lock()
            .unwrap()
            .iter()
            .filter(|s| filters.active.is_none_or(|active| s.active == active))
            .filter(|s| {
                filters
                    .category
                    .as_deref()
                    .is_none_or(|c| s.category.as_deref() == Some(c))
            })
            .filter(|s| {
                filters.search.as_deref().is_none_or(|term| {
                    contains(Some(&s.name), term) || contains(s.description.as_deref(), term)
                })
            })
            .cloned()
            .collect())
    }

    async fn find_service(&self, id: Uuid) -> Result<Option<Service>, sqlx::Error> {
        Ok(self.services.lock().unwrap().iter().find(|s| s.id == id).cloned())
    }

    async fn create_service(&self, data: &CreateService) -> Result<Service, sqlx::Error> {
        let service = Service {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            category: data.category.clone(),
            description: data.description.clone(),
            active: true,
            created_at: Utc::now(),
        };
        self.services.lock().unwrap().push(service.clone());
        Ok(service)
    }

    async fn update_service(
        &self,
        id: Uuid,
        data: &UpdateService,
    ) -> Result<Option<Service>, sqlx::Error> {
        let mut services = self.services.lock().unwrap();
        let Some(service) = services.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &data.name {
            service.name = name.clone();
        }
        if data.category.is_some() {
            service.category = data.category.clone();
        }
        if data.description.is_some() {
            service.description = data.description.clone();
        }
        if let Some(active) = data.active {
            service.active = active;
        }
        Ok(Some(service.clone()))
    }

    async fn deactivate_service(&self, id: Uuid) -> Result<Option<Service>, sqlx::Error> {
        let mut services = self.services.lock().unwrap();
        Ok(services.iter_mut().find(|s| s.id == id).map(|s| {
            s.active = false;
            s.clone()
        }))
    }
}

#[async_trait]
impl ProjectRepo for MemoryStore {
    async fn list_projects(
        &self,
        filters: &ProjectFilters,
    ) -> Result<Vec<ProjectWithService>, sqlx::Error> {
        *self.last_project_filters.lock().unwrap() = Some(filters.clone());
        let projects: Vec<Project> = self
            .projects
            .lock()
            .unwrap()
            .iter()
            .filter(|p| filters.service_id.is_none_or(|id| p.service_id == Some(id)))
            .filter(|p| {
                filters
                    .location
                    .as_deref()
                    .is_none_or(|term| contains(p.location.as_deref(), term))
            })
            .filter(|p| {
                filters.search.as_deref().is_none_or(|term| {
                    contains(Some(&p.title), term) || contains(p.description.as_deref(), term)
                })
            })
            .cloned()
            .collect();
        Ok(projects.into_iter().map(|p| self.with_service(p)).collect())
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<ProjectWithService>, sqlx::Error> {
        let project = self.projects.lock().unwrap().iter().find(|p| p.id == id).cloned();
        Ok(project.map(|p| self.with_service(p)))
    }

    async fn create_project(&self, data: &CreateProject) -> Result<Project, sqlx::Error> {
        let project = Project {
            id: Uuid::new_v4(),
            title: data.title.clone(),
            service_id: data.service_id.as_deref().and_then(|id| id.parse().ok()),
            location: data.location.clone(),
            stage: data.stage.clone(),
            description: data.description.clone(),
            images: data.images.clone().unwrap_or_default(),
            created_at: Utc::now(),
        };
        self.projects.lock().unwrap().push(project.clone());
        Ok(project)
    }

    async fn update_project(
        &self,
        id: Uuid,
        data: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let mut projects = self.projects.lock().unwrap();
        let Some(project) = projects.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(title) = &data.title {
            project.title = title.clone();
        }
        if data.stage.is_some() {
            project.stage = data.stage.clone();
        }
        if let Some(images) = &data.images {
            project.images = images.clone();
        }
        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, id: Uuid) -> Result<u64, sqlx::Error> {
        let mut projects = self.projects.lock().unwrap();
        let before = projects.len();
        projects.retain(|p| p.id != id);
        Ok((before - projects.len()) as u64)
    }
}

#[async_trait]
impl ConsultationRepo for MemoryStore {
    async fn create_consultation(
        &self,
        data: &CreateConsultation,
        user_id: Option<Uuid>,
    ) -> Result<Consultation, sqlx::Error> {
        let consultation = Consultation {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            email: data.email.clone(),
            phone: data.phone.clone(),
            service: data.service.clone(),
            location: data.location.clone(),
            message: data.message.clone(),
            status: ConsultationStatus::New,
            user_id,
            created_at: Utc::now(),
        };
        self.consultations.lock().unwrap().push(consultation.clone());
        Ok(consultation)
    }

    async fn list_consultations(
        &self,
        filters: &ConsultationFilters,
    ) -> Result<Vec<Consultation>, sqlx::Error> {
        *self.last_consultation_filters.lock().unwrap() = Some(filters.clone());
        let from = filters.from_date.as_deref().and_then(timestamp);
        let to = filters.to_date.as_deref().and_then(timestamp);
        Ok(self
            .consultations
            .lock()
            .unwrap()
            .iter()
            .filter(|c| filters.statuses.is_empty() || filters.statuses.contains(&c.status))
            .filter(|c| {
                filters.search.as_deref().is_none_or(|term| {
                    contains(Some(&c.name), term)
                        || contains(Some(&c.email), term)
                        || contains(Some(&c.phone), term)
                })
            })
            .filter(|c| from.is_none_or(|from| c.created_at >= from))
            .filter(|c| to.is_none_or(|to| c.created_at <= to))
            .cloned()
            .collect())
    }

    async fn list_user_consultations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Consultation>, sqlx::Error> {
        Ok(self
            .consultations
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn update_consultation_status(
        &self,
        id: Uuid,
        status: ConsultationStatus,
    ) -> Result<Option<Consultation>, sqlx::Error> {
        let mut consultations = self.consultations.lock().unwrap();
        Ok(consultations.iter_mut().find(|c| c.id == id).map(|c| {
            c.status = status;
            c.clone()
        }))
    }
}

#[async_trait]
impl AppointmentRepo for MemoryStore {
    async fn create_appointment(
        &self,
        user_id: Uuid,
        data: &CreateAppointment,
    ) -> Result<Appointment, sqlx::Error> {
        let preferred_date = timestamp(&data.preferred_date)
            .ok_or_else(|| sqlx::Error::Decode("invalid input syntax for type timestamp".into()))?;
        let appointment = Appointment {
            id: Uuid::new_v4(),
            user_id,
            service: data.service.clone(),
            preferred_date,
            location: data.location.clone(),
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
        };
        self.appointments.lock().unwrap().push(appointment.clone());
        Ok(appointment)
    }

    async fn list_user_appointments(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Appointment>, sqlx::Error> {
        Ok(self
            .appointments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_appointments(
        &self,
        statuses: &[AppointmentStatus],
    ) -> Result<Vec<AppointmentWithProfile>, sqlx::Error> {
        let appointments: Vec<Appointment> = self
            .appointments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| statuses.is_empty() || statuses.contains(&a.status))
            .cloned()
            .collect();
        let profiles = self.profiles.lock().unwrap();
        Ok(appointments
            .into_iter()
            .map(|appointment| {
                let profiles = profiles
                    .iter()
                    .find(|p| p.id == appointment.user_id)
                    .map(|p| ProfileSummary {
                        full_name: p.full_name.clone(),
                    });
                AppointmentWithProfile {
                    appointment,
                    profiles,
                }
            })
            .collect())
    }

    async fn update_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let mut appointments = self.appointments.lock().unwrap();
        Ok(appointments.iter_mut().find(|a| a.id == id).map(|a| {
            a.status = status;
            a.clone()
        }))
    }
}

#[async_trait]
impl AnalyticsRepo for MemoryStore {
    async fn count_records(
        &self,
        kind: RecordKind,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error> {
        let created: Vec<DateTime<Utc>> = match kind {
            RecordKind::Projects => self.projects.lock().unwrap().iter().map(|p| p.created_at).collect(),
            RecordKind::Consultations => self
                .consultations
                .lock()
                .unwrap()
                .iter()
                .map(|c| c.created_at)
                .collect(),
            RecordKind::Appointments => self
                .appointments
                .lock()
                .unwrap()
                .iter()
                .map(|a| a.created_at)
                .collect(),
        };
        Ok(created
            .iter()
            .filter(|at| since.is_none_or(|since| **at >= since))
            .count() as i64)
    }

    async fn project_stages(&self) -> Result<Vec<Option<String>>, sqlx::Error> {
        Ok(self.projects.lock().unwrap().iter().map(|p| p.stage.clone()).collect())
    }

    async fn consultation_statuses(&self) -> Result<Vec<ConsultationStatus>, sqlx::Error> {
        Ok(self.consultations.lock().unwrap().iter().map(|c| c.status).collect())
    }

    async fn appointment_statuses(&self) -> Result<Vec<AppointmentStatus>, sqlx::Error> {
        Ok(self.appointments.lock().unwrap().iter().map(|a| a.status).collect())
    }

    async fn creation_times(&self, kind: RequestKind) -> Result<Vec<DateTime<Utc>>, sqlx::Error> {
        Ok(match kind {
            RequestKind::Consultations => self
                .consultations
                .lock()
                .unwrap()
                .iter()
                .map(|c| c.created_at)
                .collect(),
            RequestKind::Appointments => self
                .appointments
                .lock()
                .unwrap()
                .iter()
                .map(|a| a.created_at)
                .collect(),
        })
    }

    async fn requested_services(
        &self,
        kind: RequestKind,
    ) -> Result<Vec<Option<String>>, sqlx::Error> {
        Ok(match kind {
            RequestKind::Consultations => self
                .consultations
                .lock()
                .unwrap()
                .iter()
                .map(|c| c.service.clone())
                .collect(),
            RequestKind::Appointments => self
                .appointments
                .lock()
                .unwrap()
                .iter()
                .map(|a| Some(a.service.clone()))
                .collect(),
        })
    }
}

/// Tokens map straight to users; sign-in accepts [`GOOD_PASSWORD`] only.
#[derive(Default)]
pub struct FakeIdentity {
    pub tokens: Mutex<HashMap<String, IdentityUser>>,
}

impl FakeIdentity {
    pub fn issue(&self, token: &str, id: Uuid) {
        self.tokens.lock().unwrap().insert(
            token.to_string(),
            IdentityUser {
                id,
                email: Some(format!("{token}@example.com")),
                created_at: None,
            },
        );
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_up(&self, email: &str, _password: &str) -> Result<SignUp, IdentityError> {
        if email == "taken@example.com" {
            return Err(IdentityError::Rejected {
                status: 422,
                message: "User already registered".to_string(),
            });
        }
        Ok(SignUp {
            user: Some(IdentityUser {
                id: Uuid::new_v4(),
                email: Some(email.to_string()),
                created_at: None,
            }),
            session: None,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, IdentityError> {
        if password != GOOD_PASSWORD {
            return Err(IdentityError::Rejected {
                status: 400,
                message: "Invalid login credentials".to_string(),
            });
        }
        Ok(SignIn {
            user: IdentityUser {
                id: Uuid::new_v4(),
                email: Some(email.to_string()),
                created_at: None,
            },
            session: Session {
                access_token: "access".to_string(),
                token_type: "bearer".to_string(),
                expires_in: 3600,
                expires_at: None,
                refresh_token: "refresh".to_string(),
            },
        })
    }

    async fn get_user(&self, access_token: &str) -> Result<IdentityUser, IdentityError> {
        self.tokens
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or(IdentityError::Rejected {
                status: 401,
                message: "invalid JWT".to_string(),
            })
    }

    async fn delete_user(&self, _id: Uuid) -> Result<(), IdentityError> {
        Ok(())
    }
}

/// Answers every prompt with a fixed reply, or fails when `reply` is an error.
pub struct CannedCompletion {
    pub reply: Result<Option<String>, CompletionError>,
}

#[async_trait]
impl CompletionBackend for CannedCompletion {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _params: &SamplingParams,
    ) -> Result<Option<String>, CompletionError> {
        self.reply.clone()
    }
}

#[derive(Default)]
pub struct MemoryMedia {
    pub deleted: Mutex<Vec<String>>,
}

#[async_trait]
impl MediaStore for MemoryMedia {
    async fn upload_image(&self, image: ImageUpload) -> Result<UploadedImage, MediaError> {
        let name = image.file_name.unwrap_or_else(|| "image".to_string());
        Ok(UploadedImage {
            url: format!("https://res.cloudinary.com/demo/image/upload/recon/{name}"),
            public_id: format!("recon/{name}"),
        })
    }

    async fn delete_image(&self, public_id: &str) -> Result<(), MediaError> {
        self.deleted.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}

pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    let mut env: HashMap<String, String> = [
        ("DATABASE_URL", "postgres://localhost/recon_test"),
        ("SUPABASE_URL", "https://test.supabase.co"),
        ("SUPABASE_SERVICE_ROLE_KEY", "service-role"),
        ("CLOUDINARY_CLOUD_NAME", "demo"),
        ("CLOUDINARY_API_KEY", "123"),
        ("CLOUDINARY_API_SECRET", "secret"),
        ("GROQ_API_KEY", "gsk_test"),
        ("FRONTEND_URL", "http://localhost:5173"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (key, value) in overrides {
        env.insert(key.to_string(), value.to_string());
    }
    Config::from_lookup(|key| env.get(key).cloned()).expect("test config is complete")
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub identity: Arc<FakeIdentity>,
    pub media: Arc<MemoryMedia>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(
            Ok(Some("We build homes.".to_string())),
            &[],
        )
    }

    pub fn with(reply: Result<Option<String>, CompletionError>, env: &[(&str, &str)]) -> Self {
        let store = Arc::new(MemoryStore::default());
        let identity = Arc::new(FakeIdentity::default());
        let media = Arc::new(MemoryMedia::default());
        let config = test_config(env);
        let assistant = Assistant::new(
            Arc::new(CannedCompletion { reply }),
            config.business_card.clone(),
        );
        let deployment = Deployment::from_parts(
            store.clone(),
            identity.clone(),
            assistant,
            media.clone(),
            config,
        );
        Self {
            router: server::app(deployment),
            store,
            identity,
            media,
        }
    }

    /// Registers a signed-in user with the given role and returns their token.
    pub fn user(&self, token: &str, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        self.identity.issue(token, id);
        self.store.add_profile(id, token, role);
        id
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}
