//! Dashboard aggregates computed in memory from small result sets.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use db::{
    AnalyticsRepo,
    models::analytics::{RecordKind, RequestKind},
};
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

const RECENT_WINDOW_DAYS: i64 = 30;
const POPULAR_SERVICES_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_projects: i64,
    pub total_consultations: i64,
    pub total_appointments: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub by_stage: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    pub by_status: BTreeMap<String, i64>,
    pub last30_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
pub struct DashboardStats {
    pub overview: Overview,
    pub projects: ProjectStats,
    pub consultations: RequestStats,
    pub appointments: RequestStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
pub struct MonthlyActivity {
    pub consultations: i64,
    pub appointments: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
pub struct ServiceCount {
    pub service: String,
    pub count: i64,
}

pub struct AnalyticsService<'a, A: AnalyticsRepo + ?Sized> {
    repo: &'a A,
}

impl<'a, A: AnalyticsRepo + ?Sized> AnalyticsService<'a, A> {
    pub fn new(repo: &'a A) -> Self {
        Self { repo }
    }

    /// Eight independent reads, issued together.
    pub async fn stats(&self, now: DateTime<Utc>) -> Result<DashboardStats, AnalyticsError> {
        let since = now - Duration::days(RECENT_WINDOW_DAYS);
        let repo = self.repo;

        let (
            total_projects,
            stages,
            total_consultations,
            consultation_statuses,
            total_appointments,
            appointment_statuses,
            recent_consultations,
            recent_appointments,
        ) = tokio::try_join!(
            repo.count_records(RecordKind::Projects, None),
            repo.project_stages(),
            repo.count_records(RecordKind::Consultations, None),
            repo.consultation_statuses(),
            repo.count_records(RecordKind::Appointments, None),
            repo.appointment_statuses(),
            repo.count_records(RecordKind::Consultations, Some(since)),
            repo.count_records(RecordKind::Appointments, Some(since)),
        )?;

        Ok(DashboardStats {
            overview: Overview {
                total_projects,
                total_consultations,
                total_appointments,
            },
            projects: ProjectStats {
                by_stage: tally(stages),
            },
            consultations: RequestStats {
                by_status: tally(consultation_statuses.iter().map(|s| Some(s.to_string()))),
                last30_days: recent_consultations,
            },
            appointments: RequestStats {
                by_status: tally(appointment_statuses.iter().map(|s| Some(s.to_string()))),
                last30_days: recent_appointments,
            },
        })
    }

    pub async fn trends(&self) -> Result<BTreeMap<String, MonthlyActivity>, AnalyticsError> {
        let (consultations, appointments) = tokio::try_join!(
            self.repo.creation_times(RequestKind::Consultations),
            self.repo.creation_times(RequestKind::Appointments),
        )?;
        Ok(monthly_activity(&consultations, &appointments))
    }

    pub async fn popular_services(&self) -> Result<Vec<ServiceCount>, AnalyticsError> {
        let (consultations, appointments) = tokio::try_join!(
            self.repo.requested_services(RequestKind::Consultations),
            self.repo.requested_services(RequestKind::Appointments),
        )?;
        Ok(rank_services(
            consultations.into_iter().chain(appointments),
            POPULAR_SERVICES_LIMIT,
        ))
    }
}

/// Counts occurrences, skipping missing and empty labels.
pub fn tally<I>(labels: I) -> BTreeMap<String, i64>
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut counts = BTreeMap::new();
    for label in labels.into_iter().flatten().filter(|l| !l.is_empty()) {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Buckets creation times by UTC month (`YYYY-MM`).
pub fn monthly_activity(
    consultations: &[DateTime<Utc>],
    appointments: &[DateTime<Utc>],
) -> BTreeMap<String, MonthlyActivity> {
    let mut months: BTreeMap<String, MonthlyActivity> = BTreeMap::new();
    for at in consultations {
        months
            .entry(at.format("%Y-%m").to_string())
            .or_default()
            .consultations += 1;
    }
    for at in appointments {
        months
            .entry(at.format("%Y-%m").to_string())
            .or_default()
            .appointments += 1;
    }
    months
}

/// Most requested service names, highest count first. Ties keep first-seen order.
pub fn rank_services<I>(services: I, limit: usize) -> Vec<ServiceCount>
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, i64> = HashMap::new();
    for service in services.into_iter().flatten().filter(|s| !s.is_empty()) {
        let count = counts.entry(service.clone()).or_insert(0);
        if *count == 0 {
            order.push(service);
        }
        *count += 1;
    }

    let mut ranked: Vec<ServiceCount> = order
        .into_iter()
        .map(|service| {
            let count = counts.get(&service).copied().unwrap_or_default();
            ServiceCount { service, count }
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}
