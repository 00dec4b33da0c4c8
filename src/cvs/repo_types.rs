use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::update::Field;
use crate::users::repo_types::Link;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    pub position: String,
    pub company: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub degree: String,
    pub school: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
}

/// Database model for CVs. Nested lists live in JSONB columns.
#[derive(Debug, Clone, FromRow)]
pub struct Cv {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub city: String,
    pub country: String,
    pub postcode: String,
    pub phone: String,
    pub email: String,
    pub photo: Option<String>,
    pub job_title: String,
    pub summary: String,
    pub skills: Vec<String>,
    pub work_experiences: Json<Vec<WorkExperience>>,
    pub educations: Json<Vec<Education>>,
    pub links: Json<Vec<Link>>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewCv {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub city: String,
    pub country: String,
    pub postcode: String,
    pub phone: String,
    pub email: String,
    pub photo: Option<String>,
    pub job_title: String,
    pub summary: String,
    pub skills: Vec<String>,
    pub work_experiences: Vec<WorkExperience>,
    pub educations: Vec<Education>,
    pub links: Vec<Link>,
}

/// Updatable CV fields. The owner is never reassigned, so it has no variant.
#[derive(Debug, Clone, PartialEq)]
pub enum CvField {
    FirstName(String),
    LastName(String),
    City(String),
    Country(String),
    Postcode(String),
    Phone(String),
    Email(String),
    Photo(String),
    JobTitle(String),
    Summary(String),
    Skills(Vec<String>),
    WorkExperiences(Vec<WorkExperience>),
    Educations(Vec<Education>),
    Links(Vec<Link>),
}

impl Field for CvField {
    type Entity = Cv;

    fn column(&self) -> &'static str {
        match self {
            CvField::FirstName(_) => "first_name",
            CvField::LastName(_) => "last_name",
            CvField::City(_) => "city",
            CvField::Country(_) => "country",
            CvField::Postcode(_) => "postcode",
            CvField::Phone(_) => "phone",
            CvField::Email(_) => "email",
            CvField::Photo(_) => "photo",
            CvField::JobTitle(_) => "job_title",
            CvField::Summary(_) => "summary",
            CvField::Skills(_) => "skills",
            CvField::WorkExperiences(_) => "work_experiences",
            CvField::Educations(_) => "educations",
            CvField::Links(_) => "links",
        }
    }

    fn apply(self, cv: &mut Cv) {
        match self {
            CvField::FirstName(v) => cv.first_name = v,
            CvField::LastName(v) => cv.last_name = v,
            CvField::City(v) => cv.city = v,
            CvField::Country(v) => cv.country = v,
            CvField::Postcode(v) => cv.postcode = v,
            CvField::Phone(v) => cv.phone = v,
            CvField::Email(v) => cv.email = v,
            CvField::Photo(v) => cv.photo = Some(v),
            CvField::JobTitle(v) => cv.job_title = v,
            CvField::Summary(v) => cv.summary = v,
            CvField::Skills(v) => cv.skills = v,
            CvField::WorkExperiences(v) => cv.work_experiences = Json(v),
            CvField::Educations(v) => cv.educations = Json(v),
            CvField::Links(v) => cv.links = Json(v),
        }
    }

    fn push_value<'args>(self, qb: &mut QueryBuilder<'args, Postgres>) {
        match self {
            CvField::FirstName(v)
            | CvField::LastName(v)
            | CvField::City(v)
            | CvField::Country(v)
            | CvField::Postcode(v)
            | CvField::Phone(v)
            | CvField::Email(v)
            | CvField::Photo(v)
            | CvField::JobTitle(v)
            | CvField::Summary(v) => qb.push_bind(v),
            CvField::Skills(v) => qb.push_bind(v),
            CvField::WorkExperiences(v) => qb.push_bind(Json(v)),
            CvField::Educations(v) => qb.push_bind(Json(v)),
            CvField::Links(v) => qb.push_bind(Json(v)),
        };
    }

    fn touch(cv: &mut Cv, at: OffsetDateTime) {
        cv.updated_at = at;
    }
}
