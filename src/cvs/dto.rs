use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Cv, Education, NewCv, WorkExperience};
use crate::normalize::{normalize_optional, normalize_skills, normalize_text};
use crate::users::dto::normalize_links;
use crate::users::repo_types::Link;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCvRequest {
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
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub work_experiences: Vec<WorkExperience>,
    #[serde(default)]
    pub educations: Vec<Education>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl CreateCvRequest {
    pub fn into_new_cv(self, owner: Uuid) -> NewCv {
        NewCv {
            user_id: owner,
            first_name: normalize_text(&self.first_name),
            last_name: normalize_text(&self.last_name),
            city: normalize_text(&self.city),
            country: normalize_text(&self.country),
            postcode: normalize_text(&self.postcode),
            phone: normalize_text(&self.phone),
            email: self.email.trim().to_string(),
            photo: normalize_optional(self.photo),
            job_title: normalize_text(&self.job_title),
            summary: normalize_text(&self.summary),
            skills: normalize_skills(self.skills),
            work_experiences: self
                .work_experiences
                .into_iter()
                .map(normalize_experience)
                .collect(),
            educations: self.educations.into_iter().map(normalize_education).collect(),
            links: normalize_links(self.links),
        }
    }
}

/// Partial CV update. Omitted fields stay as stored; a present list,
/// even an empty one, replaces the stored list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCvRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub postcode: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub job_title: Option<String>,
    pub summary: Option<String>,
    pub skills: Option<Vec<String>>,
    pub work_experiences: Option<Vec<WorkExperience>>,
    pub educations: Option<Vec<Education>>,
    pub links: Option<Vec<Link>>,
}

impl UpdateCvRequest {
    /// Normalizes only the fields that are present. Text that normalizes to
    /// empty is treated as omitted.
    pub fn normalized(self) -> Self {
        Self {
            first_name: normalize_optional(self.first_name),
            last_name: normalize_optional(self.last_name),
            city: normalize_optional(self.city),
            country: normalize_optional(self.country),
            postcode: normalize_optional(self.postcode),
            phone: normalize_optional(self.phone),
            email: self
                .email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            photo: normalize_optional(self.photo),
            job_title: normalize_optional(self.job_title),
            summary: normalize_optional(self.summary),
            skills: self.skills.map(normalize_skills),
            work_experiences: self
                .work_experiences
                .map(|v| v.into_iter().map(normalize_experience).collect()),
            educations: self
                .educations
                .map(|v| v.into_iter().map(normalize_education).collect()),
            links: self.links.map(normalize_links),
        }
    }
}

fn normalize_experience(w: WorkExperience) -> WorkExperience {
    WorkExperience {
        position: normalize_text(&w.position),
        company: normalize_text(&w.company),
        description: normalize_text(&w.description),
        ..w
    }
}

fn normalize_education(e: Education) -> Education {
    Education {
        degree: normalize_text(&e.degree),
        school: normalize_text(&e.school),
        ..e
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CvResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
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
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Cv> for CvResponse {
    fn from(cv: Cv) -> Self {
        Self {
            id: cv.id,
            owner_id: cv.user_id,
            first_name: cv.first_name,
            last_name: cv.last_name,
            city: cv.city,
            country: cv.country,
            postcode: cv.postcode,
            phone: cv.phone,
            email: cv.email,
            photo: cv.photo,
            job_title: cv.job_title,
            summary: cv.summary,
            skills: cv.skills,
            work_experiences: cv.work_experiences.0,
            educations: cv.educations.0,
            links: cv.links.0,
            created_at: cv.created_at,
            updated_at: cv.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_payload_is_normalized() {
        let req: CreateCvRequest = serde_json::from_value(serde_json::json!({
            "firstName": "  Ada ",
            "lastName": "Lovelace",
            "city": "London",
            "country": "UK",
            "postcode": "N1",
            "phone": "123",
            "email": " ada@example.com ",
            "photo": "   ",
            "jobTitle": "Senior    Engineer",
            "summary": "Builds\t\tthings",
            "skills": ["Go", " go ", "GO", "Rust", " "],
            "workExperiences": [{
                "position": " Lead  dev ",
                "company": "Acme",
                "startDate": "2020-01-01T00:00:00Z",
                "description": "x"
            }]
        }))
        .unwrap();
        let new = req.into_new_cv(Uuid::nil());
        assert_eq!(new.first_name, "Ada");
        assert_eq!(new.email, "ada@example.com");
        assert_eq!(new.photo, None);
        assert_eq!(new.job_title, "Senior Engineer");
        assert_eq!(new.summary, "Builds things");
        assert_eq!(new.skills, vec!["Go".to_string(), "Rust".to_string()]);
        assert_eq!(new.work_experiences[0].position, "Lead dev");
        assert!(new.work_experiences[0].end_date.is_none());
    }

    #[test]
    fn update_only_touches_present_fields() {
        let req = UpdateCvRequest {
            summary: Some("  new   summary ".into()),
            skills: Some(vec![]),
            ..Default::default()
        }
        .normalized();
        assert_eq!(req.summary.as_deref(), Some("new summary"));
        assert_eq!(req.skills, Some(vec![]));
        assert!(req.job_title.is_none());
        assert!(req.links.is_none());
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        let once = UpdateCvRequest {
            job_title: Some(" a  b ".into()),
            skills: Some(vec!["x".into(), "X".into()]),
            ..Default::default()
        }
        .normalized();
        let twice = once.clone().normalized();
        assert_eq!(once.job_title, twice.job_title);
        assert_eq!(once.skills, twice.skills);
    }
}
