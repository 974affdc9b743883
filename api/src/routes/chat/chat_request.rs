use contextor::AnswerFilter;
use serde::Deserialize;

/// Body of `POST /chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    pub dept: String,
    pub year: String,
    #[serde(default)]
    pub semester: Option<String>,
}

impl ChatRequest {
    pub fn filter(&self) -> AnswerFilter {
        AnswerFilter {
            dept: self.dept.clone(),
            year: self.year.clone(),
            semester: self.semester.clone(),
        }
    }
}
