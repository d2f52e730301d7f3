use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EbdError;

/// Name of an EBD class. Students and attendance events join on this value
/// by exact string equality; nothing guarantees a matching class record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassName(pub String);

impl ClassName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "Criança 3 a 5 anos")]
    Preschool,
    #[serde(rename = "Criança de 6 a 11 anos")]
    Child,
    #[serde(rename = "Adolescente")]
    Teen,
    #[serde(rename = "Jovem")]
    Youth,
    #[serde(rename = "Adulto")]
    Adult,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 5] = [
        AgeGroup::Preschool,
        AgeGroup::Child,
        AgeGroup::Teen,
        AgeGroup::Youth,
        AgeGroup::Adult,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::Preschool => "Criança 3 a 5 anos",
            AgeGroup::Child => "Criança de 6 a 11 anos",
            AgeGroup::Teen => "Adolescente",
            AgeGroup::Youth => "Jovem",
            AgeGroup::Adult => "Adulto",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AgeGroup {
    type Err = EbdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        AgeGroup::ALL
            .into_iter()
            .find(|group| group.label() == trimmed)
            .ok_or_else(|| EbdError::UnknownAgeGroup(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub age_group: AgeGroup,
    pub class_name: ClassName,
    pub enrollment_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    /// `None` for classes known only because a student references them.
    pub id: Option<Uuid>,
    pub name: ClassName,
    pub teacher_name: Option<String>,
    pub age_group_criterion: AgeGroup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub id: Uuid,
    pub date: NaiveDate,
    pub class_name: ClassName,
    pub present_student_ids: HashSet<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(rename = "Crítico")]
    Critical,
    #[serde(rename = "Atenção")]
    Attention,
    #[serde(rename = "Regular")]
    Regular,
}

impl AttendanceStatus {
    pub fn label(self) -> &'static str {
        match self {
            AttendanceStatus::Critical => "Crítico",
            AttendanceStatus::Attention => "Atenção",
            AttendanceStatus::Regular => "Regular",
        }
    }

    pub fn badge_color(self) -> &'static str {
        match self {
            AttendanceStatus::Critical => "red",
            AttendanceStatus::Attention => "amber",
            AttendanceStatus::Regular => "green",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceStats {
    pub total_eligible_sessions: usize,
    pub present_count: usize,
    pub percentage: f64,
    pub status: AttendanceStatus,
    pub events: Vec<AttendanceEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionOutcome {
    pub event_id: Uuid,
    pub date: NaiveDate,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSummary {
    pub class_name: ClassName,
    pub enrolled: usize,
    pub sessions: usize,
    pub average_percentage: f64,
    pub critical: usize,
    pub attention: usize,
    pub regular: usize,
}
