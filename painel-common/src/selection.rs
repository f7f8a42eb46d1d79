//! Assessment selection vocabulary
//!
//! Every value a user can pick on the dashboard (subject, grade, cycle) is a
//! closed set. Raw input is parsed into these types once, at the edge, and
//! anything outside the set is rejected with [`Error::InvalidSelection`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Literal prefix the upstream API puts in front of every grade label
pub const STAGE_PREFIX: &str = "ENSINO FUNDAMENTAL DE 9 ANOS - ";

/// Assessment year used in cycle codes unless configured otherwise
pub const DEFAULT_ASSESSMENT_YEAR: u16 = 2025;

// ========================================
// Entity
// ========================================

/// Opaque identifier of a municipality or school
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityCode(String);

impl EntityCode {
    /// Build an entity code, trimming surrounding whitespace.
    pub fn new(code: impl AsRef<str>) -> Result<Self> {
        let code = code.as_ref().trim();
        if code.is_empty() {
            return Err(Error::InvalidSelection("entity code is empty".to_string()));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Administrative category of an entity, as shown to the logged-in user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "Municipal")]
    Municipal,
    #[serde(rename = "Escola Estadual")]
    StateSchool,
    #[serde(rename = "Escola Indígena")]
    IndigenousSchool,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Municipal => "Municipal",
            EntityKind::StateSchool => "Escola Estadual",
            EntityKind::IndigenousSchool => "Escola Indígena",
        }
    }
}

/// Network filter value sent to the upstream API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Network {
    Municipal,
    Estadual,
}

impl Network {
    pub fn filter_value(&self) -> &'static str {
        match self {
            Network::Municipal => "MUNICIPAL",
            Network::Estadual => "ESTADUAL",
        }
    }
}

// ========================================
// Subject
// ========================================

/// Curricular component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    #[serde(rename = "Língua Portuguesa")]
    Portuguese,
    #[serde(rename = "Matemática")]
    Mathematics,
}

impl Subject {
    pub const ALL: [Subject; 2] = [Subject::Portuguese, Subject::Mathematics];

    /// Label shown in the selector
    pub fn label(&self) -> &'static str {
        match self {
            Subject::Portuguese => "Língua Portuguesa",
            Subject::Mathematics => "Matemática",
        }
    }

    /// Label the upstream API expects in `DADOS.VL_FILTRO_DISCIPLINA`
    pub fn canonical_label(&self) -> &'static str {
        match self {
            Subject::Portuguese => "LÍNGUA PORTUGUESA",
            Subject::Mathematics => "MATEMÁTICA",
        }
    }
}

impl FromStr for Subject {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Subject::ALL
            .into_iter()
            .find(|subject| subject.label() == s || subject.canonical_label() == s)
            .ok_or_else(|| Error::InvalidSelection(format!("unknown subject '{}'", s)))
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ========================================
// Grade
// ========================================

/// Elementary school year, 1 through 5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Grade(u8);

impl Grade {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidSelection(format!(
                "grade {} outside {}..={}",
                value,
                Self::MIN,
                Self::MAX
            )))
        }
    }

    /// All selectable grades in ascending order
    pub fn all() -> impl Iterator<Item = Grade> {
        (Self::MIN..=Self::MAX).map(Grade)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Upstream stage label, e.g. `ENSINO FUNDAMENTAL DE 9 ANOS - 3º ANO`
    pub fn stage_label(&self) -> String {
        format!("{}{}º ANO", STAGE_PREFIX, self.0)
    }
}

impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Grade::new(value).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}º Ano", self.0)
    }
}

// ========================================
// Cycle
// ========================================

/// One of the three assessment rounds of the school year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Cycle {
    #[serde(rename = "1")]
    First,
    #[serde(rename = "2")]
    Second,
    #[serde(rename = "3")]
    Third,
}

impl Cycle {
    pub const ALL: [Cycle; 3] = [Cycle::First, Cycle::Second, Cycle::Third];

    pub fn number(&self) -> u8 {
        match self {
            Cycle::First => 1,
            Cycle::Second => 2,
            Cycle::Third => 3,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Cycle::First => "1",
            Cycle::Second => "2",
            Cycle::Third => "3",
        }
    }

    /// Display label, also written into the `Ciclo` column of result rows
    pub fn label(&self) -> &'static str {
        match self {
            Cycle::First => "1º Ciclo",
            Cycle::Second => "2º Ciclo",
            Cycle::Third => "3º Ciclo",
        }
    }

    /// Upstream assessment code, e.g. `AV12025`
    pub fn assessment_code(&self, year: u16) -> String {
        format!("AV{}{}", self.number(), year)
    }
}

impl FromStr for Cycle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Cycle::ALL
            .into_iter()
            .find(|cycle| cycle.key() == s)
            .ok_or_else(|| Error::InvalidSelection(format!("unknown cycle '{}'", s)))
    }
}

// ========================================
// Selection
// ========================================

/// Everything a single upstream query is built from
///
/// Only constructible from already-validated parts, so building a query from
/// it cannot fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssessmentSelection {
    entity: EntityCode,
    subject: Subject,
    grade: Grade,
    cycle: Cycle,
}

impl AssessmentSelection {
    pub fn new(entity: EntityCode, subject: Subject, grade: Grade, cycle: Cycle) -> Self {
        Self {
            entity,
            subject,
            grade,
            cycle,
        }
    }

    /// Parse raw selector values
    pub fn parse(entity: &str, subject: &str, grade: u8, cycle: &str) -> Result<Self> {
        Ok(Self::new(
            EntityCode::new(entity)?,
            subject.parse()?,
            Grade::new(grade)?,
            cycle.parse()?,
        ))
    }

    pub fn entity(&self) -> &EntityCode {
        &self.entity
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    pub fn grade(&self) -> Grade {
        self.grade
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    /// Same entity, subject and grade, different cycle
    pub fn with_cycle(&self, cycle: Cycle) -> Self {
        Self {
            cycle,
            ..self.clone()
        }
    }
}
