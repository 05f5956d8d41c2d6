/*
 * kehilla/src/model/observance.rs
 *
 * Recorded observances (yahrzeits, anniversaries, bnai mitzvah dates) and the
 * index used to list the ones falling inside a reminder window.
 *
 * Filesystem access goes through an explicit `AppContext`.
 */

use crate::context::AppContext;
use crate::model::occurrence::{AnchorDate, Occurrence, OccurrenceCalculator, QueryWindow};
use crate::storage::LocalStorage;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use strum::{EnumIter, IntoEnumIterator};
use uuid::Uuid;

// Bump when the Observance layout changes.
const OBSERVANCE_INDEX_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum ObservanceKind {
    Yahrzeit,
    Anniversary,
    BnaiMitzvah,
    Birthday,
}

impl ObservanceKind {
    /// Stable value used on the command line and in storage.
    pub fn machine_value(&self) -> &'static str {
        match self {
            ObservanceKind::Yahrzeit => "yahrzeit",
            ObservanceKind::Anniversary => "anniversary",
            ObservanceKind::BnaiMitzvah => "bnai_mitzvah",
            ObservanceKind::Birthday => "birthday",
        }
    }
}

impl fmt::Display for ObservanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservanceKind::Yahrzeit => write!(f, "Yahrzeit"),
            ObservanceKind::Anniversary => write!(f, "Anniversary"),
            ObservanceKind::BnaiMitzvah => write!(f, "Bnai Mitzvah"),
            ObservanceKind::Birthday => write!(f, "Birthday"),
        }
    }
}

impl std::str::FromStr for ObservanceKind {
    type Err = anyhow::Error;

    /// Case-insensitive; `-` is accepted in place of `_`.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        ObservanceKind::iter()
            .find(|kind| kind.machine_value() == wanted)
            .ok_or_else(|| anyhow::anyhow!("Unknown observance kind: '{}'", s.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observance {
    pub id: String,
    /// Person (or couple) the observance belongs to.
    pub name: String,
    pub kind: ObservanceKind,
    pub anchor: AnchorDate,
}

impl Observance {
    pub fn new(name: &str, kind: ObservanceKind, anchor: AnchorDate) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            kind,
            anchor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingObservance {
    pub observance: Observance,
    pub occurrence: Occurrence,
}

impl fmt::Display for UpcomingObservance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  {} of {} ({} years)",
            self.occurrence,
            self.observance.kind,
            self.observance.name,
            self.occurrence.years_since_anchor()
        )
    }
}

#[derive(Serialize, Deserialize)]
struct ObservanceIndexData {
    #[serde(default)]
    version: u32,
    observances: Vec<Observance>,
}

#[derive(Debug, Clone, Default)]
pub struct ObservanceIndex {
    observances: Vec<Observance>,
}

impl ObservanceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_observances(observances: Vec<Observance>) -> Self {
        Self { observances }
    }

    pub fn observances(&self) -> &[Observance] {
        &self.observances
    }

    pub fn len(&self) -> usize {
        self.observances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observances.is_empty()
    }

    pub fn add(&mut self, observance: Observance) {
        self.observances.push(observance);
    }

    /// Returns true if an observance with this id was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.observances.len();
        self.observances.retain(|o| o.id != id);
        self.observances.len() != before
    }

    pub fn of_kind(&self, kind: ObservanceKind) -> Vec<&Observance> {
        self.observances.iter().filter(|o| o.kind == kind).collect()
    }

    /// Observances with an occurrence inside `window`, ordered by date then name.
    /// Occurrences falling before the anchor itself (an event that has not
    /// happened yet) are left out.
    pub fn upcoming(
        &self,
        window: &QueryWindow,
        calculator: &OccurrenceCalculator,
    ) -> Vec<UpcomingObservance> {
        let mut hits: Vec<UpcomingObservance> = self
            .observances
            .iter()
            .filter_map(|o| {
                calculator
                    .next_occurrence(o.anchor, window)
                    .filter(|occurrence| occurrence.date() >= occurrence.anchor().date())
                    .map(|occurrence| UpcomingObservance {
                        observance: o.clone(),
                        occurrence,
                    })
            })
            .collect();

        hits.sort_by(|a, b| {
            a.occurrence
                .date()
                .cmp(&b.occurrence.date())
                .then_with(|| a.observance.name.cmp(&b.observance.name))
        });
        hits
    }

    /// Reads the file without locking. Callers hold the lock.
    fn read_data(path: &Path) -> Result<ObservanceIndexData> {
        if !path.exists() {
            return Ok(ObservanceIndexData {
                version: OBSERVANCE_INDEX_VERSION,
                observances: vec![],
            });
        }
        let json = fs::read_to_string(path)?;
        let data: ObservanceIndexData = serde_json::from_str(&json).map_err(|e| {
            anyhow::anyhow!("Failed to parse observance index '{}': {}", path.display(), e)
        })?;
        Ok(data)
    }

    /// Refuses to overwrite an index written by a newer format.
    fn ensure_writable(path: &Path, data: &ObservanceIndexData) -> Result<()> {
        if data.version > OBSERVANCE_INDEX_VERSION {
            anyhow::bail!(
                "Observance index {} has version {}, newer than supported version {}",
                path.display(),
                data.version,
                OBSERVANCE_INDEX_VERSION
            );
        }
        Ok(())
    }

    fn write_data(path: &Path, observances: &[Observance]) -> Result<()> {
        let data = ObservanceIndexData {
            version: OBSERVANCE_INDEX_VERSION,
            observances: observances.to_vec(),
        };
        let json = serde_json::to_string_pretty(&data)?;
        LocalStorage::atomic_write(path, json)?;
        log::debug!("Saved {} observances to {}", observances.len(), path.display());
        Ok(())
    }

    /// Loads the index from the context's data directory.
    /// A missing file is an empty index.
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.get_observances_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        LocalStorage::with_lock(&path, || {
            let data = Self::read_data(&path)?;
            if data.version != OBSERVANCE_INDEX_VERSION {
                log::warn!(
                    "Observance index {} has version {}, expected {}",
                    path.display(),
                    data.version,
                    OBSERVANCE_INDEX_VERSION
                );
            }
            Ok(Self {
                observances: data.observances,
            })
        })
    }

    /// Replaces the stored index with this one.
    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        let path = ctx.get_observances_path()?;
        LocalStorage::with_lock(&path, || {
            Self::ensure_writable(&path, &Self::read_data(&path)?)?;
            Self::write_data(&path, &self.observances)
        })
    }

    /// Reads, applies `f` and writes back while holding the lock, so
    /// concurrent modifications are not lost.
    pub fn modify<F, T>(ctx: &dyn AppContext, f: F) -> Result<T>
    where
        F: FnOnce(&mut ObservanceIndex) -> T,
    {
        let path = ctx.get_observances_path()?;
        LocalStorage::with_lock(&path, || {
            let data = Self::read_data(&path)?;
            Self::ensure_writable(&path, &data)?;
            let mut index = Self {
                observances: data.observances,
            };
            let result = f(&mut index);
            Self::write_data(&path, &index.observances)?;
            Ok(result)
        })
    }
}
