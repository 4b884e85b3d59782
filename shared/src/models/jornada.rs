//! Jornada Model
//!
//! One jornada per operating night. The lifecycle is owned by the shift
//! state machine in the server crate; this module only defines the shape.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Jornada lifecycle state
///
/// `preparing → reviewing → open → closed`. Closing is terminal; re-using a
/// date goes through create, which replaces the previous row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(rename_all = "snake_case")
)]
pub enum JornadaState {
    Preparing,
    Reviewing,
    Open,
    Closed,
}

impl Default for JornadaState {
    fn default() -> Self {
        Self::Preparing
    }
}

impl JornadaState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::Reviewing => "reviewing",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// Jornada entity - one operating night
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Jornada {
    pub id: i64,
    /// Operating date (YYYY-MM-DD); the night may span past midnight
    pub shift_date: String,
    /// "Noche", "Dia", "Especial"
    pub shift_type: String,
    /// Party / event name for the night
    pub party_name: String,
    /// Scheduled opening time (HH:MM)
    pub scheduled_open: String,
    /// Scheduled closing time (HH:MM), registered at close when absent
    pub scheduled_close: Option<String>,
    /// Lifecycle state
    pub state: JornadaState,
    /// Technical checklist (JSON object of item -> done)
    pub technical_checklist: Option<String>,
    /// DJs for the night
    pub djs: Option<String>,
    /// Available service bars (JSON array of names)
    pub bars: Option<String>,
    /// Actual opening timestamp (Unix millis)
    pub opened_at: Option<i64>,
    /// Who opened the venue
    pub opened_by: Option<String>,
    /// Closing timestamp (Unix millis)
    pub closed_at: Option<i64>,
    pub closed_by: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Jornada {
    /// Technical checklist decoded as a map; malformed JSON reads as empty
    pub fn checklist_map(&self) -> BTreeMap<String, bool> {
        self.technical_checklist
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    /// Available bars decoded as a list; malformed JSON reads as empty
    pub fn bars_list(&self) -> Vec<String> {
        self.bars
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    pub fn is_open(&self) -> bool {
        self.state == JornadaState::Open
    }
}

/// Lightweight view of the current operating state, served through the
/// boundary cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftStatus {
    pub is_open: bool,
    pub jornada_id: Option<i64>,
    pub shift_date: Option<String>,
    pub party_name: Option<String>,
    pub opened_at: Option<i64>,
    pub opened_by: Option<String>,
}

impl ShiftStatus {
    pub fn closed() -> Self {
        Self {
            is_open: false,
            jornada_id: None,
            shift_date: None,
            party_name: None,
            opened_at: None,
            opened_by: None,
        }
    }

    pub fn of(j: &Jornada) -> Self {
        Self {
            is_open: j.is_open(),
            jornada_id: Some(j.id),
            shift_date: Some(j.shift_date.clone()),
            party_name: Some(j.party_name.clone()),
            opened_at: j.opened_at,
            opened_by: j.opened_by.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jornada(checklist: Option<&str>, bars: Option<&str>) -> Jornada {
        Jornada {
            id: 1,
            shift_date: "2025-06-01".into(),
            shift_type: "Noche".into(),
            party_name: "Test".into(),
            scheduled_open: "22:00".into(),
            scheduled_close: None,
            state: JornadaState::Preparing,
            technical_checklist: checklist.map(String::from),
            djs: None,
            bars: bars.map(String::from),
            opened_at: None,
            opened_by: None,
            closed_at: None,
            closed_by: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn checklist_decodes_and_tolerates_garbage() {
        let j = jornada(Some(r#"{"sound": true, "lights": false}"#), None);
        let map = j.checklist_map();
        assert_eq!(map.get("sound"), Some(&true));
        assert_eq!(map.get("lights"), Some(&false));

        let j = jornada(Some("not json"), None);
        assert!(j.checklist_map().is_empty());
    }

    #[test]
    fn bars_decode_and_tolerate_garbage() {
        let j = jornada(None, Some(r#"["Barra Principal", "Terraza"]"#));
        assert_eq!(j.bars_list(), vec!["Barra Principal", "Terraza"]);

        let j = jornada(None, Some("{broken"));
        assert!(j.bars_list().is_empty());
    }
}
