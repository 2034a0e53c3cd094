//! User-facing notices. Hosts translate [`Notice::key`] and may interpolate
//! the payload fields.
use serde::Serialize;

use crate::ball::BallKind;
use crate::constants::{
    NOTICE_BONUS_GRANTED, NOTICE_CAPTURE_ESCAPED, NOTICE_CAPTURE_SUCCESS,
    NOTICE_ENCOUNTER_APPEARED, NOTICE_FLED, NOTICE_IMPORT_OK, NOTICE_IMPORT_REJECTED,
    NOTICE_NO_ENCOUNTER, NOTICE_OUT_OF_STOCK, NOTICE_RESET, NOTICE_SAVE_DEGRADED,
    NOTICE_SAVE_FAILED, NOTICE_WATCHDOG_RESET,
};
use crate::storage::SaveOutcome;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    NoEncounter,
    EncounterAppeared { id: u32, name: String, shiny: bool },
    OutOfStock { ball: BallKind },
    CaptureSuccess { id: u32, name: String, first_capture: bool },
    CaptureEscaped { id: u32, name: String },
    Fled { id: u32, name: String },
    BonusGranted { ball: BallKind, amount: u32, milestone: u32 },
    WatchdogReset,
    SaveDegraded { key: String, outcome: SaveOutcome },
    SaveFailed { key: String },
    ImportOk { records: usize },
    ImportRejected { reason: String },
    CollectionReset,
}

impl Notice {
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::NoEncounter => NOTICE_NO_ENCOUNTER,
            Self::EncounterAppeared { .. } => NOTICE_ENCOUNTER_APPEARED,
            Self::OutOfStock { .. } => NOTICE_OUT_OF_STOCK,
            Self::CaptureSuccess { .. } => NOTICE_CAPTURE_SUCCESS,
            Self::CaptureEscaped { .. } => NOTICE_CAPTURE_ESCAPED,
            Self::Fled { .. } => NOTICE_FLED,
            Self::BonusGranted { .. } => NOTICE_BONUS_GRANTED,
            Self::WatchdogReset => NOTICE_WATCHDOG_RESET,
            Self::SaveDegraded { .. } => NOTICE_SAVE_DEGRADED,
            Self::SaveFailed { .. } => NOTICE_SAVE_FAILED,
            Self::ImportOk { .. } => NOTICE_IMPORT_OK,
            Self::ImportRejected { .. } => NOTICE_IMPORT_REJECTED,
            Self::CollectionReset => NOTICE_RESET,
        }
    }

    /// Errors and degraded states, as opposed to routine progress.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::NoEncounter
                | Self::OutOfStock { .. }
                | Self::WatchdogReset
                | Self::SaveDegraded { .. }
                | Self::SaveFailed { .. }
                | Self::ImportRejected { .. }
        )
    }
}
