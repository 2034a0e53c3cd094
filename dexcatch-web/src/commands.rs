//! Command flows shared by the wasm bridge. The session lives in an
//! `Rc<RefCell<_>>`; each flow borrows it only between suspension points.
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use dexcatch_game::{
    ActionOutcome, BallKind, CatalogSource, Clock, Encounter, EncounterRoll, GameSession,
    KeyValueStore, Notice, ResolverState, RollSource, Stock, lookup_roll,
};
use serde::Serialize;

pub type SharedSession<S, D, C> = Rc<RefCell<GameSession<S, D, C>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Capture(BallKind),
    Flee,
}

/// What a command did, plus the notices it raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionReport {
    pub outcome: ActionOutcome,
    /// The chained encounter, once realised.
    pub encounter: Option<Encounter>,
    pub notices: Vec<NoticeView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoticeView {
    pub key: &'static str,
    pub warning: bool,
    pub notice: Notice,
}

impl From<Notice> for NoticeView {
    fn from(notice: Notice) -> Self {
        Self {
            key: notice.key(),
            warning: notice.is_warning(),
            notice,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BallView {
    pub ball: BallKind,
    pub label: &'static str,
    pub stock: Stock,
    pub available: bool,
}

/// Read-only snapshot for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub encounter: Option<Encounter>,
    pub busy: bool,
    pub encounter_pending: bool,
    pub balls: Vec<BallView>,
    pub total_captures: u32,
}

pub fn drain_notices<S, D, C>(session: &SharedSession<S, D, C>) -> Vec<NoticeView>
where
    S: KeyValueStore,
    D: RollSource,
    C: Clock,
{
    session
        .borrow_mut()
        .drain_notices()
        .into_iter()
        .map(NoticeView::from)
        .collect()
}

#[must_use]
pub fn view<S, D, C>(session: &SharedSession<S, D, C>) -> SessionView
where
    S: KeyValueStore,
    D: RollSource,
    C: Clock,
{
    let session = session.borrow();
    let inventory = session.inventory();
    SessionView {
        encounter: session.encounter().cloned(),
        busy: !matches!(session.resolver_state(), ResolverState::Idle),
        encounter_pending: session.is_encounter_pending(),
        balls: inventory
            .snapshot()
            .into_iter()
            .map(|(ball, stock)| BallView {
                ball,
                label: ball.label(),
                stock,
                available: stock.is_available(),
            })
            .collect(),
        total_captures: inventory.total_captures(),
    }
}

/// Look up `roll` and present the result.
#[allow(clippy::future_not_send)]
pub async fn fulfill<S, D, C, Src>(
    session: &SharedSession<S, D, C>,
    source: &Src,
    roll: EncounterRoll,
) -> Option<Encounter>
where
    S: KeyValueStore,
    D: RollSource,
    C: Clock,
    Src: CatalogSource + ?Sized,
{
    let lookup = lookup_roll(source, &roll).await;
    session
        .borrow_mut()
        .fulfill_encounter(&roll, &lookup)
        .cloned()
}

/// Trigger-encounter command.
#[allow(clippy::future_not_send)]
pub async fn trigger_encounter<S, D, C, Src>(
    session: &SharedSession<S, D, C>,
    source: &Src,
) -> Option<Encounter>
where
    S: KeyValueStore,
    D: RollSource,
    C: Clock,
    Src: CatalogSource + ?Sized,
{
    let roll = session.borrow_mut().request_encounter()?;
    fulfill(session, source, roll).await
}

/// Run a capture or flee: accept it, wait for `settle`, complete it, then
/// realise the chained encounter.
#[allow(clippy::future_not_send)]
pub async fn perform<S, D, C, Src, F, Fut>(
    session: &SharedSession<S, D, C>,
    source: &Src,
    action: Action,
    settle: F,
) -> ActionReport
where
    S: KeyValueStore,
    D: RollSource,
    C: Clock,
    Src: CatalogSource + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    let outcome = {
        let mut session = session.borrow_mut();
        match action {
            Action::Capture(ball) => session.begin_capture(ball),
            Action::Flee => session.begin_flee(),
        }
    };

    let mut encounter = None;
    if let ActionOutcome::Pending { resolution } = &outcome {
        settle().await;
        let next = session.borrow_mut().complete(resolution.ticket);
        if let Some(roll) = next {
            encounter = fulfill(session, source, roll).await;
        }
    }

    ActionReport {
        outcome,
        encounter,
        notices: drain_notices(session),
    }
}
