//! The async orchestrator: a typed registry of table sessions, the ledger
//! and notification plumbing around the pure game core, and the timers that
//! guarantee a stalled human can never wedge a hand.
//!
//! Locking discipline: the registry lock is always taken before a session
//! mutex and never while one is held. Exactly one action or timer callback
//! mutates a session at a time.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::game::constants::{MAX_PLAYERS, MIN_PLAYERS_TO_START};
use crate::game::{Game, GameError, PlayerAction, Settlement, Transition};
use crate::ports::{DebitOutcome, LedgerPort, NamingPort, NotificationPort, PersistencePort};
use crate::session::{
    BallotOutcome, GameKey, GameSession, InviteResponse, InviteSession, SessionState,
};

pub struct Engine {
    config: EngineConfig,
    sessions: RwLock<HashMap<GameKey, Arc<Mutex<GameSession>>>>,
    notifier: Arc<dyn NotificationPort>,
    ledger: Arc<dyn LedgerPort>,
    persistence: Arc<dyn PersistencePort>,
    naming: Arc<dyn NamingPort>,
    /// Handle to ourselves for the timer tasks we spawn.
    self_ref: Weak<Engine>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        notifier: Arc<dyn NotificationPort>,
        ledger: Arc<dyn LedgerPort>,
        persistence: Arc<dyn PersistencePort>,
        naming: Arc<dyn NamingPort>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            config,
            sessions: RwLock::new(HashMap::new()),
            notifier,
            ledger,
            persistence,
            naming,
            self_ref: self_ref.clone(),
        })
    }

    pub async fn has_session(&self, key: &GameKey) -> bool {
        self.sessions.read().await.contains_key(key)
    }

    /// Opens a table: debits the host's stake, invites the listed players
    /// and arms their response timers. The host is confirmed from the start.
    pub async fn open_invite(
        &self,
        key: GameKey,
        host_id: &str,
        invitees: &[String],
        stake: Option<i64>,
    ) -> anyhow::Result<()> {
        let stake = stake.unwrap_or(self.config.default_bet_amount);
        if stake <= 0 {
            return Err(GameError::InvalidAmount {
                amount: stake,
                minimum: 1,
            }
            .into());
        }
        let seats = invitees.iter().filter(|id| id.as_str() != host_id).count() + 1;
        if seats > MAX_PLAYERS {
            return Err(GameError::InvalidAction {
                reason: format!("table seats at most {} players, got {}", MAX_PLAYERS, seats),
            }
            .into());
        }
        if self.has_session(&key).await {
            return Err(GameError::InvalidAction {
                reason: format!("a game is already running at {}", key),
            }
            .into());
        }

        self.checked_debit(host_id, stake).await?;

        let host_name = self.resolve_name(host_id).await;
        let invite = InviteSession::open(
            host_id,
            &host_name,
            invitees,
            stake,
            self.config.invite_window.as_secs(),
        );
        let invitee_ids: Vec<String> = invite.pending.clone();
        let session = Arc::new(Mutex::new(GameSession::new(key.clone(), invite, stake)));

        {
            let mut map = self.sessions.write().await;
            if map.contains_key(&key) {
                // Lost the creation race; hand the stake back.
                drop(map);
                self.refund(host_id, stake).await;
                return Err(GameError::InvalidAction {
                    reason: format!("a game is already running at {}", key),
                }
                .into());
            }
            map.insert(key.clone(), Arc::clone(&session));
        }

        tracing::info!(key = %key, host_id, stake, invitees = invitee_ids.len(), "Invite opened");

        let mut guard = session.lock().await;
        for invitee in &invitee_ids {
            if let Err(e) = self
                .notifier
                .prompt_invite(&key, &host_name, invitee, stake, self.config.invite_timeout)
                .await
            {
                tracing::warn!(key = %key, invitee, error = %e, "Invite notification failed");
            }
            self.arm_invite_timer(&mut guard, invitee);
        }
        self.arm_window_timer(&mut guard, self.config.invite_window);

        // An invite with no invitees resolves on the spot.
        if ballot_resolved(&guard) {
            guard.timers.clear_window();
            self.resolve_ballot(&mut guard).await?;
        }
        let closed = matches!(guard.state, SessionState::Closed);
        drop(guard);
        if closed {
            self.remove_session(&key).await;
        }
        Ok(())
    }

    /// Records an invitee's answer. Accepting debits the stake; declining is
    /// free. When the last answer lands the start decision is taken.
    pub async fn respond_invite(
        &self,
        key: &GameKey,
        player_id: &str,
        response: InviteResponse,
    ) -> anyhow::Result<()> {
        let session = self.session(key).await?;
        let mut guard = session.lock().await;
        let result = self
            .respond_locked(&mut guard, player_id, response, true)
            .await;
        let closed = matches!(guard.state, SessionState::Closed);
        drop(guard);
        if closed {
            self.remove_session(key).await;
        }
        result
    }

    /// Records a continuation vote after a settled hand.
    pub async fn respond_continuation(
        &self,
        key: &GameKey,
        player_id: &str,
        response: InviteResponse,
    ) -> anyhow::Result<()> {
        let session = self.session(key).await?;
        let mut guard = session.lock().await;
        let result = self
            .respond_locked(&mut guard, player_id, response, false)
            .await;
        let closed = matches!(guard.state, SessionState::Closed);
        drop(guard);
        if closed {
            self.remove_session(key).await;
        }
        result
    }

    /// Applies a betting action for `player_id` against the table at `key`.
    pub async fn handle_action(
        &self,
        key: &GameKey,
        player_id: &str,
        action: PlayerAction,
    ) -> anyhow::Result<Transition> {
        let session = self.session(key).await?;
        let mut guard = session.lock().await;
        self.apply_action(&mut guard, player_id, &action).await
    }

    async fn session(&self, key: &GameKey) -> anyhow::Result<Arc<Mutex<GameSession>>> {
        self.sessions
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| GameError::NoActiveGame.into())
    }

    async fn remove_session(&self, key: &GameKey) {
        if self.sessions.write().await.remove(key).is_some() {
            tracing::info!(key = %key, "Session closed");
        }
    }

    async fn respond_locked(
        &self,
        guard: &mut GameSession,
        player_id: &str,
        response: InviteResponse,
        inviting: bool,
    ) -> anyhow::Result<()> {
        let stake = guard.bet_amount;
        let pending = match (&guard.state, inviting) {
            (SessionState::Inviting(b), true) | (SessionState::Voting(b), false) => {
                b.is_pending(player_id)
            }
            _ => {
                return Err(GameError::InvalidAction {
                    reason: "no open ballot for this table".to_string(),
                }
                .into())
            }
        };
        if !pending {
            return Err(GameError::InvalidAction {
                reason: format!("{} has no pending invite", player_id),
            }
            .into());
        }

        if response == InviteResponse::Accept {
            self.checked_debit(player_id, stake).await?;
        }

        let name = self.resolve_name(player_id).await;
        if let Some(ballot) = ballot_mut(guard) {
            ballot.respond(player_id, &name, response)?;
        }
        guard.timers.clear_invite(player_id);
        tracing::info!(
            key = %guard.key,
            player_id,
            response = ?response,
            "Ballot response recorded"
        );

        if ballot_resolved(guard) {
            guard.timers.clear_window();
            self.resolve_ballot(guard).await?;
        }
        Ok(())
    }

    /// Takes the start decision once every invitee has answered or timed
    /// out: deal a hand, or refund the confirmed stakes and close.
    async fn resolve_ballot(&self, guard: &mut GameSession) -> anyhow::Result<()> {
        let outcome = match &guard.state {
            SessionState::Inviting(b) | SessionState::Voting(b) => b.outcome(MIN_PLAYERS_TO_START),
            _ => return Ok(()),
        };
        match outcome {
            BallotOutcome::Start(players) => self.start_hand(guard, &players).await,
            BallotOutcome::Cancel(confirmed) => {
                let refunds: Vec<(String, i64)> = confirmed
                    .iter()
                    .map(|(id, _)| (id.clone(), guard.bet_amount))
                    .collect();
                for (id, amount) in &refunds {
                    self.refund(id, *amount).await;
                }
                let reason = GameError::NotEnoughPlayers {
                    confirmed: confirmed.len(),
                }
                .to_string();
                if let Err(e) = self
                    .notifier
                    .announce_cancelled(&guard.key, &reason, &refunds)
                    .await
                {
                    tracing::warn!(key = %guard.key, error = %e, "Cancel notification failed");
                }
                tracing::info!(
                    key = %guard.key,
                    confirmed = confirmed.len(),
                    "Table cancelled, stakes refunded"
                );
                guard.timers.clear_all();
                guard.state = SessionState::Closed;
                Ok(())
            }
        }
    }

    async fn start_hand(
        &self,
        guard: &mut GameSession,
        entrants: &[(String, String)],
    ) -> anyhow::Result<()> {
        // The button goes to the first player from the previous hand's
        // rotation order who is seated again; the host opens hand one.
        let dealer_seat = guard
            .button_queue
            .iter()
            .find_map(|id| entrants.iter().position(|(pid, _)| pid == id))
            .unwrap_or(0);
        let game = match Game::new(
            Uuid::new_v4().to_string(),
            entrants,
            guard.bet_amount,
            dealer_seat,
        ) {
            Ok(game) => game,
            Err(e) => {
                // The deal failed before any card reached a player. Hand
                // every confirmed stake back and shut the table instead of
                // stranding the session with the pot half-collected.
                let refunds: Vec<(String, i64)> = entrants
                    .iter()
                    .map(|(id, _)| (id.clone(), guard.bet_amount))
                    .collect();
                for (id, amount) in &refunds {
                    self.refund(id, *amount).await;
                }
                if let Err(notify_err) = self
                    .notifier
                    .announce_cancelled(&guard.key, &e.to_string(), &refunds)
                    .await
                {
                    tracing::warn!(key = %guard.key, error = %notify_err, "Cancel notification failed");
                }
                tracing::error!(key = %guard.key, error = %e, "Deal failed, stakes refunded");
                guard.timers.clear_all();
                guard.state = SessionState::Closed;
                return Err(e.into());
            }
        };
        guard.game = Some(game);
        guard.state = SessionState::Playing;
        guard.bump();
        self.save_snapshot(guard).await;
        self.prompt_current_turn(guard, self.config.turn_timeout).await;
        Ok(())
    }

    async fn apply_action(
        &self,
        guard: &mut GameSession,
        player_id: &str,
        action: &PlayerAction,
    ) -> anyhow::Result<Transition> {
        match (&guard.state, guard.game.as_ref()) {
            (SessionState::Playing, Some(game)) if game.is_active => {}
            (_, Some(game)) if !game.is_active => {
                return Err(GameError::GameAlreadySettled.into())
            }
            _ => return Err(GameError::NoActiveGame.into()),
        }

        // Fold and check cost nothing; skip the ledger round-trip so an
        // unreachable ledger can never block a timeout fold.
        let available = match action {
            PlayerAction::Fold | PlayerAction::Check => 0,
            _ => self.ledger.balance(player_id).await?,
        };

        let game = guard.game.as_mut().ok_or(GameError::NoActiveGame)?;
        let before = game
            .player(player_id)
            .map(|p| p.total_contributed)
            .unwrap_or(0);

        let transition = match game.handle_action(player_id, action, available) {
            Ok(t) => t,
            Err(GameError::InsufficientFunds {
                required,
                available,
            }) => {
                self.grant_grace(guard, player_id, available).await;
                return Err(GameError::InsufficientFunds {
                    required,
                    available,
                }
                .into());
            }
            Err(GameError::HandAborted { reason }) => {
                self.abort_hand(guard, &reason).await;
                return Err(GameError::HandAborted { reason }.into());
            }
            Err(e) => return Err(e.into()),
        };

        let delta = guard
            .game
            .as_ref()
            .and_then(|g| g.player(player_id))
            .map(|p| p.total_contributed - before)
            .unwrap_or(0);
        if delta > 0 {
            self.settle_debit(player_id, delta).await;
        }

        guard.bump();
        guard.timers.clear_turn();

        match &transition {
            Transition::Continue { .. } => {
                self.save_snapshot(guard).await;
                self.prompt_current_turn(guard, self.config.turn_timeout).await;
            }
            Transition::StreetDealt { round, .. } => {
                self.save_snapshot(guard).await;
                if let Some(game) = guard.game.as_ref() {
                    if let Err(e) = self
                        .notifier
                        .announce_round_advance(&guard.key, game, *round)
                        .await
                    {
                        tracing::warn!(key = %guard.key, error = %e, "Round notification failed");
                    }
                }
                self.prompt_current_turn(guard, self.config.turn_timeout).await;
            }
            Transition::HandEnded(settlement) => {
                let settlement = settlement.clone();
                self.finish_hand(guard, &settlement).await;
            }
        }
        Ok(transition)
    }

    /// Pays out the pot, announces the result, and opens the continuation
    /// vote for the next hand.
    async fn finish_hand(&self, guard: &mut GameSession, settlement: &Settlement) {
        for (id, amount) in &settlement.payouts {
            if let Err(e) = self.ledger.credit(id, *amount).await {
                tracing::error!(key = %guard.key, id, amount, error = %e, "Payout credit failed");
            }
        }

        let participants: Vec<String> = guard
            .game
            .as_ref()
            .map(|g| g.players.iter().map(|p| p.id.clone()).collect())
            .unwrap_or_default();

        if let Some(game) = guard.game.as_ref() {
            if !settlement.by_fold {
                if let Err(e) = self
                    .notifier
                    .announce_showdown(&guard.key, game, &settlement.ranking)
                    .await
                {
                    tracing::warn!(key = %guard.key, error = %e, "Showdown notification failed");
                }
            }
            if let Err(e) = self
                .notifier
                .announce_hand_end(&guard.key, game, settlement)
                .await
            {
                tracing::warn!(key = %guard.key, error = %e, "Hand-end notification failed");
            }
        }

        if let Err(e) = self.persistence.clear_snapshot(&guard.key).await {
            tracing::warn!(key = %guard.key, error = %e, "Snapshot clear failed");
        }

        guard.timers.clear_all();
        // Button preference for the next hand: this hand's seat order,
        // starting one past the button. The next hand may reseat players in
        // vote-acceptance order, so the rotation is tracked by id.
        if let Some(game) = guard.game.as_ref() {
            let n = game.players.len();
            guard.button_queue = (1..=n)
                .map(|offset| game.players[(game.dealer_seat + offset) % n].id.clone())
                .collect();
        }
        let vote = InviteSession::continuation(
            &participants,
            guard.bet_amount,
            self.config.continuation_timeout.as_secs(),
        );
        guard.state = SessionState::Voting(vote);
        for id in &participants {
            if let Err(e) = self
                .notifier
                .prompt_continuation(
                    &guard.key,
                    id,
                    guard.bet_amount,
                    self.config.continuation_timeout,
                )
                .await
            {
                tracing::warn!(key = %guard.key, id, error = %e, "Continuation prompt failed");
            }
        }
        self.arm_window_timer(guard, self.config.continuation_timeout);
    }

    /// Fatal in-hand failure: refund every contribution and shut the table.
    async fn abort_hand(&self, guard: &mut GameSession, reason: &str) {
        let refunds = guard
            .game
            .as_mut()
            .map(|g| g.abort(reason))
            .unwrap_or_default();
        for (id, amount) in &refunds {
            self.refund(id, *amount).await;
        }
        if let Err(e) = self
            .notifier
            .announce_cancelled(&guard.key, reason, &refunds)
            .await
        {
            tracing::warn!(key = %guard.key, error = %e, "Abort notification failed");
        }
        if let Err(e) = self.persistence.clear_snapshot(&guard.key).await {
            tracing::warn!(key = %guard.key, error = %e, "Snapshot clear failed");
        }
        guard.timers.clear_all();
        guard.state = SessionState::Closed;
    }

    /// The player cannot cover the action: re-prompt with only the actions
    /// their balance allows and give them a bounded grace window before the
    /// auto-fold.
    async fn grant_grace(&self, guard: &mut GameSession, player_id: &str, available: i64) {
        let key = guard.key.clone();
        if let Some(game) = guard.game.as_ref() {
            let legal = game.legal_actions(player_id, available);
            if let Err(e) = self
                .notifier
                .prompt_turn(&key, game, player_id, &legal, self.config.grace_timeout)
                .await
            {
                tracing::warn!(key = %key, error = %e, "Grace prompt failed");
            }
        }
        tracing::info!(key = %key, player_id, available, "Insufficient funds, grace window armed");
        self.arm_turn_timer(guard, self.config.grace_timeout);
    }

    async fn prompt_current_turn(&self, guard: &mut GameSession, timeout: Duration) {
        let key = guard.key.clone();
        if let Some(game) = guard.game.as_ref() {
            if let Some(player_id) = game.current_player_id().map(str::to_string) {
                let available = match self.ledger.balance(&player_id).await {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Balance read failed, prompting constrained set");
                        0
                    }
                };
                let legal = game.legal_actions(&player_id, available);
                if let Err(e) = self
                    .notifier
                    .prompt_turn(&key, game, &player_id, &legal, timeout)
                    .await
                {
                    tracing::warn!(key = %key, error = %e, "Turn prompt failed");
                }
            }
        }
        self.arm_turn_timer(guard, timeout);
    }

    /// Check-then-debit against the live balance. Used where a failure must
    /// reject the caller's request (buy-ins).
    async fn checked_debit(&self, player_id: &str, amount: i64) -> anyhow::Result<()> {
        let available = self.ledger.balance(player_id).await?;
        if available < amount {
            return Err(GameError::InsufficientFunds {
                required: amount,
                available,
            }
            .into());
        }
        match self.ledger.debit(player_id, amount).await? {
            DebitOutcome::Applied => Ok(()),
            DebitOutcome::Insufficient { available } => Err(GameError::InsufficientFunds {
                required: amount,
                available,
            }
            .into()),
        }
    }

    /// Debit for an already-applied in-hand action. The balance was checked
    /// before the action; if it moved underneath us the discrepancy is
    /// logged and play continues (known check-then-act race against an
    /// external ledger).
    async fn settle_debit(&self, player_id: &str, amount: i64) {
        match self.ledger.debit(player_id, amount).await {
            Ok(DebitOutcome::Applied) => {}
            Ok(DebitOutcome::Insufficient { available }) => {
                tracing::error!(
                    player_id,
                    amount,
                    available,
                    "Balance moved between check and debit"
                );
            }
            Err(e) => {
                tracing::error!(player_id, amount, error = %e, "Ledger debit failed");
            }
        }
    }

    async fn refund(&self, player_id: &str, amount: i64) {
        if let Err(e) = self.ledger.credit(player_id, amount).await {
            tracing::error!(player_id, amount, error = %e, "Refund credit failed");
        }
    }

    async fn save_snapshot(&self, guard: &GameSession) {
        if let Some(game) = guard.game.as_ref() {
            if let Err(e) = self.persistence.save_snapshot(&guard.key, game).await {
                tracing::warn!(key = %guard.key, error = %e, "Snapshot save failed");
            }
        }
    }

    async fn resolve_name(&self, player_id: &str) -> String {
        match self.naming.display_name(player_id).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(player_id, error = %e, "Name lookup failed, using id");
                player_id.to_string()
            }
        }
    }

    // Timer arming. Turn timers carry the session generation; any real
    // action bumps it, so a late callback sees a stale generation and
    // becomes a no-op. Ballot timers instead re-check ballot membership,
    // since responses from other players must not invalidate them.

    fn arm_turn_timer(&self, guard: &mut GameSession, timeout: Duration) {
        let Some(engine) = self.self_ref.upgrade() else {
            return;
        };
        let generation = guard.generation;
        let key = guard.key.clone();
        guard.timers.arm_turn(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            engine.turn_expired(key, generation).await;
        }));
    }

    fn arm_invite_timer(&self, guard: &mut GameSession, player_id: &str) {
        let Some(engine) = self.self_ref.upgrade() else {
            return;
        };
        let timeout = self.config.invite_timeout;
        let key = guard.key.clone();
        let id = player_id.to_string();
        guard.timers.arm_invite(
            player_id,
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                engine.invite_expired(key, id).await;
            }),
        );
    }

    fn arm_window_timer(&self, guard: &mut GameSession, timeout: Duration) {
        let Some(engine) = self.self_ref.upgrade() else {
            return;
        };
        let key = guard.key.clone();
        guard.timers.arm_window(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            engine.window_expired(key).await;
        }));
    }

    /// Turn or grace timer fired: auto-fold the player it was armed for,
    /// unless a real action got there first.
    async fn turn_expired(&self, key: GameKey, generation: u64) {
        let session = match self.session(&key).await {
            Ok(s) => s,
            Err(_) => return,
        };
        let mut guard = session.lock().await;
        if !guard.is_current(generation) {
            tracing::debug!(key = %key, generation, "Stale turn timer, ignoring");
            return;
        }
        let player_id = guard
            .game
            .as_ref()
            .filter(|g| g.is_active)
            .and_then(|g| g.current_player_id().map(str::to_string));
        let Some(player_id) = player_id else {
            return;
        };

        tracing::info!(key = %key, player_id, "Turn timer expired, auto-folding");
        if let Err(e) = self
            .apply_action(&mut guard, &player_id, &PlayerAction::Fold)
            .await
        {
            tracing::error!(key = %key, player_id, error = %e, "Auto-fold failed");
        }
        let closed = matches!(guard.state, SessionState::Closed);
        drop(guard);
        if closed {
            self.remove_session(&key).await;
        }
    }

    /// Per-invitee timer fired: decline on their behalf if still pending.
    async fn invite_expired(&self, key: GameKey, player_id: String) {
        let session = match self.session(&key).await {
            Ok(s) => s,
            Err(_) => return,
        };
        let mut guard = session.lock().await;
        let still_pending = matches!(
            &guard.state,
            SessionState::Inviting(b) if b.is_pending(&player_id)
        );
        if !still_pending {
            return;
        }
        tracing::info!(key = %key, player_id, "Invite expired, auto-declining");
        if let Some(ballot) = ballot_mut(&mut guard) {
            ballot.force_decline(&player_id);
        }
        if ballot_resolved(&guard) {
            guard.timers.clear_window();
            if let Err(e) = self.resolve_ballot(&mut guard).await {
                tracing::error!(key = %key, error = %e, "Ballot resolution failed");
            }
        }
        let closed = matches!(guard.state, SessionState::Closed);
        drop(guard);
        if closed {
            self.remove_session(&key).await;
        }
    }

    /// Aggregate invite window or continuation-vote window fired: treat
    /// everyone still pending as declined and take the start decision.
    async fn window_expired(&self, key: GameKey) {
        let session = match self.session(&key).await {
            Ok(s) => s,
            Err(_) => return,
        };
        let mut guard = session.lock().await;
        match ballot_mut(&mut guard) {
            Some(ballot) if !ballot.resolved() => {
                tracing::info!(key = %key, pending = ballot.pending.len(), "Ballot window expired");
                ballot.decline_remaining();
            }
            _ => return,
        }
        if let Err(e) = self.resolve_ballot(&mut guard).await {
            tracing::error!(key = %key, error = %e, "Ballot resolution failed");
        }
        let closed = matches!(guard.state, SessionState::Closed);
        drop(guard);
        if closed {
            self.remove_session(&key).await;
        }
    }
}

fn ballot_mut(guard: &mut GameSession) -> Option<&mut InviteSession> {
    match &mut guard.state {
        SessionState::Inviting(b) | SessionState::Voting(b) => Some(b),
        _ => None,
    }
}

fn ballot_resolved(guard: &GameSession) -> bool {
    match &guard.state {
        SessionState::Inviting(b) | SessionState::Voting(b) => b.resolved(),
        _ => false,
    }
}
