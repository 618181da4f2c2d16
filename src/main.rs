//! Demo binary: plays one scripted heads-up hand against in-memory ports,
//! logging every notification the engine emits.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use holdem_engine::{
    DebitOutcome, Engine, EngineConfig, Game, GameKey, HandRank, InviteResponse, LedgerPort,
    LegalAction, NamingPort, NotificationPort, PersistencePort, PlayerAction, Round, Settlement,
    Transition,
};

struct ConsoleNotifier;

#[async_trait]
impl NotificationPort for ConsoleNotifier {
    async fn prompt_turn(
        &self,
        key: &GameKey,
        _game: &Game,
        player_id: &str,
        legal: &[LegalAction],
        deadline: Duration,
    ) -> anyhow::Result<()> {
        tracing::info!(key = %key, player_id, ?legal, ?deadline, "Your turn");
        Ok(())
    }

    async fn announce_round_advance(
        &self,
        key: &GameKey,
        game: &Game,
        round: Round,
    ) -> anyhow::Result<()> {
        let board: Vec<String> = game.board.iter().map(|c| c.to_string()).collect();
        tracing::info!(key = %key, round = round.label(), board = board.join(" "), "Street dealt");
        Ok(())
    }

    async fn announce_showdown(
        &self,
        key: &GameKey,
        _game: &Game,
        ranking: &[(String, HandRank)],
    ) -> anyhow::Result<()> {
        for (id, rank) in ranking {
            tracing::info!(key = %key, id, category = ?rank.category, "Showdown hand");
        }
        Ok(())
    }

    async fn announce_hand_end(
        &self,
        key: &GameKey,
        _game: &Game,
        settlement: &Settlement,
    ) -> anyhow::Result<()> {
        tracing::info!(
            key = %key,
            winners = ?settlement.winners,
            payouts = ?settlement.payouts,
            by_fold = settlement.by_fold,
            "Hand over"
        );
        Ok(())
    }

    async fn prompt_invite(
        &self,
        key: &GameKey,
        host_name: &str,
        invitee_id: &str,
        stake: i64,
        deadline: Duration,
    ) -> anyhow::Result<()> {
        tracing::info!(key = %key, host_name, invitee_id, stake, ?deadline, "Invited to play");
        Ok(())
    }

    async fn prompt_continuation(
        &self,
        key: &GameKey,
        player_id: &str,
        stake: i64,
        _deadline: Duration,
    ) -> anyhow::Result<()> {
        tracing::info!(key = %key, player_id, stake, "Another hand?");
        Ok(())
    }

    async fn announce_cancelled(
        &self,
        key: &GameKey,
        reason: &str,
        refunds: &[(String, i64)],
    ) -> anyhow::Result<()> {
        tracing::info!(key = %key, reason, ?refunds, "Table closed");
        Ok(())
    }
}

struct MemoryLedger {
    balances: Mutex<HashMap<String, i64>>,
}

impl MemoryLedger {
    fn with_balances(seed: &[(&str, i64)]) -> Self {
        Self {
            balances: Mutex::new(
                seed.iter()
                    .map(|(id, amount)| (id.to_string(), *amount))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl LedgerPort for MemoryLedger {
    async fn balance(&self, player_id: &str) -> anyhow::Result<i64> {
        Ok(*self.balances.lock().await.get(player_id).unwrap_or(&0))
    }

    async fn debit(&self, player_id: &str, amount: i64) -> anyhow::Result<DebitOutcome> {
        let mut balances = self.balances.lock().await;
        let entry = balances.entry(player_id.to_string()).or_insert(0);
        if *entry < amount {
            return Ok(DebitOutcome::Insufficient { available: *entry });
        }
        *entry -= amount;
        Ok(DebitOutcome::Applied)
    }

    async fn credit(&self, player_id: &str, amount: i64) -> anyhow::Result<()> {
        *self
            .balances
            .lock()
            .await
            .entry(player_id.to_string())
            .or_insert(0) += amount;
        Ok(())
    }
}

struct MemorySnapshots {
    snapshots: Mutex<HashMap<GameKey, serde_json::Value>>,
}

#[async_trait]
impl PersistencePort for MemorySnapshots {
    async fn save_snapshot(&self, key: &GameKey, game: &Game) -> anyhow::Result<()> {
        let value = serde_json::to_value(game)?;
        self.snapshots.lock().await.insert(key.clone(), value);
        Ok(())
    }

    async fn clear_snapshot(&self, key: &GameKey) -> anyhow::Result<()> {
        self.snapshots.lock().await.remove(key);
        Ok(())
    }
}

struct IdNames;

#[async_trait]
impl NamingPort for IdNames {
    async fn display_name(&self, player_id: &str) -> anyhow::Result<String> {
        let mut chars = player_id.chars();
        Ok(match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => player_id.to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let ledger = Arc::new(MemoryLedger::with_balances(&[
        ("alice", 10_000),
        ("bob", 10_000),
        ("carol", 10_000),
    ]));
    let engine = Engine::new(
        EngineConfig::from_env(),
        Arc::new(ConsoleNotifier),
        Arc::clone(&ledger) as Arc<dyn LedgerPort>,
        Arc::new(MemorySnapshots {
            snapshots: Mutex::new(HashMap::new()),
        }),
        Arc::new(IdNames),
    );

    let key = GameKey::new("demo", "table-1");
    engine
        .open_invite(
            key.clone(),
            "alice",
            &["bob".to_string(), "carol".to_string()],
            None,
        )
        .await?;
    engine
        .respond_invite(&key, "bob", InviteResponse::Accept)
        .await?;
    engine
        .respond_invite(&key, "carol", InviteResponse::Decline)
        .await?;

    // Heads-up: alice took seat 0 as host and holds the button, so bob
    // opens every street.
    engine
        .handle_action(&key, "bob", PlayerAction::RaiseTo(200))
        .await?;
    engine.handle_action(&key, "alice", PlayerAction::Call).await?;
    for _ in 0..2 {
        engine.handle_action(&key, "bob", PlayerAction::Check).await?;
        engine
            .handle_action(&key, "alice", PlayerAction::Check)
            .await?;
    }
    engine
        .handle_action(&key, "bob", PlayerAction::RaiseTo(300))
        .await?;
    let outcome = engine.handle_action(&key, "alice", PlayerAction::Call).await?;
    if let Transition::HandEnded(settlement) = outcome {
        tracing::info!(winners = ?settlement.winners, "Demo hand settled");
    }

    engine
        .respond_continuation(&key, "alice", InviteResponse::Decline)
        .await?;
    engine
        .respond_continuation(&key, "bob", InviteResponse::Decline)
        .await?;

    for id in ["alice", "bob", "carol"] {
        tracing::info!(id, balance = ledger.balance(id).await?, "Final balance");
    }
    Ok(())
}
