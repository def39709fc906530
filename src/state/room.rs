//! Per-room game lifecycle.
//!
//! Every method here is synchronous and is called with the registry write
//! lock held, so a single operation is never interleaved with another one
//! on the same room. Methods return the events to fan out; the caller
//! delivers them after resolving recipients.

use chrono::{DateTime, Duration, Utc};

use crate::error::{GameError, GameResult};
use crate::protocol::{RoomEvent, ServerMessage};
use crate::puzzles::PuzzleBank;
use crate::types::*;

/// A question handed to the judge, to be applied once the verdict is back
#[derive(Debug, Clone)]
pub struct PendingQuestion {
    pub room_id: RoomId,
    /// Round the question was asked in
    pub round: u64,
    pub ticket: u64,
    pub asker: PlayerName,
    pub question: String,
    pub puzzle: Puzzle,
    /// History as it was when the question was asked
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    /// Join order, which is also the turn order
    players: Vec<Player>,
    pub host: Option<PlayerName>,
    pub puzzle_index: Option<usize>,
    pub started: bool,
    pub current_turn: Option<PlayerName>,
    pub question_count: u32,
    pub history: Vec<HistoryEntry>,
    pub expire_at: Option<DateTime<Utc>>,
    /// Incremented on every puzzle selection
    pub round: u64,
    pending_judgment: Option<u64>,
    next_ticket: u64,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            players: Vec::new(),
            host: None,
            puzzle_index: None,
            started: false,
            current_turn: None,
            question_count: 0,
            history: Vec::new(),
            expire_at: None,
            round: 0,
            pending_judgment: None,
            next_ticket: 1,
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.player(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// One player, no game running: open for public matchmaking
    pub fn is_waiting(&self) -> bool {
        self.players.len() == 1 && !self.started
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_at.is_some_and(|at| at <= now)
    }

    pub fn is_judging(&self) -> bool {
        self.pending_judgment.is_some()
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.id.clone(),
            players: self.players.iter().map(|p| p.name.clone()).collect(),
            host: self.host.clone(),
            puzzle_index: self.puzzle_index,
            started: self.started,
        }
    }

    /// Add a player, or rebind the connection of a player who is already here
    pub fn join(
        &mut self,
        name: &str,
        connection_id: &str,
        now: DateTime<Utc>,
    ) -> (RoomSnapshot, Vec<RoomEvent>) {
        let mut events = Vec::new();

        if let Some(player) = self.players.iter_mut().find(|p| p.name == name) {
            tracing::info!("{} rejoined room {} on a new connection", name, self.id);
            player.connection_id = connection_id.to_string();
            player.last_active_at = now;
        } else {
            self.players.push(Player {
                name: name.to_string(),
                connection_id: connection_id.to_string(),
                ready: false,
                last_active_at: now,
            });
            events.push(RoomEvent::to_others(
                name,
                ServerMessage::PlayerJoined {
                    name: name.to_string(),
                },
            ));
        }

        if self.host.is_none() {
            self.host = Some(name.to_string());
        }
        self.expire_at = None;

        (self.snapshot(), events)
    }

    /// Remove a player. Absent players are a no-op with no events.
    pub fn leave(&mut self, name: &str, now: DateTime<Utc>, timeout: Duration) -> Vec<RoomEvent> {
        let Some(index) = self.players.iter().position(|p| p.name == name) else {
            return Vec::new();
        };
        self.players.remove(index);

        let mut events = vec![RoomEvent::to_room(ServerMessage::PlayerLeft {
            name: name.to_string(),
        })];

        if self.players.is_empty() {
            self.host = None;
            self.reset_round();
            self.expire_at = Some(now + timeout);
            tracing::info!("Room {} is empty, expires at {}", self.id, now + timeout);
            return events;
        }

        if self.host.as_deref() == Some(name) {
            let new_host = self.players[0].name.clone();
            self.host = Some(new_host.clone());
            events.push(RoomEvent::to_room(ServerMessage::NewHost { host: new_host }));
        }

        if self.current_turn.as_deref() == Some(name) {
            // The player who followed the leaver now sits at the leaver's index
            let next = self.players[index % self.players.len()].name.clone();
            self.current_turn = Some(next.clone());
            // An in-flight verdict for the leaver must not land
            self.pending_judgment = None;
            events.push(RoomEvent::to_room(ServerMessage::TurnChanged {
                current_turn: next,
            }));
        }

        events
    }

    pub fn set_ready(&mut self, name: &str, ready: bool) -> Vec<RoomEvent> {
        let Some(player) = self.players.iter_mut().find(|p| p.name == name) else {
            return Vec::new();
        };
        let was_ready = player.ready;
        player.ready = ready;

        let mut events = vec![RoomEvent::to_room(ServerMessage::PlayerStatusChanged {
            name: name.to_string(),
            ready,
        })];

        if ready && !was_ready && self.all_ready() && !self.started {
            tracing::info!("All players ready in room {}", self.id);
            events.push(RoomEvent::to_room(ServerMessage::AllPlayersReady {}));
        }

        events
    }

    fn all_ready(&self) -> bool {
        self.players.len() >= 2 && self.players.iter().all(|p| p.ready)
    }

    pub fn touch(&mut self, name: &str, now: DateTime<Utc>) -> bool {
        match self.players.iter_mut().find(|p| p.name == name) {
            Some(player) => {
                player.last_active_at = now;
                true
            }
            None => false,
        }
    }

    /// Host starts a round with the given puzzle
    pub fn select_puzzle(
        &mut self,
        name: &str,
        puzzle_index: i64,
        puzzles: &PuzzleBank,
    ) -> GameResult<Vec<RoomEvent>> {
        if self.host.as_deref() != Some(name) {
            return Err(GameError::Unauthorized(
                "Only the host can select a puzzle".to_string(),
            ));
        }
        let invalid =
            || GameError::InvalidArgument(format!("Invalid puzzle index {}", puzzle_index));
        let puzzle_index = usize::try_from(puzzle_index).map_err(|_| invalid())?;
        let puzzle = puzzles.get(puzzle_index).ok_or_else(invalid)?;

        self.round += 1;
        self.started = true;
        self.puzzle_index = Some(puzzle_index);
        self.current_turn = Some(name.to_string());
        self.question_count = 0;
        self.history.clear();
        self.pending_judgment = None;

        tracing::info!(
            "Room {} round {} started with puzzle {}",
            self.id,
            self.round,
            puzzle_index
        );

        Ok(vec![RoomEvent::to_room(ServerMessage::GameStarted {
            puzzle_index,
            surface: puzzle.surface.clone(),
            current_turn: name.to_string(),
        })])
    }

    /// Validate a question and reserve the judge slot.
    ///
    /// Returns None (nothing happens, nothing is emitted) unless a round is
    /// running, it is `name`'s turn, no verdict is outstanding and the text
    /// is non-empty.
    pub fn begin_question(
        &mut self,
        name: &str,
        text: &str,
        puzzles: &PuzzleBank,
    ) -> Option<PendingQuestion> {
        let question = text.trim();
        if question.is_empty()
            || !self.started
            || self.current_turn.as_deref() != Some(name)
            || self.is_judging()
        {
            return None;
        }
        let puzzle = puzzles.get(self.puzzle_index?)?.clone();

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending_judgment = Some(ticket);

        Some(PendingQuestion {
            room_id: self.id.clone(),
            round: self.round,
            ticket,
            asker: name.to_string(),
            question: question.to_string(),
            puzzle,
            history: self.history.clone(),
        })
    }

    /// Apply a verdict for a question reserved with [`Room::begin_question`].
    ///
    /// Returns None and leaves the room untouched if the room moved on while
    /// the judge was thinking (new round, asker left, turn changed).
    pub fn apply_verdict(
        &mut self,
        pending: &PendingQuestion,
        verdict: Verdict,
    ) -> Option<Vec<RoomEvent>> {
        if pending.room_id != self.id
            || pending.round != self.round
            || self.pending_judgment != Some(pending.ticket)
            || !self.started
            || self.current_turn.as_deref() != Some(pending.asker.as_str())
            || !self.contains(&pending.asker)
        {
            return None;
        }
        self.pending_judgment = None;

        self.history.push(HistoryEntry {
            asker: pending.asker.clone(),
            question: pending.question.clone(),
            verdict,
        });
        self.question_count += 1;

        if verdict.is_solved() {
            tracing::info!(
                "{} solved the puzzle in room {} after {} questions",
                pending.asker,
                self.id,
                self.question_count
            );
            self.reset_round();
            for player in &mut self.players {
                player.ready = false;
            }
            return Some(vec![RoomEvent::to_room(ServerMessage::GameOver {
                winner: pending.asker.clone(),
                final_question: pending.question.clone(),
                surface: pending.puzzle.surface.clone(),
                solution: pending.puzzle.bottom.clone(),
            })]);
        }

        let next_turn = self.next_player_after(&pending.asker);
        self.current_turn = Some(next_turn.clone());

        Some(vec![RoomEvent::to_room(ServerMessage::QuestionAnswered {
            name: pending.asker.clone(),
            question: pending.question.clone(),
            verdict,
            next_turn,
        })])
    }

    /// Next player in join order after `name`, wrapping. A sole player keeps the turn.
    pub fn next_player_after(&self, name: &str) -> PlayerName {
        match self.players.iter().position(|p| p.name == name) {
            Some(index) => self.players[(index + 1) % self.players.len()].name.clone(),
            None => name.to_string(),
        }
    }

    fn reset_round(&mut self) {
        self.started = false;
        self.puzzle_index = None;
        self.current_turn = None;
        self.pending_judgment = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Recipients;

    fn bank() -> PuzzleBank {
        PuzzleBank::new(vec![
            Puzzle {
                title: "Zero".to_string(),
                surface: "surface zero".to_string(),
                bottom: "bottom zero".to_string(),
            },
            Puzzle {
                title: "One".to_string(),
                surface: "surface one".to_string(),
                bottom: "bottom one".to_string(),
            },
        ])
    }

    fn room_with(names: &[&str]) -> Room {
        let mut room = Room::new("room".to_string());
        for name in names {
            room.join(name, &format!("conn-{}", name), Utc::now());
        }
        room
    }

    fn messages(events: &[RoomEvent]) -> Vec<ServerMessage> {
        events.iter().map(|e| e.msg.clone()).collect()
    }

    fn ask(room: &mut Room, name: &str, verdict: Verdict) -> Option<Vec<RoomEvent>> {
        let pending = room.begin_question(name, "Is it a question?", &bank())?;
        room.apply_verdict(&pending, verdict)
    }

    #[test]
    fn test_first_joiner_is_host() {
        let mut room = Room::new("r".to_string());
        let (snapshot, events) = room.join("alice", "c1", Utc::now());

        assert_eq!(snapshot.host.as_deref(), Some("alice"));
        assert_eq!(snapshot.players, vec!["alice"]);
        assert!(!snapshot.started);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].to, Recipients::AllExcept("alice".to_string()));

        let (snapshot, _) = room.join("bob", "c2", Utc::now());
        assert_eq!(snapshot.host.as_deref(), Some("alice"));
        assert_eq!(snapshot.players, vec!["alice", "bob"]);
    }

    #[test]
    fn test_rejoin_rebinds_connection_without_event() {
        let mut room = room_with(&["alice"]);
        let (snapshot, events) = room.join("alice", "c-new", Utc::now());

        assert!(events.is_empty());
        assert_eq!(snapshot.players, vec!["alice"]);
        assert_eq!(room.player("alice").unwrap().connection_id, "c-new");
    }

    #[test]
    fn test_join_clears_expiry() {
        let mut room = room_with(&["alice"]);
        room.leave("alice", Utc::now(), Duration::seconds(60));
        assert!(room.expire_at.is_some());

        room.join("bob", "c2", Utc::now());
        assert!(room.expire_at.is_none());
        assert_eq!(room.host.as_deref(), Some("bob"));
    }

    #[test]
    fn test_leave_absent_player_is_noop() {
        let mut room = room_with(&["alice", "bob"]);
        assert!(room.leave("carol", Utc::now(), Duration::seconds(60)).is_empty());

        room.leave("bob", Utc::now(), Duration::seconds(60));
        assert!(room.leave("bob", Utc::now(), Duration::seconds(60)).is_empty());
        assert_eq!(room.snapshot().players, vec!["alice"]);
    }

    #[test]
    fn test_host_leaving_promotes_earliest_remaining() {
        let mut room = room_with(&["alice", "bob", "carol"]);
        let events = room.leave("alice", Utc::now(), Duration::seconds(60));

        assert_eq!(
            messages(&events),
            vec![
                ServerMessage::PlayerLeft {
                    name: "alice".to_string()
                },
                ServerMessage::NewHost {
                    host: "bob".to_string()
                },
            ]
        );
        assert_eq!(room.host.as_deref(), Some("bob"));
    }

    #[test]
    fn test_non_host_leaving_keeps_host() {
        let mut room = room_with(&["alice", "bob", "carol"]);
        let events = room.leave("bob", Utc::now(), Duration::seconds(60));

        assert_eq!(events.len(), 1);
        assert_eq!(room.host.as_deref(), Some("alice"));
        assert_eq!(room.snapshot().players, vec!["alice", "carol"]);
    }

    #[test]
    fn test_last_leave_sets_expiry_and_abandons_round() {
        let mut room = room_with(&["alice"]);
        room.select_puzzle("alice", 0, &bank()).unwrap();

        let now = Utc::now();
        room.leave("alice", now, Duration::seconds(90));

        assert_eq!(room.expire_at, Some(now + Duration::seconds(90)));
        assert!(room.host.is_none());
        assert!(!room.started);
        assert!(room.current_turn.is_none());
        assert!(!room.is_expired(now));
        assert!(room.is_expired(now + Duration::seconds(90)));
    }

    #[test]
    fn test_all_ready_fires_once_per_transition() {
        let mut room = room_with(&["alice", "bob"]);

        let events = room.set_ready("alice", true);
        assert_eq!(events.len(), 1);

        let events = room.set_ready("bob", true);
        assert_eq!(
            messages(&events),
            vec![
                ServerMessage::PlayerStatusChanged {
                    name: "bob".to_string(),
                    ready: true
                },
                ServerMessage::AllPlayersReady {},
            ]
        );

        // Repeating ready is not a transition
        let events = room.set_ready("bob", true);
        assert_eq!(events.len(), 1);

        room.set_ready("alice", false);
        let events = room.set_ready("alice", true);
        assert!(events.contains(&RoomEvent::to_room(ServerMessage::AllPlayersReady {})));
    }

    #[test]
    fn test_all_ready_needs_two_players() {
        let mut room = room_with(&["alice"]);
        let events = room.set_ready("alice", true);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_all_ready_not_emitted_while_started() {
        let mut room = room_with(&["alice", "bob"]);
        room.select_puzzle("alice", 0, &bank()).unwrap();
        room.set_ready("alice", true);
        let events = room.set_ready("bob", true);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_set_ready_absent_player_is_silent() {
        let mut room = room_with(&["alice"]);
        assert!(room.set_ready("ghost", true).is_empty());
    }

    #[test]
    fn test_select_puzzle_requires_host() {
        let mut room = room_with(&["alice", "bob"]);
        let result = room.select_puzzle("bob", 0, &bank());
        assert!(matches!(result, Err(GameError::Unauthorized(_))));
        assert!(!room.started);
    }

    #[test]
    fn test_select_puzzle_rejects_bad_index() {
        let mut room = room_with(&["alice"]);
        let result = room.select_puzzle("alice", 7, &bank());
        assert!(matches!(result, Err(GameError::InvalidArgument(_))));
        let result = room.select_puzzle("alice", -1, &bank());
        assert!(matches!(result, Err(GameError::InvalidArgument(_))));
        assert!(!room.started);
    }

    #[test]
    fn test_select_puzzle_starts_round_without_solution() {
        let mut room = room_with(&["alice", "bob"]);
        let events = room.select_puzzle("alice", 1, &bank()).unwrap();

        assert_eq!(
            messages(&events),
            vec![ServerMessage::GameStarted {
                puzzle_index: 1,
                surface: "surface one".to_string(),
                current_turn: "alice".to_string(),
            }]
        );
        assert!(room.started);
        assert_eq!(room.puzzle_index, Some(1));
        assert_eq!(room.current_turn.as_deref(), Some("alice"));
        assert_eq!(room.question_count, 0);
    }

    #[test]
    fn test_turn_rotates_in_join_order_and_wraps() {
        let mut room = room_with(&["alice", "bob", "carol"]);
        room.select_puzzle("alice", 0, &bank()).unwrap();

        for expected in ["bob", "carol", "alice", "bob"] {
            let asker = room.current_turn.clone().unwrap();
            let events = ask(&mut room, &asker, Verdict::No).unwrap();
            match &events[0].msg {
                ServerMessage::QuestionAnswered { next_turn, .. } => {
                    assert_eq!(next_turn, expected)
                }
                other => panic!("Expected QuestionAnswered, got {:?}", other),
            }
        }
        assert_eq!(room.question_count, 4);
        assert_eq!(room.history.len(), 4);
    }

    #[test]
    fn test_sole_player_keeps_turn() {
        let mut room = room_with(&["alice"]);
        room.select_puzzle("alice", 0, &bank()).unwrap();
        ask(&mut room, "alice", Verdict::Yes).unwrap();
        assert_eq!(room.current_turn.as_deref(), Some("alice"));
    }

    #[test]
    fn test_question_out_of_turn_is_ignored() {
        let mut room = room_with(&["alice", "bob"]);
        assert!(room.begin_question("alice", "anything?", &bank()).is_none());

        room.select_puzzle("alice", 0, &bank()).unwrap();
        assert!(room.begin_question("bob", "my turn?", &bank()).is_none());
        assert!(room.begin_question("alice", "   ", &bank()).is_none());
        assert!(!room.is_judging());
    }

    #[test]
    fn test_second_question_while_judging_is_ignored() {
        let mut room = room_with(&["alice", "bob"]);
        room.select_puzzle("alice", 0, &bank()).unwrap();

        let pending = room.begin_question("alice", "first?", &bank()).unwrap();
        assert!(room.begin_question("alice", "second?", &bank()).is_none());

        room.apply_verdict(&pending, Verdict::No).unwrap();
        assert_eq!(room.history.len(), 1);
    }

    #[test]
    fn test_solved_resets_round_and_readiness() {
        let mut room = room_with(&["alice", "bob"]);
        room.set_ready("alice", true);
        room.set_ready("bob", true);
        room.select_puzzle("alice", 0, &bank()).unwrap();

        let events = ask(&mut room, "alice", Verdict::Solved).unwrap();
        assert_eq!(
            messages(&events),
            vec![ServerMessage::GameOver {
                winner: "alice".to_string(),
                final_question: "Is it a question?".to_string(),
                surface: "surface zero".to_string(),
                solution: "bottom zero".to_string(),
            }]
        );
        assert!(!room.started);
        assert!(room.puzzle_index.is_none());
        assert!(room.players().iter().all(|p| !p.ready));
        assert_eq!(room.snapshot().players, vec!["alice", "bob"]);
    }

    #[test]
    fn test_verdict_discarded_after_new_round() {
        let mut room = room_with(&["alice", "bob"]);
        room.select_puzzle("alice", 0, &bank()).unwrap();
        let pending = room.begin_question("alice", "stale?", &bank()).unwrap();

        room.select_puzzle("alice", 1, &bank()).unwrap();
        assert!(room.apply_verdict(&pending, Verdict::Solved).is_none());
        assert!(room.started);
        assert!(room.history.is_empty());
    }

    #[test]
    fn test_current_turn_holder_leaving_passes_turn() {
        let mut room = room_with(&["alice", "bob", "carol"]);
        room.select_puzzle("alice", 0, &bank()).unwrap();
        ask(&mut room, "alice", Verdict::No).unwrap();
        ask(&mut room, "bob", Verdict::No).unwrap();
        assert_eq!(room.current_turn.as_deref(), Some("carol"));

        // carol was last in order, the turn wraps to alice
        let events = room.leave("carol", Utc::now(), Duration::seconds(60));
        assert!(events.contains(&RoomEvent::to_room(ServerMessage::TurnChanged {
            current_turn: "alice".to_string()
        })));
        assert_eq!(room.current_turn.as_deref(), Some("alice"));
    }

    #[test]
    fn test_asker_leaving_mid_judgment_discards_verdict() {
        let mut room = room_with(&["alice", "bob"]);
        room.select_puzzle("alice", 0, &bank()).unwrap();
        let pending = room.begin_question("alice", "still there?", &bank()).unwrap();

        room.leave("alice", Utc::now(), Duration::seconds(60));
        assert_eq!(room.current_turn.as_deref(), Some("bob"));
        assert!(room.apply_verdict(&pending, Verdict::Solved).is_none());
        assert!(room.started);

        // bob can ask now
        assert!(room.begin_question("bob", "my turn?", &bank()).is_some());
    }

    #[test]
    fn test_other_player_leaving_keeps_order() {
        let mut room = room_with(&["alice", "bob", "carol", "dave"]);
        room.select_puzzle("alice", 0, &bank()).unwrap();
        room.leave("bob", Utc::now(), Duration::seconds(60));

        ask(&mut room, "alice", Verdict::No).unwrap();
        assert_eq!(room.current_turn.as_deref(), Some("carol"));
        ask(&mut room, "carol", Verdict::No).unwrap();
        assert_eq!(room.current_turn.as_deref(), Some("dave"));
    }
}
