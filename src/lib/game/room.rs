use std::{collections::HashSet, fmt, time::SystemTime};

use chrono::Utc;

use crate::{
    Player, PlayerId,
    api::messages::{GameCommand, GameEvent},
    error::GameError,
    game::{
        GamePhase, MAX_PLAYERS, MAX_ROUNDS, ROUND_SECONDS, RoomResponse, TRANSITION_SECONDS,
        clock::RoundClock,
        guess,
        view::project_for,
        words::{Language, WordPools},
    },
    net::connection::{PlayerEntry, RoomCode},
    results::{QuizAnswer, TestResult},
};

/// The word the describer is currently working on.
#[derive(Clone, Debug, PartialEq)]
pub struct SecretWord {
    pub word: &'static str,
    pub language: Language,
}

/// Sub-state of [`GamePhase::Playing`].
#[derive(Clone, Debug, PartialEq, Default)]
pub enum RoundStage {
    /// A round is running and the clock counts `time_remaining` down.
    #[default]
    Active,
    /// Between two rounds; `countdown` seconds until the next round starts.
    Transition { countdown: u32, words: Vec<String> },
}

/// Rounds 1..=MAX_ROUNDS/2 are English, the rest Spanish.
pub fn round_language(round: u32) -> Language {
    if round <= MAX_ROUNDS / 2 {
        Language::English
    } else {
        Language::Spanish
    }
}

pub struct Room {
    pub code: RoomCode,
    pub phase: GamePhase,
    pub players: Vec<PlayerEntry>,
    pub round: u32,
    pub describer: usize,
    pub secret: Option<SecretWord>,
    pub time_remaining: u32,
    pub team_score: u32,
    pub round_guessed: Vec<String>,
    pub all_guessed: Vec<String>,
    pub stage: RoundStage,
    pub replay_votes: HashSet<PlayerId>,
    pub quiz_submitted: HashSet<PlayerId>,
    pub pools: WordPools,
    pub clock: RoundClock,
    pub last_activity: SystemTime,
}

impl fmt::Debug for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Room")
            .field("code", &self.code)
            .field("phase", &self.phase)
            .field("players", &self.players)
            .field("round", &self.round)
            .field("describer", &self.describer)
            .field("stage", &self.stage)
            .field("time remaining", &self.time_remaining)
            .field("team score", &self.team_score)
            .field("clock", &self.clock)
            .finish()
    }
}

impl Room {
    pub fn new(code: RoomCode, host: PlayerEntry) -> Self {
        Self {
            code,
            phase: GamePhase::default(),
            players: vec![host],
            round: 0,
            describer: 0,
            secret: None,
            time_remaining: ROUND_SECONDS,
            team_score: 0,
            round_guessed: Vec::new(),
            all_guessed: Vec::new(),
            stage: RoundStage::default(),
            replay_votes: HashSet::new(),
            quiz_submitted: HashSet::new(),
            pools: WordPools::new(),
            clock: RoundClock::default(),
            last_activity: SystemTime::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = SystemTime::now();
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }

    pub fn has_player(&self, player_id: PlayerId) -> bool {
        self.players.iter().any(|p| p.player.id == player_id)
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players
            .iter()
            .map(|e| &e.player)
            .find(|p| p.id == player_id)
    }

    /// The current describer, only defined while a game is being played.
    pub fn describer(&self) -> Option<&Player> {
        if self.phase != GamePhase::Playing {
            return None;
        }
        self.players.get(self.describer).map(|e| &e.player)
    }

    pub fn is_describer(&self, player_id: PlayerId) -> bool {
        self.describer().is_some_and(|p| p.id == player_id)
    }

    pub fn in_transition(&self) -> bool {
        matches!(self.stage, RoundStage::Transition { .. })
    }

    pub fn build_all_views(&self) -> RoomResponse {
        let mut response = RoomResponse::new();
        for entry in &self.players {
            let pid = entry.player.id;
            response
                .messages_to_specific
                .push((pid, GameEvent::StateUpdate(project_for(self, pid))));
        }
        response
    }

    pub fn add_player(&mut self, entry: PlayerEntry) -> Result<RoomResponse, GameError> {
        if self.is_full() {
            return Err(GameError::RoomFull(self.code.clone()));
        }
        if self.phase != GamePhase::Waiting {
            return Err(GameError::invalid_phase("join", self.phase));
        }

        let pid = entry.player.id;
        tracing::info!(
            room_code = %self.code,
            player_id = %pid,
            player_name = %entry.player.name,
            "Player joined"
        );
        self.players.push(entry);
        self.touch();

        let joined = GameEvent::SessionJoined {
            session_id: self.code.clone(),
            player_id: pid,
        };
        Ok(RoomResponse::to_player(pid, joined).merge(self.build_all_views()))
    }

    pub fn handle_command(
        &mut self,
        cmd: &GameCommand,
        sender_id: PlayerId,
    ) -> Result<RoomResponse, GameError> {
        if !self.has_player(sender_id) {
            return Err(GameError::NotAuthorized);
        }
        self.touch();

        match cmd {
            GameCommand::Start => {
                if self.phase != GamePhase::Waiting {
                    return Err(GameError::invalid_phase(cmd.action(), self.phase));
                }
                self.start()
            }
            GameCommand::SubmitGuess { text } => self.submit_guess(sender_id, text),
            GameCommand::Skip => self.skip(),
            GameCommand::VoteReplay => self.vote_play_again(sender_id),
            GameCommand::SubmitQuiz {
                answers,
                native_language,
            } => self.submit_quiz(sender_id, answers, native_language),
        }
    }

    /// Starts a new game. Used both by the `start` command and by a unanimous replay vote.
    pub fn start(&mut self) -> Result<RoomResponse, GameError> {
        if self.phase == GamePhase::Playing {
            return Err(GameError::invalid_phase("start", self.phase));
        }
        if self.players.len() < MAX_PLAYERS {
            return Err(GameError::NotEnoughPlayers);
        }

        self.phase = GamePhase::Playing;
        self.round = 1;
        self.describer = 0;
        self.team_score = 0;
        self.all_guessed.clear();
        self.replay_votes.clear();
        self.quiz_submitted.clear();

        tracing::info!(room_code = %self.code, "Game started");
        Ok(self.begin_round())
    }

    fn begin_round(&mut self) -> RoomResponse {
        self.time_remaining = ROUND_SECONDS;
        self.round_guessed.clear();
        self.stage = RoundStage::Active;
        self.draw_secret();
        self.clock.start();

        tracing::info!(
            room_code = %self.code,
            round = self.round,
            language = %round_language(self.round),
            describer = ?self.describer().map(|p| &p.name),
            "Round started"
        );
        self.build_all_views()
    }

    fn draw_secret(&mut self) {
        let language = round_language(self.round);
        let word = self.pools.draw(language);
        self.secret = Some(SecretWord { word, language });
    }

    fn require_active_round(&self, action: &'static str) -> Result<(), GameError> {
        if self.phase != GamePhase::Playing {
            return Err(GameError::invalid_phase(action, self.phase));
        }
        if self.in_transition() {
            return Err(GameError::BetweenRounds { action });
        }
        Ok(())
    }

    /// One second of game time. Driven by the room's clock.
    pub fn tick(&mut self) -> RoomResponse {
        if self.phase != GamePhase::Playing {
            return RoomResponse::new();
        }
        if !self.in_transition() {
            return self.tick_round();
        }

        let remaining = match &mut self.stage {
            RoundStage::Transition { countdown, .. } => {
                *countdown = countdown.saturating_sub(1);
                *countdown
            }
            RoundStage::Active => return RoomResponse::new(),
        };

        if remaining > 0 {
            self.transition_notice()
        } else {
            tracing::debug!(room_code = %self.code, round = self.round, "Round transition ended");
            RoomResponse::broadcast(GameEvent::RoundTransitionEnded).merge(self.begin_round())
        }
    }

    fn tick_round(&mut self) -> RoomResponse {
        self.time_remaining = self.time_remaining.saturating_sub(1);
        let tick = RoomResponse::broadcast(GameEvent::TimerTick {
            seconds_left: self.time_remaining,
        });
        if self.time_remaining == 0 {
            tick.merge(self.end_round())
        } else {
            tick
        }
    }

    fn end_round(&mut self) -> RoomResponse {
        let words = self.round_guessed.clone();
        self.describer = (self.describer + 1) % self.players.len().max(1);
        self.secret = None;

        tracing::info!(
            room_code = %self.code,
            round = self.round,
            guessed = words.len(),
            team_score = self.team_score,
            "Round ended"
        );

        if self.round < MAX_ROUNDS {
            self.round += 1;
            self.stage = RoundStage::Transition {
                countdown: TRANSITION_SECONDS,
                words,
            };
            self.transition_notice().merge(self.build_all_views())
        } else {
            self.clock.stop();
            self.stage = RoundStage::Active;
            self.phase = GamePhase::Finished;
            tracing::info!(
                room_code = %self.code,
                team_score = self.team_score,
                words = self.all_guessed.len(),
                "Game finished"
            );
            self.build_all_views()
        }
    }

    fn transition_notice(&self) -> RoomResponse {
        let RoundStage::Transition { countdown, words } = &self.stage else {
            return RoomResponse::new();
        };
        let next_describer = self
            .players
            .get(self.describer)
            .map(|e| e.player.name.clone())
            .unwrap_or_default();

        RoomResponse::broadcast(GameEvent::RoundTransition {
            next_describer,
            countdown: *countdown,
            words_this_round: words.clone(),
        })
    }

    pub fn submit_guess(
        &mut self,
        player_id: PlayerId,
        text: &str,
    ) -> Result<RoomResponse, GameError> {
        self.require_active_round("guess")?;
        if self.is_describer(player_id) {
            return Err(GameError::DescriberCannotGuess);
        }
        let Some(secret) = &self.secret else {
            return Err(GameError::BetweenRounds { action: "guess" });
        };

        if !guess::matches(text, secret.word) {
            tracing::debug!(room_code = %self.code, player_id = %player_id, "Wrong guess");
            return Ok(RoomResponse::to_player(
                player_id,
                GameEvent::GuessResult { correct: false },
            ));
        }

        let word = secret.word.to_string();
        self.team_score += 1;
        if !self.all_guessed.contains(&word) {
            self.all_guessed.push(word.clone());
        }
        self.round_guessed.push(word);
        self.draw_secret();

        tracing::info!(
            room_code = %self.code,
            player_id = %player_id,
            team_score = self.team_score,
            "Word guessed"
        );

        Ok(
            RoomResponse::to_player(player_id, GameEvent::GuessResult { correct: true })
                .merge(self.build_all_views()),
        )
    }

    pub fn skip(&mut self) -> Result<RoomResponse, GameError> {
        self.require_active_round("skip")?;
        let skipped = self.secret.as_ref().map(|s| s.word);
        self.draw_secret();
        tracing::debug!(room_code = %self.code, ?skipped, "Word skipped");
        Ok(self.build_all_views())
    }

    pub fn vote_play_again(&mut self, player_id: PlayerId) -> Result<RoomResponse, GameError> {
        if self.phase != GamePhase::Finished {
            return Err(GameError::invalid_phase("vote to play again", self.phase));
        }
        self.replay_votes.insert(player_id);
        let votes = self.replay_votes.len();
        let needed = MAX_PLAYERS.saturating_sub(votes);

        tracing::info!(
            room_code = %self.code,
            player_id = %player_id,
            votes,
            needed,
            "Replay vote"
        );
        let tally = RoomResponse::broadcast(GameEvent::ReplayVotes { votes, needed });

        let unanimous = self.is_full()
            && self
                .players
                .iter()
                .all(|p| self.replay_votes.contains(&p.player.id));
        if !unanimous {
            return Ok(tally);
        }

        self.replay_votes.clear();
        Ok(tally.merge(self.start()?))
    }

    pub fn submit_quiz(
        &mut self,
        player_id: PlayerId,
        answers: &[QuizAnswer],
        native_language: &str,
    ) -> Result<RoomResponse, GameError> {
        if self.phase != GamePhase::Finished {
            return Err(GameError::invalid_phase("submit the quiz", self.phase));
        }
        let player_name = self
            .player(player_id)
            .map(|p| p.name.clone())
            .ok_or(GameError::NotAuthorized)?;
        if !self.quiz_submitted.insert(player_id) {
            return Err(GameError::QuizAlreadySubmitted);
        }

        let record = TestResult {
            player_name,
            session_id: self.code.to_string(),
            language: native_language.to_string(),
            answers: answers.to_vec(),
            score: self.team_score,
            timestamp: Utc::now(),
        };
        tracing::info!(
            room_code = %self.code,
            player_id = %player_id,
            answers = answers.len(),
            "Quiz submitted"
        );

        Ok(RoomResponse::to_player(player_id, GameEvent::QuizAccepted)
            .merge(RoomResponse::with_result(record)))
    }

    /// Removes a player. The caller destroys the room once it is empty.
    pub fn remove_player(&mut self, player_id: PlayerId) -> RoomResponse {
        let Some(idx) = self.players.iter().position(|p| p.player.id == player_id) else {
            return RoomResponse::new();
        };
        let entry = self.players.remove(idx);
        self.replay_votes.remove(&player_id);

        tracing::info!(
            room_code = %self.code,
            player_id = %player_id,
            player_name = %entry.player.name,
            "Player left"
        );

        if self.players.is_empty() {
            self.clock.stop();
            return RoomResponse::new();
        }

        // A lone player can neither play nor replay; reopen the seat.
        if self.phase != GamePhase::Waiting {
            self.reset_to_waiting();
        }
        self.describer = 0;

        RoomResponse::broadcast(GameEvent::PlayerLeft {
            name: entry.player.name,
        })
        .merge(self.build_all_views())
    }

    fn reset_to_waiting(&mut self) {
        self.clock.stop();
        self.phase = GamePhase::Waiting;
        self.round = 0;
        self.describer = 0;
        self.secret = None;
        self.time_remaining = ROUND_SECONDS;
        self.team_score = 0;
        self.round_guessed.clear();
        self.all_guessed.clear();
        self.stage = RoundStage::Active;
        self.replay_votes.clear();
        tracing::info!(room_code = %self.code, "Game reset, waiting for a second player");
    }
}

#[cfg(test)]
mod tests {
    use tokio_mpmc::channel;

    use super::*;
    use crate::{game::view::HIDDEN_WORD, net::connection::ConnectionId};

    fn entry(name: &str) -> PlayerEntry {
        let (tx, _rx) = channel(10);
        PlayerEntry::new(Player::new(ConnectionId::generate(), name.to_string()), tx)
    }

    fn create_test_room() -> (Room, PlayerId, PlayerId) {
        let host = entry("Ana");
        let host_id = host.player.id;
        let mut room = Room::new(RoomCode::from("ABC123"), host);
        let guest = entry("Ben");
        let guest_id = guest.player.id;
        room.add_player(guest).expect("second seat is free");
        (room, host_id, guest_id)
    }

    fn started_room() -> (Room, PlayerId, PlayerId) {
        let (mut room, host, guest) = create_test_room();
        room.handle_command(&GameCommand::Start, host)
            .expect("game starts");
        (room, host, guest)
    }

    fn secret(room: &Room) -> &'static str {
        room.secret.as_ref().expect("round has a secret").word
    }

    fn view_for(response: &RoomResponse, pid: PlayerId) -> Option<&crate::game::view::PlayerView> {
        response.events_for(pid).into_iter().find_map(|e| match e {
            GameEvent::StateUpdate(view) => Some(view),
            _ => None,
        })
    }

    /// Ticks until the running round expires; returns every response produced.
    fn expire_round(room: &mut Room) -> Vec<RoomResponse> {
        let mut responses = Vec::new();
        while room.phase == GamePhase::Playing && !room.in_transition() {
            responses.push(room.tick());
        }
        responses
    }

    fn finish_transition(room: &mut Room) -> Vec<RoomResponse> {
        let mut responses = Vec::new();
        while room.in_transition() {
            responses.push(room.tick());
        }
        responses
    }

    #[test]
    fn test_start_requires_two_players() {
        let host = entry("Solo");
        let host_id = host.player.id;
        let mut room = Room::new(RoomCode::from("SOLO11"), host);

        let result = room.handle_command(&GameCommand::Start, host_id);

        assert_eq!(result.err(), Some(GameError::NotEnoughPlayers));
        assert_eq!(room.phase, GamePhase::Waiting);
        assert_eq!(room.round, 0);
        assert!(!room.clock.is_running());
    }

    #[test]
    fn test_start_and_correct_guess_scenario() {
        let (mut room, host, guest) = create_test_room();
        let response = room
            .handle_command(&GameCommand::Start, host)
            .expect("game starts");

        assert_eq!(room.phase, GamePhase::Playing);
        assert_eq!(room.round, 1);
        assert_eq!(room.describer, 0);
        assert_eq!(room.time_remaining, ROUND_SECONDS);
        assert!(room.clock.is_running());

        let word = secret(&room);
        let host_view = view_for(&response, host).expect("host gets a view");
        let guest_view = view_for(&response, guest).expect("guest gets a view");
        assert_eq!(host_view.secret_word.as_deref(), Some(word));
        assert_eq!(guest_view.secret_word.as_deref(), Some(HIDDEN_WORD));

        let shouted = format!("  {}  ", word.to_uppercase());
        let response = room
            .handle_command(&GameCommand::SubmitGuess { text: shouted }, guest)
            .expect("guess accepted");

        assert_eq!(room.team_score, 1);
        assert_eq!(room.all_guessed, vec![word.to_string()]);
        assert_eq!(room.round_guessed, vec![word.to_string()]);
        assert_eq!(room.time_remaining, ROUND_SECONDS, "timer is not reset");
        assert_eq!(room.round, 1);
        assert_eq!(room.pools.pool(Language::English).used().len(), 2);

        let guest_events = response.events_for(guest);
        assert_eq!(guest_events[0], &GameEvent::GuessResult { correct: true });
        assert!(
            !response
                .events_for(host)
                .iter()
                .any(|e| matches!(e, GameEvent::GuessResult { .. })),
            "guess result is unicast to the guesser"
        );
        assert!(view_for(&response, host).is_some());
        assert!(view_for(&response, guest).is_some());
    }

    #[test]
    fn test_wrong_guess_only_answers_the_guesser() {
        let (mut room, _host, guest) = started_room();
        let word = secret(&room);

        let response = room
            .handle_command(
                &GameCommand::SubmitGuess {
                    text: "definitely not it".to_string(),
                },
                guest,
            )
            .expect("guess handled");

        assert!(response.messages_to_players.is_empty());
        assert_eq!(
            response.messages_to_specific,
            vec![(guest, GameEvent::GuessResult { correct: false })]
        );
        assert_eq!(room.team_score, 0);
        assert_eq!(secret(&room), word);
    }

    #[test]
    fn test_describer_cannot_guess() {
        let (mut room, host, _guest) = started_room();
        let word = secret(&room).to_string();

        let result = room.handle_command(&GameCommand::SubmitGuess { text: word }, host);

        assert_eq!(result.err(), Some(GameError::DescriberCannotGuess));
        assert_eq!(room.team_score, 0);
    }

    #[test]
    fn test_skip_draws_a_new_word_without_scoring() {
        let (mut room, host, _guest) = started_room();
        let before = secret(&room);

        room.handle_command(&GameCommand::Skip, host)
            .expect("skip accepted");

        assert_ne!(secret(&room), before);
        assert_eq!(room.team_score, 0);
        assert!(room.all_guessed.is_empty());
        assert!(room.round_guessed.is_empty());
    }

    #[test]
    fn test_team_score_counts_correct_guesses() {
        let (mut room, _host, guest) = started_room();
        let mut correct = 0;
        for i in 0..12 {
            let text = if i % 3 == 0 {
                "nope".to_string()
            } else {
                secret(&room).to_string()
            };
            let response = room
                .handle_command(&GameCommand::SubmitGuess { text }, guest)
                .expect("guess handled");
            if response
                .events_for(guest)
                .contains(&&GameEvent::GuessResult { correct: true })
            {
                correct += 1;
            }
        }
        assert_eq!(room.team_score, correct);
        assert_eq!(room.all_guessed.len() as u32, correct);
    }

    #[test]
    fn test_round_transition_countdown() {
        let (mut room, host, guest) = started_room();
        room.round = 3;
        room.time_remaining = 1;
        room.round_guessed = vec!["pizza".to_string()];

        let expiry = room.tick();
        assert_eq!(room.describer, 1, "describer rotates");
        assert_eq!(room.round, 4);
        assert!(room.in_transition());
        assert_eq!(room.secret, None);
        assert!(expiry.messages_to_players.contains(&GameEvent::TimerTick { seconds_left: 0 }));

        let mut countdowns = Vec::new();
        let mut ended = 0;
        for response in std::iter::once(expiry).chain(finish_transition(&mut room)) {
            for event in &response.messages_to_players {
                match event {
                    GameEvent::RoundTransition {
                        next_describer,
                        countdown,
                        words_this_round,
                    } => {
                        assert_eq!(next_describer, "Ben");
                        assert_eq!(words_this_round, &vec!["pizza".to_string()]);
                        countdowns.push(*countdown);
                    }
                    GameEvent::RoundTransitionEnded => ended += 1,
                    _ => {}
                }
            }
        }

        assert_eq!(countdowns, (1..=10).rev().collect::<Vec<_>>());
        assert_eq!(ended, 1);
        assert_eq!(room.round, 4);
        assert_eq!(room.time_remaining, ROUND_SECONDS);
        assert!(room.round_guessed.is_empty());
        assert!(room.secret.is_some());
        assert!(room.is_describer(guest));
        assert!(!room.is_describer(host));
    }

    #[test]
    fn test_full_game_language_split_and_finish() {
        let (mut room, _host, _guest) = started_room();
        let mut languages = Vec::new();

        loop {
            languages.push((room.round, room.secret.as_ref().map(|s| s.language)));
            expire_round(&mut room);
            if room.phase == GamePhase::Finished {
                break;
            }
            assert!(room.round <= MAX_ROUNDS);
            finish_transition(&mut room);
        }

        let expected: Vec<_> = (1..=MAX_ROUNDS)
            .map(|r| {
                let lang = if r <= 4 {
                    Language::English
                } else {
                    Language::Spanish
                };
                (r, Some(lang))
            })
            .collect();
        assert_eq!(languages, expected);
        assert_eq!(room.round, MAX_ROUNDS);
        assert_eq!(room.phase, GamePhase::Finished);
        assert!(!room.clock.is_running());
        assert!(room.tick().is_empty(), "no ticks after the game is over");
    }

    #[test]
    fn test_join_rejections() {
        let (mut room, host, _guest) = create_test_room();
        assert_eq!(
            room.add_player(entry("Cleo")).err(),
            Some(GameError::RoomFull(RoomCode::from("ABC123")))
        );

        room.handle_command(&GameCommand::Start, host)
            .expect("game starts");
        room.players.pop();
        assert!(matches!(
            room.add_player(entry("Cleo")),
            Err(GameError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn test_commands_rejected_outside_their_phase() {
        struct TestCase {
            name: &'static str,
            setup: fn(&mut Room),
            command: GameCommand,
            guest_sends: bool,
        }

        let test_cases = vec![
            TestCase {
                name: "guess while waiting",
                setup: |_| {},
                command: GameCommand::SubmitGuess {
                    text: "pizza".to_string(),
                },
                guest_sends: true,
            },
            TestCase {
                name: "skip while waiting",
                setup: |_| {},
                command: GameCommand::Skip,
                guest_sends: false,
            },
            TestCase {
                name: "vote while playing",
                setup: |room| {
                    room.start().expect("game starts");
                },
                command: GameCommand::VoteReplay,
                guest_sends: true,
            },
            TestCase {
                name: "start while playing",
                setup: |room| {
                    room.start().expect("game starts");
                },
                command: GameCommand::Start,
                guest_sends: false,
            },
            TestCase {
                name: "start while finished",
                setup: |room| {
                    room.phase = GamePhase::Finished;
                },
                command: GameCommand::Start,
                guest_sends: false,
            },
            TestCase {
                name: "quiz while playing",
                setup: |room| {
                    room.start().expect("game starts");
                },
                command: GameCommand::SubmitQuiz {
                    answers: vec![],
                    native_language: "en".to_string(),
                },
                guest_sends: true,
            },
        ];

        for tc in test_cases {
            let (mut room, host, guest) = create_test_room();
            (tc.setup)(&mut room);
            let phase = room.phase;
            let sender = if tc.guest_sends { guest } else { host };

            let result = room.handle_command(&tc.command, sender);

            assert!(
                matches!(result, Err(GameError::InvalidPhase { .. })),
                "Test case failed: {}",
                tc.name
            );
            assert_eq!(room.phase, phase, "Test case changed phase: {}", tc.name);
        }
    }

    #[test]
    fn test_guess_between_rounds_is_rejected() {
        let (mut room, _host, guest) = started_room();
        expire_round(&mut room);
        assert!(room.in_transition());

        let result = room.handle_command(
            &GameCommand::SubmitGuess {
                text: "pizza".to_string(),
            },
            guest,
        );

        assert_eq!(result.err(), Some(GameError::BetweenRounds { action: "guess" }));
        assert_eq!(room.team_score, 0);
    }

    #[test]
    fn test_non_member_is_not_authorized() {
        let (mut room, _host, _guest) = started_room();
        let result = room.handle_command(&GameCommand::Skip, ConnectionId::generate());
        assert_eq!(result.err(), Some(GameError::NotAuthorized));
    }

    #[test]
    fn test_replay_vote_restarts_and_keeps_pools() {
        let (mut room, host, guest) = started_room();
        let guessed = secret(&room).to_string();
        room.handle_command(&GameCommand::SubmitGuess { text: guessed }, guest)
            .expect("guess accepted");
        room.round = MAX_ROUNDS;
        expire_round(&mut room);
        assert_eq!(room.phase, GamePhase::Finished);
        let used_before = room.pools.pool(Language::English).used().len();
        assert_eq!(used_before, 2);

        let first = room
            .handle_command(&GameCommand::VoteReplay, host)
            .expect("vote accepted");
        assert_eq!(
            first.messages_to_players,
            vec![GameEvent::ReplayVotes { votes: 1, needed: 1 }]
        );
        assert_eq!(room.phase, GamePhase::Finished);

        room.handle_command(&GameCommand::VoteReplay, guest)
            .expect("vote accepted");
        assert_eq!(room.phase, GamePhase::Playing);
        assert_eq!(room.round, 1);
        assert_eq!(room.describer, 0);
        assert_eq!(room.team_score, 0);
        assert!(room.all_guessed.is_empty());
        assert!(room.replay_votes.is_empty());
        assert_eq!(
            room.pools.pool(Language::English).used().len(),
            used_before + 1,
            "pools persist across games"
        );
    }

    #[test]
    fn test_departure_mid_game_resets_to_waiting() {
        let (mut room, host, guest) = started_room();
        let word = secret(&room).to_string();
        room.handle_command(&GameCommand::SubmitGuess { text: word }, guest)
            .expect("guess accepted");

        let response = room.remove_player(host);

        assert_eq!(room.players.len(), 1);
        assert_eq!(room.phase, GamePhase::Waiting);
        assert_eq!(room.round, 0);
        assert_eq!(room.team_score, 0);
        assert!(room.all_guessed.is_empty());
        assert_eq!(room.secret, None);
        assert!(!room.clock.is_running());
        assert!(
            response
                .messages_to_players
                .contains(&GameEvent::PlayerLeft { name: "Ana".to_string() })
        );
        assert!(view_for(&response, guest).is_some());

        assert!(room.add_player(entry("Cleo")).is_ok(), "seat is free again");
    }

    #[test]
    fn test_departure_after_finish_reopens_room() {
        let (mut room, host, guest) = started_room();
        room.round = MAX_ROUNDS;
        expire_round(&mut room);
        assert_eq!(room.phase, GamePhase::Finished);
        room.handle_command(&GameCommand::VoteReplay, host)
            .expect("vote accepted");

        let response = room.remove_player(guest);

        assert_eq!(room.phase, GamePhase::Waiting);
        assert!(room.replay_votes.is_empty());
        assert!(!room.clock.is_running());
        assert!(view_for(&response, host).is_some_and(|v| v.phase == GamePhase::Waiting));

        room.add_player(entry("Cleo")).expect("seat is free again");
        room.handle_command(&GameCommand::Start, host)
            .expect("new partner can start a game");
        assert_eq!(room.phase, GamePhase::Playing);
    }

    #[test]
    fn test_last_departure_empties_room() {
        let (mut room, host, guest) = started_room();
        room.remove_player(guest);
        let response = room.remove_player(host);
        assert!(room.players.is_empty());
        assert!(response.is_empty());
        assert!(!room.clock.is_running());
    }

    #[test]
    fn test_quiz_submission() {
        let (mut room, host, _guest) = started_room();
        room.team_score = 5;
        room.phase = GamePhase::Finished;
        let answers = vec![QuizAnswer {
            word: "perro".to_string(),
            answer: "dog".to_string(),
        }];
        let cmd = GameCommand::SubmitQuiz {
            answers: answers.clone(),
            native_language: "en".to_string(),
        };

        let response = room.handle_command(&cmd, host).expect("quiz accepted");

        assert_eq!(response.messages_to_specific, vec![(host, GameEvent::QuizAccepted)]);
        assert_eq!(response.results.len(), 1);
        let record = &response.results[0];
        assert_eq!(record.player_name, "Ana");
        assert_eq!(record.session_id, "ABC123");
        assert_eq!(record.language, "en");
        assert_eq!(record.score, 5);
        assert_eq!(record.answers, answers);

        assert_eq!(
            room.handle_command(&cmd, host).err(),
            Some(GameError::QuizAlreadySubmitted)
        );
    }

    #[test]
    fn test_round_language_split() {
        for round in 1..=4 {
            assert_eq!(round_language(round), Language::English);
        }
        for round in 5..=8 {
            assert_eq!(round_language(round), Language::Spanish);
        }
    }
}
