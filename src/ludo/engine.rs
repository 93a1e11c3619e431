use super::board;
use super::state::LudoState;
use crate::Millis;
use crate::Seat;
use crate::engine::Command;
use crate::engine::Dice;
use crate::engine::Event;
use crate::engine::Finish;
use crate::engine::Reject;
use crate::engine::Rules;
use crate::engine::Verdict;
use crate::room::RoomMeta;
use serde_json::json;

/// The four-seat race. Sixes start tokens and grant re-rolls, three sixes
/// void the turn, captures grant re-rolls, blocks bar the way, and seats
/// are ranked as they bring all four tokens home. The game ends when only
/// one seat is still racing.
#[derive(Clone)]
pub struct Ludo;

impl Rules for Ludo {
    type State = LudoState;
    const GAME: &'static str = "ludo";
    const SEATS: Seat = 4;

    fn open(&self, meta: &RoomMeta, _dice: &dyn Dice, now: Millis) -> LudoState {
        let alive = (1u8 << meta.count().max(1)) - 1;
        LudoState::fresh(alive, crate::turn_timeout(), now)
    }

    fn evaluate(
        &self,
        room: &str,
        state: &LudoState,
        meta: &RoomMeta,
        command: &Command,
        dice: &dyn Dice,
        now: Millis,
    ) -> Result<Verdict<LudoState>, Reject> {
        let seat = meta
            .seat_of(&command.user)
            .ok_or_else(|| Reject::illegal("not seated in this room"))?;
        if state.over {
            return Err(Reject::illegal("game is over"));
        }
        if command.is("Roll") {
            self.roll(state, seat, dice, now)
        } else if command.is("Move") {
            self.relocate(room, state, meta, seat, command.index("tokenIndex")?, now)
        } else if command.is("Skip") {
            self.skip(state, seat, now)
        } else {
            Err(Reject::illegal(format!("unknown action {}", command.action)))
        }
    }

    fn legal(&self, state: &LudoState, meta: &RoomMeta, user: &str, now: Millis) -> Vec<String> {
        let mut actions = Vec::new();
        if state.over {
            return actions;
        }
        let Some(seat) = meta.seat_of(user) else {
            return actions;
        };
        if seat == state.current {
            if state.rolled == 0 || state.rolled == 6 {
                actions.push(String::from("Roll"));
            }
            if state.rolled != 0 && state.movable != 0 {
                actions.push(String::from("Move"));
            }
            actions.push(String::from("Skip"));
        } else if state.expired(now) {
            actions.push(String::from("Skip"));
        }
        actions
    }

    fn view(&self, state: &LudoState) -> serde_json::Value {
        json!({
            "currentPlayer": state.current,
            "lastRoll": state.rolled,
            "consecutiveSixes": state.sixes,
            "turnId": state.turn_id,
            "turnStartedAt": state.turn_started_at,
            "turnTimeoutSeconds": state.turn_timeout,
            "activeSeats": state.alive,
            "finishedSeats": state.done,
            "movableTokens": state.movable,
            "ranking": state.ranking(),
            "gameOver": state.over,
            "tokens": (0..board::SEATS)
                .map(|seat| (0..board::TOKENS).map(|token| state.token(seat, token)).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
        })
    }

    fn turn_user(&self, state: &LudoState, meta: &RoomMeta) -> Option<String> {
        meta.user_at(state.current).map(String::from)
    }

    fn reseat(&self, state: &mut LudoState, meta: &RoomMeta) {
        state.alive = (1u8 << meta.count().max(1)) - 1;
    }

    /// Deadline enforcement, driven by an external loop: a seat that sat
    /// out its whole turn window is skipped.
    fn tick(
        &self,
        _room: &str,
        state: &LudoState,
        _meta: &RoomMeta,
        now: Millis,
    ) -> Option<Verdict<LudoState>> {
        if !state.expired(now) {
            return None;
        }
        let mut next = state.clone();
        let lagger = next.current;
        next.pass_turn(now);
        log::info!("seat {} timed out, turn passes to {}", lagger, next.current);
        Some(Verdict::next(next.clone()).emit(Event::new("TurnChanged", json!({ "next": next.current }))))
    }
}

impl Ludo {
    fn roll(
        &self,
        state: &LudoState,
        seat: Seat,
        dice: &dyn Dice,
        now: Millis,
    ) -> Result<Verdict<LudoState>, Reject> {
        if seat != state.current {
            return Err(Reject::illegal("not your turn"));
        }
        // a pending six may be re-rolled (that is the granted extra roll);
        // any other pending roll must be moved first
        if state.rolled != 0 && state.rolled != 6 {
            return Err(Reject::illegal("resolve your move first"));
        }
        let value = dice.roll();
        let mut next = state.clone();
        let mut events = vec![Event::new("DiceRolled", json!({ "seat": seat, "value": value }))];
        next.sixes = if value == 6 { next.sixes + 1 } else { 0 };
        if next.sixes >= 3 {
            // three sixes void the turn: no move on the third six
            next.pass_turn(now);
            events.push(Event::new("TurnChanged", json!({ "next": next.current })));
            return Ok(Self::told(next, events));
        }
        let movable = next.movable_with(value);
        if movable == 0 {
            if value == 6 {
                next.another_roll();
            } else {
                next.pass_turn(now);
                events.push(Event::new("TurnChanged", json!({ "next": next.current })));
            }
        } else {
            next.rolled = value;
            next.movable = movable;
        }
        Ok(Self::told(next, events))
    }

    fn relocate(
        &self,
        room: &str,
        state: &LudoState,
        meta: &RoomMeta,
        seat: Seat,
        token: usize,
        now: Millis,
    ) -> Result<Verdict<LudoState>, Reject> {
        if seat != state.current {
            return Err(Reject::illegal("not your turn"));
        }
        if state.rolled == 0 {
            return Err(Reject::illegal("roll first"));
        }
        if token >= board::TOKENS {
            return Err(Reject::invalid("token index out of range"));
        }
        if state.movable & (1u8 << token) == 0 {
            return Err(Reject::illegal("token cannot move"));
        }
        let mut next = state.clone();
        let roll = next.rolled;
        let travel = next.advance(seat, token, roll);
        let mut events = vec![Event::new(
            "TokenMoved",
            json!({ "seat": seat, "token": token, "from": travel.from, "to": travel.to }),
        )];
        if let Some((victim, fallen)) = travel.capture {
            events.push(Event::new(
                "TokenCaptured",
                json!({ "seat": victim, "token": fallen, "by": seat }),
            ));
        }
        if travel.finished {
            events.push(Event::new(
                "TokenFinished",
                json!({ "seat": seat, "token": token }),
            ));
        }
        let mut extra = roll == 6 || travel.capture.is_some();
        if next.swept(seat) && !next.is_done(seat) {
            next.done |= 1 << seat;
            next.rank(seat);
            extra = false;
        }
        let mut finish = None;
        if next.racing().count_ones() <= 1 {
            next.over = true;
            next.rolled = 0;
            next.movable = 0;
            events.push(Event::new("GameEnded", json!({ "ranking": next.ranking() })));
            finish = Some(Self::settle(room, &next, meta));
        } else if extra {
            next.another_roll();
        } else {
            next.pass_turn(now);
            events.push(Event::new("TurnChanged", json!({ "next": next.current })));
        }
        let verdict = Self::told(next, events);
        Ok(match finish {
            Some(finish) => verdict.finish(finish),
            None => verdict,
        })
    }

    fn told(state: LudoState, events: Vec<Event>) -> Verdict<LudoState> {
        events
            .into_iter()
            .fold(Verdict::next(state), |verdict, event| verdict.emit(event))
    }

    fn skip(&self, state: &LudoState, seat: Seat, now: Millis) -> Result<Verdict<LudoState>, Reject> {
        // the current seat may always concede its turn; anyone seated may
        // nudge a room whose turn clock ran out
        if seat != state.current && !state.expired(now) {
            return Err(Reject::illegal("not your turn"));
        }
        let mut next = state.clone();
        next.pass_turn(now);
        Ok(Verdict::next(next.clone())
            .emit(Event::new("TurnChanged", json!({ "next": next.current }))))
    }

    fn settle(room: &str, state: &LudoState, meta: &RoomMeta) -> Finish {
        let ranking = state.ranking();
        let named = |seat: &Seat| meta.user_at(*seat).map(String::from);
        Finish {
            room: room.to_string(),
            game: Self::GAME.to_string(),
            seats: meta.seats.clone(),
            winner: ranking.first().and_then(named),
            entry_fee: meta.entry_fee,
            turn_started_at: state.turn_started_at,
            winners: ranking.iter().filter_map(named).collect(),
        }
    }
}
