use super::board;
use super::state::LudoState;
use crate::Millis;
use crate::Seat;

/// One resolved move: where the token went and what it did on the way.
#[derive(Debug, Clone, Copy)]
pub struct Travel {
    pub from: u8,
    pub to: u8,
    pub capture: Option<(Seat, usize)>,
    pub finished: bool,
}

/// The rules of movement. Everything here is a pure function of the board;
/// dice values arrive as arguments and chance never enters.
impl LudoState {
    /// Tokens of any seat standing on an outer-track square.
    pub fn occupants(&self, square: u8) -> Vec<(Seat, usize)> {
        (0..board::SEATS)
            .flat_map(|seat| (0..board::TOKENS).map(move |token| (seat, token)))
            .filter(|(seat, token)| self.token(*seat, *token) == square)
            .collect()
    }

    /// The seat owning a block (two or more tokens) on a square, if any.
    pub fn block_at(&self, square: u8) -> Option<Seat> {
        (0..board::SEATS).find(|seat| {
            (0..board::TOKENS)
                .filter(|token| self.token(*seat, *token) == square)
                .count()
                >= 2
        })
    }

    /// Whether the current seat may move this token by this roll.
    ///
    /// A based token needs a six. A running token may not overshoot home
    /// and may not traverse an opposing block; landing on one is allowed
    /// (it just captures nothing).
    pub fn can_move(&self, seat: Seat, token: usize, roll: u8) -> bool {
        let pos = self.token(seat, token);
        if pos == board::FINISHED {
            return false;
        }
        if pos == board::BASE {
            return roll == 6;
        }
        let steps = board::travelled(seat, pos);
        if steps + roll > board::LAST_STEP {
            return false;
        }
        for step in (steps + 1)..(steps + roll) {
            if step > 51 {
                break;
            }
            let square = board::stored(seat, step);
            if self.block_at(square).is_some_and(|owner| owner != seat) {
                return false;
            }
        }
        true
    }

    /// Bitmask of the current seat's movable tokens for a roll.
    pub fn movable_with(&self, roll: u8) -> u8 {
        (0..board::TOKENS)
            .filter(|token| self.can_move(self.current, *token, roll))
            .fold(0, |mask, token| mask | (1 << token))
    }

    /// Move a token and resolve the landing: capture a lone opposing token
    /// on an unsafe track square, never on a safe square or a block.
    pub fn advance(&mut self, seat: Seat, token: usize, roll: u8) -> Travel {
        let from = self.token(seat, token);
        let to = match from {
            board::BASE => board::entry(seat),
            from => board::stored(seat, board::travelled(seat, from) + roll),
        };
        self.set_token(seat, token, to);
        let mut capture = None;
        if to >= 1 && to <= board::TRACK && !board::safe(to) {
            let enemies = self
                .occupants(to)
                .into_iter()
                .filter(|(owner, _)| *owner != seat)
                .collect::<Vec<_>>();
            if let [(victim, fallen)] = enemies[..] {
                self.set_token(victim, fallen, board::BASE);
                capture = Some((victim, fallen));
            }
        }
        Travel {
            from,
            to,
            capture,
            finished: to == board::FINISHED,
        }
    }

    /// Next racing seat after the current one, wrapping.
    pub fn next_seat(&self) -> Seat {
        (1..=board::SEATS)
            .map(|offset| (self.current + offset) % board::SEATS)
            .find(|seat| self.racing() & (1 << seat) != 0)
            .unwrap_or(self.current)
    }

    /// Hand the turn to the next seat and restart the turn clock.
    pub fn pass_turn(&mut self, now: Millis) {
        self.current = self.next_seat();
        self.turn_id += 1;
        self.rolled = 0;
        self.sixes = 0;
        self.movable = 0;
        self.turn_started_at = now;
    }

    /// Same seat rolls again within the same turn; the consecutive-six
    /// count survives.
    pub fn another_roll(&mut self) {
        self.rolled = 0;
        self.movable = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board4() -> LudoState {
        LudoState::fresh(0b1111, 30, 0)
    }

    #[test]
    fn based_token_needs_a_six() {
        let state = board4();
        assert!(state.can_move(0, 0, 6) == true);
        assert!(state.can_move(0, 0, 5) == false);
    }

    #[test]
    fn overshoot_is_forbidden() {
        let mut state = board4();
        state.set_token(0, 0, 58); // travelled 57, one step from home
        assert!(state.can_move(0, 0, 1) == true);
        assert!(state.can_move(0, 0, 2) == false);
        state.set_token(0, 1, board::FINISHED);
        assert!(state.can_move(0, 1, 1) == false);
    }

    #[test]
    fn blocks_stop_traversal_but_not_landing() {
        let mut state = board4();
        state.set_token(0, 0, 10);
        state.set_token(1, 0, 12);
        state.set_token(1, 1, 12);
        assert!(state.can_move(0, 0, 3) == false); // would pass through 12
        assert!(state.can_move(0, 0, 2) == true); // lands on the block
        let travel = state.advance(0, 0, 2);
        assert!(travel.to == 12);
        assert!(travel.capture == None);
    }

    #[test]
    fn own_block_does_not_bar_the_way() {
        let mut state = board4();
        state.set_token(0, 0, 10);
        state.set_token(0, 1, 12);
        state.set_token(0, 2, 12);
        assert!(state.can_move(0, 0, 4) == true);
    }

    #[test]
    fn capture_only_lone_enemies_off_safe_squares() {
        let mut state = board4();
        state.set_token(0, 0, 10);
        state.set_token(1, 0, 12);
        let travel = state.advance(0, 0, 2);
        assert!(travel.capture == Some((1, 0)));
        assert!(state.token(1, 0) == board::BASE);
    }

    #[test]
    fn no_capture_on_safe_squares() {
        let mut state = board4();
        state.set_token(0, 0, 7);
        state.set_token(1, 0, 9); // star square
        let travel = state.advance(0, 0, 2);
        assert!(travel.to == 9);
        assert!(travel.capture == None);
        assert!(state.token(1, 0) == 9);
    }

    #[test]
    fn no_capture_when_two_enemies_share_the_square() {
        let mut state = board4();
        state.set_token(0, 0, 10);
        state.set_token(1, 0, 12);
        state.set_token(2, 0, 12);
        let travel = state.advance(0, 0, 2);
        assert!(travel.capture == None);
        assert!(state.token(1, 0) == 12);
        assert!(state.token(2, 0) == 12);
    }

    #[test]
    fn home_column_is_private() {
        let mut state = board4();
        state.set_token(0, 0, 50); // travelled 50
        state.set_token(1, 0, 12);
        state.set_token(1, 1, 12); // enemy block far away
        assert!(state.can_move(0, 0, 6) == true); // 50 -> home column, no track traversal past 51
        let travel = state.advance(0, 0, 6);
        assert!(travel.to == 57); // travelled 56, home column depth 5
    }

    #[test]
    fn finishing_step_lands_home() {
        let mut state = board4();
        state.set_token(0, 0, 58);
        let travel = state.advance(0, 0, 1);
        assert!(travel.to == board::FINISHED);
        assert!(travel.finished == true);
        assert!(state.swept(0) == false);
    }

    #[test]
    fn turn_passes_over_finished_seats() {
        let mut state = board4();
        state.done = 0b0010;
        state.current = 0;
        assert!(state.next_seat() == 2);
        state.current = 3;
        assert!(state.next_seat() == 0);
    }

    #[test]
    fn pass_turn_resets_the_roll_window() {
        let mut state = board4();
        state.rolled = 6;
        state.sixes = 2;
        state.movable = 0b1111;
        state.pass_turn(5_000);
        assert!(state.current == 1);
        assert!(state.turn_id == 2);
        assert!(state.rolled == 0);
        assert!(state.sixes == 0);
        assert!(state.movable == 0);
        assert!(state.turn_started_at == 5_000);
    }
}
