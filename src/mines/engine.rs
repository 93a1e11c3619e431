use super::payout;
use super::state::MineState;
use super::state::Status;
use super::state::MAX_TILES;
use super::state::MIN_TILES;
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

/// The risk/reveal game: a board of hidden tiles, some mined. Every safe
/// reveal compounds the pot; one mine ends the round with nothing; cashing
/// out banks the pot and emits the `Transaction` the ledger settles from.
/// Single-seat is the canonical shipped variant.
#[derive(Clone)]
pub struct Mines;

impl Rules for Mines {
    type State = MineState;
    const GAME: &'static str = "mines";
    const SEATS: Seat = 1;

    /// Clamp the board options and place mines with a partial Fisher-Yates
    /// over a stack index buffer: O(mines) swaps, uniform over subsets.
    fn open(&self, meta: &RoomMeta, dice: &dyn Dice, _now: Millis) -> MineState {
        let tiles = meta.option("TotalTiles", 25, MIN_TILES as i64, MAX_TILES as i64) as u8;
        let mine_count = meta.option("TotalMines", 5, 1, tiles as i64 - 1) as u8;
        let mut state = MineState {
            mines: [0, 0],
            revealed: [0, 0],
            current: 0,
            tiles,
            mine_count,
            status: Status::Active,
            dead: 0,
            safe_revealed: 0,
            entry_cost: meta.entry_fee.min(u32::MAX as u64) as u32,
            edge: payout::HOUSE_EDGE,
            winnings: 0,
            jackpot: 0,
        };
        let mut index = [0u8; MAX_TILES as usize];
        for (slot, tile) in index.iter_mut().enumerate().take(tiles as usize) {
            *tile = slot as u8;
        }
        let mut remaining = tiles as usize;
        for _ in 0..mine_count {
            let chosen = dice.pick(remaining);
            state.lay_mine(index[chosen]);
            index[chosen] = index[remaining - 1];
            remaining -= 1;
        }
        state
    }

    fn evaluate(
        &self,
        room: &str,
        state: &MineState,
        meta: &RoomMeta,
        command: &Command,
        _dice: &dyn Dice,
        _now: Millis,
    ) -> Result<Verdict<MineState>, Reject> {
        if meta.seat_of(&command.user).is_none() {
            return Err(Reject::illegal("not seated in this room"));
        }
        if command.is("Click") || command.is("Reveal") {
            self.click(room, state, meta, command.index("tileIndex")?)
        } else if command.is("Cashout") || command.is("CashOut") {
            self.cashout(room, state, meta, &command.user)
        } else {
            Err(Reject::illegal(format!("unknown action {}", command.action)))
        }
    }

    fn legal(&self, state: &MineState, meta: &RoomMeta, user: &str, _now: Millis) -> Vec<String> {
        let mut actions = Vec::new();
        if meta.seat_of(user).is_none() || state.status != Status::Active {
            return actions;
        }
        actions.push(String::from("Click"));
        if state.safe_revealed > 0 {
            actions.push(String::from("Cashout"));
        }
        actions
    }

    /// Mines stay hidden while the round is live; after it ends the board
    /// is disclosed so clients can paint the post-mortem.
    fn view(&self, state: &MineState) -> serde_json::Value {
        json!({
            "totalTiles": state.tiles,
            "totalMines": state.mine_count,
            "revealed": state.seen_tiles(),
            "mines": match state.status {
                Status::Active => Vec::new(),
                _ => state.mine_tiles(),
            },
            "revealedSafe": state.safe_revealed,
            "entryCost": state.entry_cost,
            "currentWinnings": state.winnings,
            "nextTileWinnings": payout::preview(
                state.entry_cost,
                state.tiles,
                state.mine_count,
                state.safe_revealed,
                state.edge,
            ),
            "status": match state.status {
                Status::Active => "Active",
                Status::HitMine => "HitMine",
                Status::CashedOut => "CashedOut",
            },
            "jackpotRounds": state.jackpot,
        })
    }

    fn turn_user(&self, state: &MineState, meta: &RoomMeta) -> Option<String> {
        meta.user_at(state.current).map(String::from)
    }
}

impl Mines {
    fn click(
        &self,
        room: &str,
        state: &MineState,
        meta: &RoomMeta,
        tile: usize,
    ) -> Result<Verdict<MineState>, Reject> {
        if state.status != Status::Active {
            return Err(Reject::illegal("round is over"));
        }
        if tile >= state.tiles as usize {
            return Err(Reject::invalid("tile index out of range"));
        }
        let tile = tile as u8;
        if state.seen(tile) {
            return Err(Reject::illegal("tile already revealed"));
        }
        let mut next = state.clone();
        next.reveal(tile);
        if next.mined(tile) {
            next.status = Status::HitMine;
            next.winnings = 0;
            next.jackpot += 1;
            return Ok(Verdict::next(next.clone())
                .emit(Event::new("HitMine", json!({ "tile": tile })))
                .emit(Event::new("GameOver", json!({ "result": "Lost", "final": 0 })))
                .finish(Self::settle(room, &next, meta, None)));
        }
        next.safe_revealed += 1;
        next.winnings = payout::winnings(
            next.entry_cost,
            next.tiles,
            next.mine_count,
            next.safe_revealed,
            next.edge,
        );
        let preview = payout::preview(
            next.entry_cost,
            next.tiles,
            next.mine_count,
            next.safe_revealed,
            next.edge,
        );
        Ok(Verdict::next(next.clone()).emit(Event::new(
            "TileSafe",
            json!({
                "tile": tile,
                "count": next.safe_revealed,
                "current": next.winnings,
                "next": preview,
            }),
        )))
    }

    fn cashout(
        &self,
        room: &str,
        state: &MineState,
        meta: &RoomMeta,
        user: &str,
    ) -> Result<Verdict<MineState>, Reject> {
        if state.status != Status::Active {
            return Err(Reject::illegal("round is over"));
        }
        if state.safe_revealed == 0 {
            return Err(Reject::illegal("nothing to cash out"));
        }
        let mut next = state.clone();
        next.status = Status::CashedOut;
        next.jackpot += 1;
        let winnings = next.winnings;
        Ok(Verdict::next(next.clone())
            .emit(Event::new("CashedOut", json!({ "winnings": winnings })))
            .emit(Event::new("GameOver", json!({ "result": "Won", "final": winnings })))
            .emit(Event::new("Transaction", json!({ "amount": winnings })))
            .finish(Self::settle(room, &next, meta, Some(user.to_string()))))
    }

    fn settle(room: &str, state: &MineState, meta: &RoomMeta, winner: Option<String>) -> Finish {
        Finish {
            room: room.to_string(),
            game: Self::GAME.to_string(),
            seats: meta.seats.clone(),
            winner: winner.clone(),
            entry_fee: meta.entry_fee,
            turn_started_at: 0,
            winners: winner.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Fair;
    use crate::engine::Loaded;

    fn solo(tiles: u32, mines: u32, fee: u64) -> RoomMeta {
        let mut meta = RoomMeta::open("mines", 1);
        meta.sit("alice").unwrap();
        meta.entry_fee = fee;
        meta.config
            .insert(String::from("TotalTiles"), tiles.to_string());
        meta.config
            .insert(String::from("TotalMines"), mines.to_string());
        meta
    }

    fn click(tile: u8) -> Command {
        Command::new("alice", "Click").with(json!({ "tileIndex": tile }))
    }

    #[test]
    fn placement_matches_the_requested_board() {
        let meta = solo(25, 5, 100);
        let state = Mines.open(&meta, &Fair, 0);
        assert!(state.tiles == 25);
        assert!(state.mine_count == 5);
        assert!(state.mines_laid() == 5);
        assert!(state.mine_tiles().iter().all(|tile| *tile < 25));
        assert!(state.status == Status::Active);
        assert!(state.safe_revealed == 0);
        assert!(state.winnings == 0);
    }

    #[test]
    fn board_options_are_clamped() {
        let meta = solo(5000, 5000, 0);
        let state = Mines.open(&meta, &Fair, 0);
        assert!(state.tiles == MAX_TILES);
        assert!(state.mine_count == MAX_TILES - 1);
        let meta = solo(3, 0, 0);
        let state = Mines.open(&meta, &Fair, 0);
        assert!(state.tiles == MIN_TILES);
        assert!(state.mine_count == 1);
    }

    #[test]
    fn placement_marginals_are_uniform() {
        // each tile should carry mines/tiles probability within tolerance
        let meta = solo(20, 4, 0);
        let runs = 4000;
        let mut hits = [0u32; 20];
        for _ in 0..runs {
            let state = Mines.open(&meta, &Fair, 0);
            assert!(state.mines_laid() == 4);
            for tile in state.mine_tiles() {
                hits[tile as usize] += 1;
            }
        }
        let expected = runs as f64 * 4.0 / 20.0;
        for count in hits {
            assert!((count as f64) > expected * 0.75);
            assert!((count as f64) < expected * 1.25);
        }
    }

    #[test]
    fn safe_reveal_compounds_the_pot() {
        let meta = solo(25, 5, 100);
        // mines scripted onto tiles 20..24, clicks land safe
        let dice = Loaded::picks(&[20, 21, 22, 23, 24]);
        let state = Mines.open(&meta, &dice, 0);
        let one = Mines
            .evaluate("r00m00", &state, &meta, &click(0), &dice, 0)
            .unwrap();
        assert!(one.events[0].name == "TileSafe");
        assert!(one.state.safe_revealed == 1);
        let two = Mines
            .evaluate("r00m00", &one.state, &meta, &click(1), &dice, 0)
            .unwrap();
        let three = Mines
            .evaluate("r00m00", &two.state, &meta, &click(2), &dice, 0)
            .unwrap();
        assert!(three.state.winnings == 195);
        assert!(three.events[0].data["current"] == 195);
        // popcount(revealed) == revealed-safe while nothing exploded
        assert!(three.state.seen_count() == three.state.safe_revealed);
    }

    #[test]
    fn cashout_banks_the_pot_and_emits_the_transaction() {
        let meta = solo(25, 5, 100);
        let dice = Loaded::picks(&[20, 21, 22, 23, 24]);
        let state = Mines.open(&meta, &dice, 0);
        let mut state = state;
        for tile in 0..3 {
            state = Mines
                .evaluate("r00m00", &state, &meta, &click(tile), &dice, 0)
                .unwrap()
                .state;
        }
        let banked = Mines
            .evaluate("r00m00", &state, &meta, &Command::new("alice", "Cashout"), &dice, 0)
            .unwrap();
        let names = banked.events.iter().map(|e| e.name.as_str()).collect::<Vec<_>>();
        assert!(names == vec!["CashedOut", "GameOver", "Transaction"]);
        assert!(banked.events[0].data["winnings"] == 195);
        assert!(banked.events[1].data["result"] == "Won");
        assert!(banked.events[2].data["amount"] == 195);
        assert!(banked.state.status == Status::CashedOut);
        let finish = banked.over.clone().unwrap();
        assert!(finish.winner == Some(String::from("alice")));
        // the round is over; further clicks are illegal
        let after = Mines.evaluate("r00m00", &banked.state, &meta, &click(5), &dice, 0);
        assert!(after.unwrap_err() == Reject::illegal("round is over"));
    }

    #[test]
    fn hitting_a_mine_ends_with_nothing() {
        let meta = solo(25, 5, 100);
        let dice = Loaded::picks(&[20, 21, 22, 23, 24]);
        let state = Mines.open(&meta, &dice, 0);
        let safe = Mines
            .evaluate("r00m00", &state, &meta, &click(0), &dice, 0)
            .unwrap();
        let boom = Mines
            .evaluate("r00m00", &safe.state, &meta, &click(20), &dice, 0)
            .unwrap();
        let names = boom.events.iter().map(|e| e.name.as_str()).collect::<Vec<_>>();
        assert!(names == vec!["HitMine", "GameOver"]);
        assert!(boom.events[1].data["result"] == "Lost");
        assert!(boom.state.status == Status::HitMine);
        assert!(boom.state.winnings == 0);
        let finish = boom.over.clone().unwrap();
        assert!(finish.winner == None);
        // popcount(revealed) == safe count + the one mine
        assert!(boom.state.seen_count() == boom.state.safe_revealed + 1);
        let after = Mines.evaluate("r00m00", &boom.state, &meta, &click(1), &dice, 0);
        assert!(after.unwrap_err() == Reject::illegal("round is over"));
    }

    #[test]
    fn cashout_needs_at_least_one_reveal() {
        let meta = solo(25, 5, 100);
        let dice = Loaded::picks(&[20, 21, 22, 23, 24]);
        let state = Mines.open(&meta, &dice, 0);
        let refused = Mines.evaluate(
            "r00m00",
            &state,
            &meta,
            &Command::new("alice", "CashOut"),
            &dice,
            0,
        );
        assert!(refused.unwrap_err() == Reject::illegal("nothing to cash out"));
    }

    #[test]
    fn repeat_and_out_of_range_clicks_are_rejected() {
        let meta = solo(25, 5, 100);
        let dice = Loaded::picks(&[20, 21, 22, 23, 24]);
        let state = Mines.open(&meta, &dice, 0);
        let one = Mines
            .evaluate("r00m00", &state, &meta, &click(0), &dice, 0)
            .unwrap();
        let repeat = Mines.evaluate("r00m00", &one.state, &meta, &click(0), &dice, 0);
        assert!(repeat.unwrap_err() == Reject::illegal("tile already revealed"));
        let outside = Mines.evaluate("r00m00", &one.state, &meta, &click(25), &dice, 0);
        assert!(outside.unwrap_err() == Reject::invalid("tile index out of range"));
        let stranger = Mines.evaluate(
            "r00m00",
            &one.state,
            &meta,
            &Command::new("mallory", "Click").with(json!({ "tileIndex": 1 })),
            &dice,
            0,
        );
        assert!(stranger.unwrap_err() == Reject::illegal("not seated in this room"));
    }

    #[test]
    fn view_hides_mines_until_the_round_ends() {
        let meta = solo(25, 5, 100);
        let dice = Loaded::picks(&[20, 21, 22, 23, 24]);
        let state = Mines.open(&meta, &dice, 0);
        let live = Mines.view(&state);
        assert!(live["mines"].as_array().unwrap().is_empty());
        assert!(live["status"] == "Active");
        let boom = Mines
            .evaluate("r00m00", &state, &meta, &click(20), &dice, 0)
            .unwrap();
        let ended = Mines.view(&boom.state);
        assert!(ended["mines"].as_array().unwrap().len() == 5);
        assert!(ended["status"] == "HitMine");
    }

    #[test]
    fn rounds_are_counted_for_the_jackpot() {
        let meta = solo(25, 5, 100);
        let dice = Loaded::picks(&[20, 21, 22, 23, 24]);
        let state = Mines.open(&meta, &dice, 0);
        let boom = Mines
            .evaluate("r00m00", &state, &meta, &click(20), &dice, 0)
            .unwrap();
        assert!(boom.state.jackpot == 1);
    }
}
