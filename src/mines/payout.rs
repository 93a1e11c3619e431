use crate::Coins;

/// House edge retained on every cashout: payouts are 97% of fair value.
pub const HOUSE_EDGE: f32 = 0.97;

/// Fair multiplier after k safe reveals.
///
/// Each safe reveal multiplies by total / remaining-safe with both counts
/// decrementing, i.e. the inverse probability of surviving that reveal, so
/// the product is the inverse probability of the whole run.
pub fn multiplier(tiles: u8, mines: u8, k: u32) -> f64 {
    let mut product = 1.0;
    let mut total = tiles as f64;
    let mut safe = (tiles - mines) as f64;
    for _ in 0..k {
        product *= total / safe;
        total -= 1.0;
        safe -= 1.0;
    }
    product
}

/// What the player holds after k safe reveals, floored to whole units.
pub fn winnings(entry: u32, tiles: u8, mines: u8, k: u32, edge: f32) -> Coins {
    if k == 0 || k > (tiles - mines) as u32 {
        return 0;
    }
    (entry as f64 * multiplier(tiles, mines, k) * edge as f64).floor() as Coins
}

/// What the next safe reveal would be worth; zero once no safe tiles remain.
pub fn preview(entry: u32, tiles: u8, mines: u8, k: u32, edge: f32) -> Coins {
    if k + 1 > (tiles - mines) as u32 {
        return 0;
    }
    winnings(entry, tiles, mines, k + 1, edge)
}
