use rand::Rng;

use crate::model::quest::QuestMap;

/// Exclusive upper bound of the random draw behind every token
pub const ID_SPACE: u64 = 1_000_000_000;

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Render a number in lowercase base-36, without padding.
pub fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(char::from(DIGITS[(n % 36) as usize]));
        n /= 36;
    }
    digits.iter().rev().collect()
}

/// Draw tokens until one is not taken.
pub fn generate_id<R, F>(rng: &mut R, is_taken: F) -> String
where
    R: Rng + ?Sized,
    F: Fn(&str) -> bool,
{
    loop {
        let token = to_base36(rng.gen_range(0..ID_SPACE));
        if !is_taken(&token) {
            return token;
        }
        log::debug!("id collision on {}, redrawing", token);
    }
}

/// A category id unused as a category key in either map.
///
/// The archive is checked too: it shares category ids with the active map, so
/// reusing an archive-only id would file the new category under the old
/// category's archived quests.
pub fn fresh_category_id<R: Rng + ?Sized>(
    rng: &mut R,
    active: &QuestMap,
    archive: &QuestMap,
) -> String {
    generate_id(rng, |token| {
        active.contains_key(token) || archive.contains_key(token)
    })
}

/// A quest id unused by any quest in either map and by any category key,
/// including `category_id`, which may not be inserted yet.
pub fn fresh_quest_id<R: Rng + ?Sized>(
    rng: &mut R,
    active: &QuestMap,
    archive: &QuestMap,
    category_id: &str,
) -> String {
    generate_id(rng, |token| {
        token == category_id || is_token_used(active, token) || is_token_used(archive, token)
    })
}

fn is_token_used(map: &QuestMap, token: &str) -> bool {
    map.contains_key(token)
        || map
            .values()
            .any(|entry| entry.items.iter().any(|q| q.id == token))
}
