//! Fixed values shared by every stage of the analysis.
//!
//! Anything a user is expected to tune (directories, sample count, price
//! source, arena filter) has a default here and is overridden by the CLI
//! configuration.

use crate::arena::Arena;

/// Name used for an empty drop slot.
pub const NOTHING: &str = "nothing";

/// Number of prizes handed out per day of play.
pub const BATTLEDOME_DROPS_PER_DAY: u32 = 15;

pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Synthetic samples drawn per arena when no generated file exists.
pub const NUMBER_OF_ITEMS_TO_GENERATE: u64 = 100_000_000;

pub const NUMBER_OF_BOOTSTRAP_SAMPLES: usize = 100_000;

pub const NUMBER_OF_ITEMS_TO_PRINT: usize = 15;

pub const NUMBER_OF_DROPS_TO_PRINT: usize = 3;

/// Days until a freshly created price cache expires.
pub const PRICE_CACHE_EXPIRY_DAYS: i64 = 7;

/// Layout of the expiry line at the top of a price cache file.
pub const DATA_EXPIRY_TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S%.6f";

// Metadata sentinels
pub const GENERATED: &str = "(generated)";
pub const MULTIPLE_SOURCES: &str = "(multiple sources)";
pub const MULTIPLE_CHALLENGERS: &str = "(multiple challengers)";
pub const MULTIPLE_DIFFICULTIES: &str = "(multiple difficulties)";

// File names
pub const ITEMDB_PRICE_CACHE_FILE: &str = "neopets_itemdb_item_price_cache.txt";
pub const JELLYNEO_PRICE_CACHE_FILE: &str = "neopets_jellyneo_item_price_cache.txt";
pub const ITEM_WEIGHTS_FILE: &str = "neopets_battledome_item_weights.txt";
pub const GENERATED_DROPS_FILE_PREFIX: &str = "neopets_battledome_generated_items";
pub const DROP_RATES_FILE_PREFIX: &str = "neopets_battledome_item_drop_rates";

pub const BROWN_CODESTONES: [&str; 10] = [
    "Bri Codestone",
    "Eo Codestone",
    "Har Codestone",
    "Lu Codestone",
    "Main Codestone",
    "Mau Codestone",
    "Orn Codestone",
    "Tai-Kai Codestone",
    "Vo Codestone",
    "Zei Codestone",
];

pub const RED_CODESTONES: [&str; 6] = [
    "Cui Codestone",
    "Kew Codestone",
    "Mag Codestone",
    "Sho Codestone",
    "Vux Codestone",
    "Zed Codestone",
];

/// Arenas in the order they are listed in-game.
pub const ARENAS: [Arena; 8] = [
    Arena::CosmicDome,
    Arena::NeocolaCentre,
    Arena::CentralArena,
    Arena::DomeOfTheDeep,
    Arena::RattlingCauldron,
    Arena::PangoPalladium,
    Arena::FrostArena,
    Arena::UggaDome,
];

/// `Central Arena` -> `Central_Arena`, as used in generated file names.
pub fn file_safe_arena(arena: Arena) -> String {
    arena.name().replace(' ', "_")
}

/// File holding the aggregated synthetic sample for one arena.
pub fn generated_drops_file_name(arena: Arena, count: u64) -> String {
    format!(
        "{}_{}_{}.txt",
        GENERATED_DROPS_FILE_PREFIX,
        file_safe_arena(arena),
        count
    )
}

/// File holding predicted drop rates derived from a synthetic sample.
pub fn drop_rates_file_name(arena: Arena, count: u64) -> String {
    format!(
        "{}_{}_{}.txt",
        DROP_RATES_FILE_PREFIX,
        file_safe_arena(arena),
        count
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_file_name() {
        assert_eq!(
            generated_drops_file_name(Arena::DomeOfTheDeep, 1000),
            "neopets_battledome_generated_items_Dome_of_the_Deep_1000.txt"
        );
        assert_eq!(
            drop_rates_file_name(Arena::CentralArena, 5),
            "neopets_battledome_item_drop_rates_Central_Arena_5.txt"
        );
    }

    #[test]
    fn test_codestone_lists_disjoint() {
        for brown in BROWN_CODESTONES {
            assert!(!RED_CODESTONES.contains(&brown));
        }
    }
}
